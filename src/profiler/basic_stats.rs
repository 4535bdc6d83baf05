//! Aggregate counts over application events

use crate::profiler::types::{BasicStats, DateRange};
use crate::profiler::view::ApplicationView;
use crate::stats::{mean, median, PercentileSummary};
use std::collections::HashSet;

/// Computes [`BasicStats`]
pub struct BasicStatsComputer;

impl BasicStatsComputer {
    /// Empty input yields zero counts and `None` for every derived value
    pub fn compute(view: &ApplicationView) -> BasicStats {
        let unique_events: HashSet<&str> = view.indices().iter().map(|&i| view.name(i)).collect();

        let per_user: Vec<f64> = view.users().values().map(|v| v.len() as f64).collect();

        let start = view.events().map(|e| e.timestamp).min();
        let end = view.events().map(|e| e.timestamp).max();
        let date_range = start.zip(end).map(|(start, end)| DateRange {
            start,
            end,
            span_days: (end - start).num_days(),
        });

        BasicStats {
            total_events: view.len(),
            unique_events: unique_events.len(),
            unique_users: view.user_count(),
            date_range,
            avg_events_per_user: mean(&per_user),
            median_events_per_user: median(&per_user),
            events_per_user_distribution: PercentileSummary::from_values(&per_user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app, sessionize};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counts_and_span() {
        let log = sessionize(vec![
            app("u1", "search", 0),
            app("u1", "select", 1),
            app("u1", "search", 2),
            app("u2", "search", 60 * 24 * 3 + 5),
        ]);
        let view = ApplicationView::new(&log);
        let stats = BasicStatsComputer::compute(&view);

        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.unique_events, 2);
        assert_eq!(stats.unique_users, 2);
        assert_eq!(stats.date_range.as_ref().map(|d| d.span_days), Some(3));
        assert_eq!(stats.avg_events_per_user, Some(2.0));
        assert_eq!(stats.median_events_per_user, Some(2.0));
        assert_eq!(stats.events_per_user_distribution.p25, Some(1.5));
    }

    #[test]
    fn test_empty_input() {
        let log = sessionize(Vec::new());
        let view = ApplicationView::new(&log);
        let stats = BasicStatsComputer::compute(&view);

        assert_eq!(stats, BasicStats::default());
    }
}
