//! Session statistics

use crate::config::ProfileConfig;
use crate::profiler::types::{SessionStats, SESSION_DETECTION_METHOD};
use crate::profiler::view::ApplicationView;
use crate::stats::{mean, median, rank_counts, PercentileSummary};
use std::collections::{BTreeMap, HashMap};

/// Computes [`SessionStats`] over application events grouped by session
pub struct SessionStatsComputer;

impl SessionStatsComputer {
    pub fn compute(view: &ApplicationView, config: &ProfileConfig) -> SessionStats {
        let sessions = view.sessions();
        let total_sessions = sessions.len();

        let mut lengths = Vec::with_capacity(total_sessions);
        let mut durations = Vec::with_capacity(total_sessions);
        let mut starts: HashMap<&str, usize> = HashMap::new();
        let mut ends: HashMap<&str, usize> = HashMap::new();
        let mut bounces = 0usize;

        for indices in sessions.values() {
            let (Some(&first), Some(&last)) = (indices.first(), indices.last()) else {
                continue;
            };
            lengths.push(indices.len() as f64);
            if indices.len() == 1 {
                bounces += 1;
            }

            let span = view.event(last).timestamp - view.event(first).timestamp;
            durations.push(span.num_milliseconds() as f64 / 60_000.0);

            *starts.entry(view.name(first)).or_default() += 1;
            *ends.entry(view.name(last)).or_default() += 1;
        }

        let bounce_rate = if total_sessions > 0 {
            bounces as f64 / total_sessions as f64
        } else {
            0.0
        };

        let log = view.log();
        SessionStats {
            session_detection_method: SESSION_DETECTION_METHOD.to_string(),
            total_sessions,
            avg_session_length: mean(&lengths),
            median_session_length: median(&lengths),
            avg_session_duration_minutes: mean(&durations),
            median_session_duration_minutes: median(&durations),
            bounce_rate,
            session_length_distribution: PercentileSummary::from_values(&lengths),
            common_start_events: top(starts, config.max_common_session_events),
            common_end_events: top(ends, config.max_common_session_events),
            session_markers_used: log.marker_count(),
            total_session_boundaries: log.boundary_count(),
        }
    }
}

fn top(counts: HashMap<&str, usize>, limit: usize) -> BTreeMap<String, usize> {
    rank_counts(counts)
        .into_iter()
        .take(limit)
        .map(|(name, count)| (name.to_string(), count))
        .collect()
}
