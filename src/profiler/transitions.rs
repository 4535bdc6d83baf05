//! First-order transition model
//!
//! Pairs are taken over each user's full chronological application stream, so
//! a transition can cross a session boundary. Probabilities are normalized by
//! the transitions leaving each event, which makes every row sum to 1.

use crate::config::ProfileConfig;
use crate::profiler::types::{ExitEvent, TransitionCount, TransitionSummary};
use crate::profiler::view::ApplicationView;
use crate::stats::rank_counts;
use std::collections::{BTreeMap, HashMap};

/// Pair counts and exit counts for one run
#[derive(Debug, Clone, Default)]
pub struct TransitionModel<'a> {
    pairs: HashMap<&'a str, HashMap<&'a str, usize>>,
    outgoing: HashMap<&'a str, usize>,
    occurrences: HashMap<&'a str, usize>,
    exits: HashMap<&'a str, usize>,
}

impl<'a> TransitionModel<'a> {
    pub fn build(view: &ApplicationView<'a>) -> Self {
        let mut model = Self::default();

        for indices in view.users().values() {
            let names: Vec<&'a str> = indices.iter().map(|&i| view.name(i)).collect();
            for &name in &names {
                *model.occurrences.entry(name).or_default() += 1;
            }
            if let Some(&last) = names.last() {
                *model.exits.entry(last).or_default() += 1;
            }
            for pair in names.windows(2) {
                *model
                    .pairs
                    .entry(pair[0])
                    .or_default()
                    .entry(pair[1])
                    .or_default() += 1;
                *model.outgoing.entry(pair[0]).or_default() += 1;
            }
        }

        model
    }

    /// `P(next | current)`, `None` if `current` never leads anywhere
    pub fn probability(&self, current: &str, next: &str) -> Option<f64> {
        let outgoing = *self.outgoing.get(current)?;
        let count = self
            .pairs
            .get(current)
            .and_then(|row| row.get(next))
            .copied()
            .unwrap_or(0);
        Some(count as f64 / outgoing as f64)
    }

    /// Fraction of an event's occurrences that end a user's stream
    pub fn exit_probability(&self, event_name: &str) -> Option<f64> {
        let total = *self.occurrences.get(event_name)?;
        let exits = self.exits.get(event_name).copied().unwrap_or(0);
        Some(exits as f64 / total as f64)
    }

    pub fn probabilities(&self) -> BTreeMap<String, BTreeMap<String, f64>> {
        let mut table: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
        for (&from, row) in &self.pairs {
            let outgoing: usize = row.values().sum();
            let probabilities = row
                .iter()
                .map(|(&to, &count)| (to.to_string(), count as f64 / outgoing as f64))
                .collect();
            table.insert(from.to_string(), probabilities);
        }
        table
    }

    pub fn most_common(&self, limit: usize) -> Vec<TransitionCount> {
        let pairs = self.pairs.iter().flat_map(|(&from, row)| {
            row.iter().map(move |(&to, &count)| ((from, to), count))
        });
        rank_counts(pairs)
            .into_iter()
            .take(limit)
            .map(|((from, to), count)| TransitionCount {
                from: from.to_string(),
                to: to.to_string(),
                count,
            })
            .collect()
    }

    /// Events whose exit probability exceeds `threshold`, highest first
    pub fn high_exit_events(&self, threshold: f64, limit: usize) -> Vec<ExitEvent> {
        let mut exits: Vec<ExitEvent> = self
            .exits
            .iter()
            .filter_map(|(&name, &exit_count)| {
                let total_occurrences = *self.occurrences.get(name)?;
                let exit_probability = exit_count as f64 / total_occurrences as f64;
                (exit_probability > threshold).then(|| ExitEvent {
                    event_name: name.to_string(),
                    exit_probability,
                    exit_count,
                    total_occurrences,
                })
            })
            .collect();

        exits.sort_by(|a, b| {
            b.exit_probability
                .total_cmp(&a.exit_probability)
                .then_with(|| a.event_name.cmp(&b.event_name))
        });
        exits.truncate(limit);
        exits
    }

    pub fn summarize(&self, config: &ProfileConfig) -> TransitionSummary {
        TransitionSummary {
            transition_probabilities: self.probabilities(),
            most_common_transitions: self.most_common(config.max_common_transitions),
            high_exit_events: self
                .high_exit_events(config.high_exit_threshold, config.max_high_exit_events),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::segmenter::SessionizedLog;
    use crate::test_support::{app, sessionize, sessions_of, stream, sys};
    use pretty_assertions::assert_eq;

    fn summary(log: &SessionizedLog) -> TransitionSummary {
        let view = ApplicationView::new(log);
        TransitionModel::build(&view).summarize(&ProfileConfig::default())
    }

    #[test]
    fn test_rows_sum_to_one() {
        let log = sessionize(stream("u1", &["A", "B", "A", "C", "A", "B"]));
        let summary = summary(&log);

        for row in summary.transition_probabilities.values() {
            let total: f64 = row.values().sum();
            assert!((total - 1.0).abs() < 1e-9);
        }
        let from_a = &summary.transition_probabilities["A"];
        assert!((from_a["B"] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            summary.most_common_transitions[0],
            TransitionCount {
                from: "A".to_string(),
                to: "B".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_transitions_cross_sessions() {
        let log = sessionize(vec![
            app("u1", "A", 0),
            sys("u1", "Session Started", 1),
            app("u1", "B", 2),
        ]);
        let view = ApplicationView::new(&log);
        let model = TransitionModel::build(&view);
        assert_eq!(model.probability("A", "B"), Some(1.0));
        assert_eq!(model.probability("B", "A"), None);
    }

    #[test]
    fn test_no_transitions_across_users() {
        let mut events = stream("u1", &["A"]);
        events.extend(stream("u2", &["B"]));
        let log = sessionize(events);
        assert!(summary(&log).transition_probabilities.is_empty());
    }

    #[test]
    fn test_high_exit_event_scenario() {
        // 40 users end on "checkout"; 10 more visit it twice without ending there
        let mut events = Vec::new();
        for u in 0..40 {
            events.extend(stream(&format!("a{u:02}"), &["checkout", "home", "checkout"]));
        }
        for u in 0..10 {
            events.extend(stream(&format!("b{u:02}"), &["checkout", "checkout", "home"]));
        }
        let log = sessionize(events);
        let view = ApplicationView::new(&log);
        let model = TransitionModel::build(&view);

        assert_eq!(model.exit_probability("checkout"), Some(0.40));
        let exits = model.high_exit_events(0.30, 10);
        assert_eq!(exits[0].event_name, "checkout");
        assert_eq!(exits[0].exit_count, 40);
        assert_eq!(exits[0].total_occurrences, 100);
        assert!((exits[0].exit_probability - 0.40).abs() < 1e-12);
    }

    #[test]
    fn test_high_exit_events_sorted_and_capped() {
        // Exit probabilities: A 1.0, B 0.5, C 1/3; X never ends a stream
        let log = sessions_of(&[&["X", "A"], &["B", "B"], &["C", "C", "C"]]);
        let view = ApplicationView::new(&log);
        let model = TransitionModel::build(&view);

        let names = |exits: Vec<ExitEvent>| -> Vec<String> {
            exits.into_iter().map(|e| e.event_name).collect()
        };
        assert_eq!(names(model.high_exit_events(0.30, 10)), vec!["A", "B", "C"]);
        assert_eq!(names(model.high_exit_events(0.30, 2)), vec!["A", "B"]);
    }

    #[test]
    fn test_exit_threshold_is_exclusive() {
        // "home" exits 10 of 50 occurrences = 0.2, below threshold
        let mut events = Vec::new();
        for u in 0..10 {
            events.extend(stream(&format!("b{u:02}"), &["home", "home", "home", "home", "home"]));
        }
        let log = sessionize(events);
        let view = ApplicationView::new(&log);
        let exits = TransitionModel::build(&view).high_exit_events(0.30, 10);
        assert!(exits.is_empty());
    }
}
