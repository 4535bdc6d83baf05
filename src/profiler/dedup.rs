//! Consecutive-duplicate canonicalization
//!
//! An application event whose name equals the same user's previous
//! application event is a consecutive duplicate. Dropping them yields the
//! canonical stream used for readable journeys.

use crate::profiler::types::{DeduplicationSummary, DuplicateCount};
use crate::profiler::view::ApplicationView;
use crate::stats::rank_counts;
use std::collections::{HashMap, HashSet};

pub struct Deduplicator;

impl Deduplicator {
    /// Arena indices of the canonical application events
    pub fn canonical_indices(view: &ApplicationView) -> Vec<usize> {
        let mut canonical = Vec::new();
        for indices in view.users().values() {
            let mut previous: Option<&str> = None;
            for &idx in indices {
                let name = view.name(idx);
                if previous != Some(name) {
                    canonical.push(idx);
                }
                previous = Some(name);
            }
        }
        canonical
    }

    pub fn summarize(view: &ApplicationView) -> DeduplicationSummary {
        let mut removed: HashMap<&str, usize> = HashMap::new();
        let mut affected: HashMap<&str, HashSet<&str>> = HashMap::new();

        for (&user, indices) in view.users() {
            for pair in indices.windows(2) {
                let name = view.name(pair[1]);
                if view.name(pair[0]) == name {
                    *removed.entry(name).or_default() += 1;
                    affected.entry(name).or_default().insert(user);
                }
            }
        }

        let repetitions_removed: usize = removed.values().sum();
        let by_event = rank_counts(removed)
            .into_iter()
            .map(|(name, count)| DuplicateCount {
                event_name: name.to_string(),
                repetitions_removed: count,
                users_affected: affected.get(name).map_or(0, HashSet::len),
            })
            .collect();

        DeduplicationSummary {
            total_events: view.len(),
            canonical_events: view.len() - repetitions_removed,
            repetitions_removed,
            by_event,
        }
    }
}

/// Collapse runs of equal names into one
pub fn canonical_sequence<'s>(names: &[&'s str]) -> Vec<&'s str> {
    let mut canonical: Vec<&'s str> = Vec::with_capacity(names.len());
    for &name in names {
        if canonical.last() != Some(&name) {
            canonical.push(name);
        }
    }
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sessionize, stream};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_user_canonical_sequence() {
        let log = sessionize(stream("u1", &["A", "A", "B"]));
        let view = ApplicationView::new(&log);

        let names: Vec<&str> = Deduplicator::canonical_indices(&view)
            .into_iter()
            .map(|i| view.name(i))
            .collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(canonical_sequence(&["A", "A", "B"]), vec!["A", "B"]);
    }

    #[test]
    fn test_summary_counts() {
        let mut events = stream("u1", &["A", "A", "A", "B", "B"]);
        events.extend(stream("u2", &["A", "A", "C"]));
        let log = sessionize(events);
        let view = ApplicationView::new(&log);
        let summary = Deduplicator::summarize(&view);

        assert_eq!(summary.total_events, 8);
        assert_eq!(summary.repetitions_removed, 4);
        assert_eq!(summary.canonical_events, 4);
        assert_eq!(Deduplicator::canonical_indices(&view).len(), 4);
        assert_eq!(
            summary.by_event,
            vec![
                DuplicateCount {
                    event_name: "A".to_string(),
                    repetitions_removed: 3,
                    users_affected: 2,
                },
                DuplicateCount {
                    event_name: "B".to_string(),
                    repetitions_removed: 1,
                    users_affected: 1,
                },
            ]
        );
    }

    #[test]
    fn test_no_duplicates_across_users() {
        let mut events = stream("u1", &["A"]);
        events.extend(stream("u2", &["A"]));
        let log = sessionize(events);
        let view = ApplicationView::new(&log);
        assert_eq!(Deduplicator::summarize(&view).repetitions_removed, 0);
    }
}
