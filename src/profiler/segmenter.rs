//! Marker-based session segmentation
//!
//! Sessions are cut on explicit system markers, never on time gaps. A user's
//! first event always opens session 1; every marker opens the next one. Events
//! are ordered by `(user_id, timestamp)` with a stable sort, so rows sharing a
//! timestamp keep their input order. That tie-break decides which side of a
//! boundary such rows land on.
//!
//! The application view reads the session ids assigned here directly, since
//! application events are part of the detection pass. [`SessionIndex`] is only
//! for events that arrive from outside that pass, such as a separately loaded
//! application export.

use crate::schema::Event;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Splits each user's stream into sessions
#[derive(Debug, Clone)]
pub struct SessionSegmenter {
    markers: HashSet<String>,
}

impl SessionSegmenter {
    /// Create a segmenter for the given marker event names
    pub fn new<S: AsRef<str>>(markers: &[S]) -> Self {
        Self {
            markers: markers.iter().map(|m| m.as_ref().to_string()).collect(),
        }
    }

    pub fn is_marker(&self, event_name: &str) -> bool {
        self.markers.contains(event_name)
    }

    /// Sort the full stream (application + system) and assign session ids
    pub fn segment(&self, mut events: Vec<Event>) -> SessionizedLog {
        events.sort_by(|a, b| {
            a.user_id
                .cmp(&b.user_id)
                .then_with(|| a.timestamp.cmp(&b.timestamp))
        });

        let mut session_ids = Vec::with_capacity(events.len());
        let mut new_session = Vec::with_capacity(events.len());
        let mut marker_count = 0;

        let mut current_user: Option<&str> = None;
        let mut current_session: u32 = 0;

        for event in &events {
            let is_marker = self.is_marker(&event.event_name);
            if is_marker {
                marker_count += 1;
            }

            let first_of_user = current_user != Some(event.user_id.as_str());
            if first_of_user {
                current_user = Some(event.user_id.as_str());
                current_session = 0;
            }

            // A first event that is also a marker opens one session, not two
            let starts_session = first_of_user || is_marker;
            if starts_session {
                current_session += 1;
            }

            session_ids.push(current_session);
            new_session.push(starts_session);
        }

        SessionizedLog {
            events,
            session_ids,
            new_session,
            marker_count,
        }
    }
}

/// The full event stream, sorted, with a session id per event
///
/// This is the output of the first stage. It is immutable and can be reused
/// by any later stage, including after a discovery run was cancelled.
#[derive(Debug, Clone)]
pub struct SessionizedLog {
    events: Vec<Event>,
    session_ids: Vec<u32>,
    new_session: Vec<bool>,
    marker_count: usize,
}

impl SessionizedLog {
    /// Events sorted by `(user_id, timestamp)`
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event(&self, idx: usize) -> &Event {
        &self.events[idx]
    }

    /// Per-user session number (1-indexed) of the event at `idx`
    pub fn session_id(&self, idx: usize) -> u32 {
        self.session_ids[idx]
    }

    pub fn session_ids(&self) -> &[u32] {
        &self.session_ids
    }

    /// Whether the event at `idx` opened a session
    pub fn starts_session(&self, idx: usize) -> bool {
        self.new_session[idx]
    }

    /// Marker events seen in the full stream
    pub fn marker_count(&self) -> usize {
        self.marker_count
    }

    /// Number of session boundaries in the full stream
    pub fn boundary_count(&self) -> usize {
        self.new_session.iter().filter(|&&b| b).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Build a `(user_id, timestamp) -> session id` lookup
    pub fn session_index(&self) -> SessionIndex {
        let mut by_user: HashMap<String, BTreeMap<DateTime<Utc>, u32>> = HashMap::new();
        for (event, &session_id) in self.events.iter().zip(&self.session_ids) {
            by_user
                .entry(event.user_id.clone())
                .or_default()
                .entry(event.timestamp)
                .or_insert(session_id);
        }
        SessionIndex { by_user }
    }
}

/// Projects session ids onto events that were not part of the detection pass
///
/// Exact `(user_id, timestamp)` matches take the session of the first event at
/// that instant. Otherwise the nearest preceding, then nearest following,
/// session of the same user is used.
#[derive(Debug, Clone, Default)]
pub struct SessionIndex {
    by_user: HashMap<String, BTreeMap<DateTime<Utc>, u32>>,
}

impl SessionIndex {
    pub fn lookup(&self, user_id: &str, timestamp: DateTime<Utc>) -> Option<u32> {
        let timeline = self.by_user.get(user_id)?;
        if let Some(&session_id) = timeline.get(&timestamp) {
            return Some(session_id);
        }
        timeline
            .range(..timestamp)
            .next_back()
            .or_else(|| timeline.range(timestamp..).next())
            .map(|(_, &session_id)| session_id)
    }

    /// Session ids for a foreign set of events; `None` for unknown users
    pub fn project(&self, events: &[Event]) -> Vec<Option<u32>> {
        events
            .iter()
            .map(|e| self.lookup(&e.user_id, e.timestamp))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SESSION_MARKERS;
    use chrono::{Duration, TimeZone};

    fn t(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn segmenter() -> SessionSegmenter {
        SessionSegmenter::new(&DEFAULT_SESSION_MARKERS)
    }

    #[test]
    fn test_single_user_no_markers_is_one_session() {
        let events = vec![
            Event::application("u1", "A", t(0)),
            Event::application("u1", "A", t(1)),
            Event::application("u1", "B", t(2)),
        ];
        let log = segmenter().segment(events);
        assert_eq!(log.session_ids(), &[1, 1, 1]);
        assert_eq!(log.boundary_count(), 1);
        assert_eq!(log.marker_count(), 0);
    }

    #[test]
    fn test_marker_splits_inclusive() {
        let events = vec![
            Event::application("u1", "A", t(0)),
            Event::application("u1", "B", t(1)),
            Event::system("u1", "Session Started", t(2)),
            Event::application("u1", "C", t(3)),
            Event::application("u1", "D", t(4)),
            Event::application("u2", "A", t(0)),
            Event::application("u2", "B", t(1)),
        ];
        let log = segmenter().segment(events);

        let u1: Vec<(String, u32)> = (0..log.len())
            .filter(|&i| log.event(i).user_id == "u1")
            .map(|i| (log.event(i).event_name.clone(), log.session_id(i)))
            .collect();
        assert_eq!(
            u1,
            vec![
                ("A".to_string(), 1),
                ("B".to_string(), 1),
                ("Session Started".to_string(), 2),
                ("C".to_string(), 2),
                ("D".to_string(), 2),
            ]
        );
        assert!(log.starts_session(2));
        assert_eq!(log.boundary_count(), 3);
    }

    #[test]
    fn test_first_event_marker_counts_once() {
        let events = vec![
            Event::system("u1", "App Installed", t(0)),
            Event::application("u1", "A", t(1)),
        ];
        let log = segmenter().segment(events);
        assert_eq!(log.session_ids(), &[1, 1]);
        assert_eq!(log.boundary_count(), 1);
        assert_eq!(log.marker_count(), 1);
    }

    #[test]
    fn test_session_ids_contiguous_per_user() {
        let events = vec![
            Event::application("u2", "A", t(5)),
            Event::system("u1", "Push Click", t(3)),
            Event::application("u1", "A", t(0)),
            Event::system("u1", "User Login", t(1)),
            Event::system("u2", "Journey Started", t(6)),
            Event::application("u1", "B", t(4)),
        ];
        let log = segmenter().segment(events);

        for user in ["u1", "u2"] {
            let ids: Vec<u32> = (0..log.len())
                .filter(|&i| log.event(i).user_id == user)
                .map(|i| log.session_id(i))
                .collect();
            assert_eq!(ids[0], 1);
            for pair in ids.windows(2) {
                assert!(pair[1] == pair[0] || pair[1] == pair[0] + 1);
            }
        }
    }

    #[test]
    fn test_stable_ties_keep_input_order() {
        let events = vec![
            Event::application("u1", "A", t(0)),
            Event::application("u1", "B", t(1)),
            Event::system("u1", "Session Started", t(1)),
        ];
        let log = segmenter().segment(events);
        assert_eq!(log.event(1).event_name, "B");
        assert_eq!(log.session_id(1), 1);
        assert_eq!(log.session_id(2), 2);
    }

    #[test]
    fn test_session_index_projection() {
        let events = vec![
            Event::application("u1", "A", t(0)),
            Event::system("u1", "Session Started", t(10)),
            Event::application("u1", "B", t(11)),
        ];
        let index = segmenter().segment(events).session_index();

        assert_eq!(index.lookup("u1", t(0)), Some(1));
        assert_eq!(index.lookup("u1", t(11)), Some(2));
        // Between boundaries: nearest preceding
        assert_eq!(index.lookup("u1", t(5)), Some(1));
        // Before everything: nearest following
        assert_eq!(index.lookup("u1", t(-5)), Some(1));
        assert_eq!(index.lookup("nobody", t(0)), None);

        let projected = index.project(&[Event::application("u1", "X", t(20))]);
        assert_eq!(projected, vec![Some(2)]);
    }
}
