//! Index groupings over the application events of a sessionized log
//!
//! The log owns the events; the view only stores indices into it, grouped by
//! user and by `(user, session)`. All downstream stages read through here.

use crate::profiler::segmenter::SessionizedLog;
use crate::schema::Event;
use std::collections::BTreeMap;

/// Identity of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey<'a> {
    pub user_id: &'a str,
    pub session_id: u32,
}

/// Application-only projection of a [`SessionizedLog`]
#[derive(Debug, Clone)]
pub struct ApplicationView<'a> {
    log: &'a SessionizedLog,
    indices: Vec<usize>,
    by_user: BTreeMap<&'a str, Vec<usize>>,
    by_session: BTreeMap<SessionKey<'a>, Vec<usize>>,
}

impl<'a> ApplicationView<'a> {
    /// Group the application events of `log`
    ///
    /// Application events are a subset of the sessionized arena, so each one
    /// keeps the session id assigned during detection.
    pub fn new(log: &'a SessionizedLog) -> Self {
        let mut indices = Vec::new();
        let mut by_user: BTreeMap<&'a str, Vec<usize>> = BTreeMap::new();
        let mut by_session: BTreeMap<SessionKey<'a>, Vec<usize>> = BTreeMap::new();

        for (idx, event) in log.events().iter().enumerate() {
            if !event.is_application() {
                continue;
            }
            indices.push(idx);
            by_user.entry(event.user_id.as_str()).or_default().push(idx);
            by_session
                .entry(SessionKey {
                    user_id: event.user_id.as_str(),
                    session_id: log.session_id(idx),
                })
                .or_default()
                .push(idx);
        }

        Self {
            log,
            indices,
            by_user,
            by_session,
        }
    }

    pub fn log(&self) -> &'a SessionizedLog {
        self.log
    }

    pub fn event(&self, idx: usize) -> &'a Event {
        self.log.event(idx)
    }

    pub fn name(&self, idx: usize) -> &'a str {
        self.log.event(idx).event_name.as_str()
    }

    /// Arena indices of all application events, in `(user, timestamp)` order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn events(&self) -> impl Iterator<Item = &'a Event> + '_ {
        self.indices.iter().map(move |&idx| self.log.event(idx))
    }

    /// Per-user chronological index lists
    pub fn users(&self) -> &BTreeMap<&'a str, Vec<usize>> {
        &self.by_user
    }

    /// Per-session chronological index lists, ordered by user then session
    pub fn sessions(&self) -> &BTreeMap<SessionKey<'a>, Vec<usize>> {
        &self.by_session
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Sessions containing at least one application event
    pub fn session_count(&self) -> usize {
        self.by_session.len()
    }

    /// Event-name sequence of every session
    pub fn session_sequences(&self) -> Vec<Vec<&'a str>> {
        self.by_session
            .values()
            .map(|indices| indices.iter().map(|&idx| self.name(idx)).collect())
            .collect()
    }

    /// Event count of every session
    pub fn session_lengths(&self) -> Vec<usize> {
        self.by_session.values().map(Vec::len).collect()
    }
}
