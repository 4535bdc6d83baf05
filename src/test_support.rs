//! Fixture builders shared by unit tests

use crate::config::DEFAULT_SESSION_MARKERS;
use crate::profiler::{SessionSegmenter, SessionizedLog};
use crate::schema::Event;
use chrono::{DateTime, Duration, TimeZone, Utc};

/// 2024-01-15 (a Monday) 14:00 UTC plus `minute` minutes
pub(crate) fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap() + Duration::minutes(minute)
}

pub(crate) fn app(user: &str, name: &str, minute: i64) -> Event {
    Event::application(user, name, at(minute))
}

pub(crate) fn sys(user: &str, name: &str, minute: i64) -> Event {
    Event::system(user, name, at(minute))
}

/// One user's application events, one minute apart
pub(crate) fn stream(user: &str, names: &[&str]) -> Vec<Event> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| app(user, name, i as i64))
        .collect()
}

/// Segment with the default markers
pub(crate) fn sessionize(events: Vec<Event>) -> SessionizedLog {
    SessionSegmenter::new(&DEFAULT_SESSION_MARKERS).segment(events)
}

/// One session per user, each user getting the given sequence
pub(crate) fn sessions_of(sequences: &[&[&str]]) -> SessionizedLog {
    let events = sequences
        .iter()
        .enumerate()
        .flat_map(|(i, names)| stream(&format!("user{i:04}"), names))
        .collect();
    sessionize(events)
}
