//! event_log.v1 schema definition
//!
//! One row per user interaction: who, what, when, and whether the row came
//! from the application itself or from the platform (push, install, login).

use crate::error::ComputeError;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Current input schema version
pub const SCHEMA_VERSION: &str = "event_log.v1";

/// Non-RFC3339 layouts accepted for timestamps (all carry an offset)
const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Origin of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// User behavior inside the app
    Application,
    /// Infrastructure and lifecycle events (session markers, pushes)
    System,
}

impl EventCategory {
    /// Case-insensitive parse of "application" / "system"
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "application" => Some(EventCategory::Application),
            "system" => Some(EventCategory::System),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Application => "application",
            EventCategory::System => "system",
        }
    }
}

/// A raw input row as delivered by the event stream
///
/// Timestamps stay strings here so that a bad value is reported with its row
/// index instead of failing the whole document parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(alias = "user_uuid")]
    pub user_id: String,
    pub event_name: String,
    #[serde(alias = "event_time")]
    pub timestamp: String,
    pub category: String,
}

impl EventRecord {
    /// Validate and convert into an [`Event`]; `index` is the row position
    pub fn to_event(&self, index: usize) -> Result<Event, ComputeError> {
        if self.user_id.trim().is_empty() {
            return Err(ComputeError::MissingField(format!("user_id (row {index})")));
        }
        if self.event_name.trim().is_empty() {
            return Err(ComputeError::MissingField(format!(
                "event_name (row {index})"
            )));
        }
        let local = parse_local_timestamp(&self.timestamp).ok_or_else(|| {
            ComputeError::InvalidTimestamp {
                index,
                value: self.timestamp.clone(),
            }
        })?;
        let category =
            EventCategory::parse(&self.category).ok_or_else(|| ComputeError::InvalidCategory {
                index,
                value: self.category.clone(),
            })?;

        Ok(Event {
            user_id: self.user_id.clone(),
            event_name: self.event_name.clone(),
            timestamp: local.with_timezone(&Utc),
            utc_offset_seconds: local.offset().local_minus_utc(),
            category,
        })
    }
}

/// A validated, immutable event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub user_id: String,
    pub event_name: String,
    pub timestamp: DateTime<Utc>,
    /// Offset the timestamp was written with; used for local-time buckets
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub category: EventCategory,
}

impl Event {
    pub fn new(
        user_id: impl Into<String>,
        event_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        category: EventCategory,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            event_name: event_name.into(),
            timestamp,
            utc_offset_seconds: 0,
            category,
        }
    }

    /// Keep the wall-clock offset of the source data
    pub fn with_utc_offset(mut self, seconds: i32) -> Self {
        self.utc_offset_seconds = seconds;
        self
    }

    /// The timestamp in the offset it was written with
    pub fn local_time(&self) -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix());
        self.timestamp.with_timezone(&offset)
    }

    /// Shorthand for an application event
    pub fn application(
        user_id: impl Into<String>,
        event_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(user_id, event_name, timestamp, EventCategory::Application)
    }

    /// Shorthand for a system event
    pub fn system(
        user_id: impl Into<String>,
        event_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(user_id, event_name, timestamp, EventCategory::System)
    }

    pub fn is_application(&self) -> bool {
        self.category == EventCategory::Application
    }
}

/// Parse a timezone-aware timestamp and normalize it to UTC
///
/// Naive timestamps (no offset) are rejected: the input contract requires
/// timezone-aware values.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    parse_local_timestamp(value).map(|ts| ts.with_timezone(&Utc))
}

/// Parse a timezone-aware timestamp, keeping its offset
pub fn parse_local_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value).ok().or_else(|| {
        TIMESTAMP_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(value, format).ok())
    })
}

/// Whether a string is a timestamp without any offset information
pub fn is_naive_timestamp(value: &str) -> bool {
    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%dT%H:%M:%S%.f").is_ok()
}
