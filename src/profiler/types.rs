//! Profiler output records
//!
//! Every map is a `BTreeMap` so the serialized report is deterministic.

use crate::stats::PercentileSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label written into `sessions.session_detection_method`
pub const SESSION_DETECTION_METHOD: &str = "system_events_only";

/// First and last application event of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Whole days between start and end (floor)
    pub span_days: i64,
}

/// Aggregate counts over application events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_events: usize,
    pub unique_events: usize,
    pub unique_users: usize,
    /// `None` for an empty log
    pub date_range: Option<DateRange>,
    pub avg_events_per_user: Option<f64>,
    pub median_events_per_user: Option<f64>,
    pub events_per_user_distribution: PercentileSummary,
}

/// Session statistics (application events grouped by user and session)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub session_detection_method: String,
    pub total_sessions: usize,
    pub avg_session_length: Option<f64>,
    pub median_session_length: Option<f64>,
    pub avg_session_duration_minutes: Option<f64>,
    pub median_session_duration_minutes: Option<f64>,
    /// Fraction of sessions with exactly one event
    pub bounce_rate: f64,
    pub session_length_distribution: PercentileSummary,
    pub common_start_events: BTreeMap<String, usize>,
    pub common_end_events: BTreeMap<String, usize>,
    /// Marker events in the full stream
    pub session_markers_used: usize,
    /// Session boundaries in the full stream
    pub total_session_boundaries: usize,
}

/// One `from -> to` pair with its raw count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCount {
    pub from: String,
    pub to: String,
    pub count: usize,
}

/// An event that often ends a user's stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitEvent {
    pub event_name: String,
    pub exit_probability: f64,
    /// Times this event was a user's last event
    pub exit_count: usize,
    pub total_occurrences: usize,
}

/// First-order transition model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionSummary {
    /// `current -> next -> P(next | current)`
    pub transition_probabilities: BTreeMap<String, BTreeMap<String, f64>>,
    pub most_common_transitions: Vec<TransitionCount>,
    pub high_exit_events: Vec<ExitEvent>,
}

/// Semantic event class, declared in rule priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventClass {
    Authentication,
    Search,
    Selection,
    Transaction,
    Navigation,
    Onboarding,
    ApiCalls,
    Other,
}

impl EventClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventClass::Authentication => "authentication",
            EventClass::Search => "search",
            EventClass::Selection => "selection",
            EventClass::Transaction => "transaction",
            EventClass::Navigation => "navigation",
            EventClass::Onboarding => "onboarding",
            EventClass::ApiCalls => "api_calls",
            EventClass::Other => "other",
        }
    }
}

/// Occurrences and example names for one class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub event_count: usize,
    pub unique_events: usize,
    pub examples: Vec<String>,
}

/// Non-empty classes only
pub type EventClassification = BTreeMap<EventClass, ClassSummary>;

/// When users are active, in the local time of each event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimePatterns {
    pub hourly_activity: BTreeMap<u32, usize>,
    pub peak_hours: Vec<u32>,
    pub daily_activity: BTreeMap<String, usize>,
    pub avg_events_per_day: Option<f64>,
    pub median_events_per_day: Option<f64>,
    pub avg_active_days_per_user: Option<f64>,
}

/// Delivery funnel, present only when pushes were sent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushFunnel {
    pub total_sent: usize,
    pub delivery_rate: f64,
    pub click_rate: f64,
    pub failure_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funnel: Option<PushFunnel>,
    pub event_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppLifecycle {
    pub total_installs: usize,
    pub total_uninstalls: usize,
    pub churn_rate: f64,
}

/// Profile of the system-category stream
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemEventProfile {
    pub total_events: usize,
    pub push_notifications: Option<PushProfile>,
    pub app_lifecycle: AppLifecycle,
}

/// Consecutive duplicates removed for one event name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCount {
    pub event_name: String,
    pub repetitions_removed: usize,
    pub users_affected: usize,
}

/// Outcome of collapsing consecutive duplicates per user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeduplicationSummary {
    pub total_events: usize,
    pub canonical_events: usize,
    pub repetitions_removed: usize,
    pub by_event: Vec<DuplicateCount>,
}
