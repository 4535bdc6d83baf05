//! Pipeline orchestration
//!
//! This module provides the public API for Retention Flux. It runs the full
//! pipeline from raw event rows to the encoded report:
//! parse → sessionize → profile → discover → encode.

use crate::config::AnalysisConfig;
use crate::discovery::PatternDiscovery;
use crate::error::ComputeError;
use crate::profiler::{ApplicationView, Profiler, SessionSegmenter, SessionizedLog};
use crate::report::{Report, ReportEncoder};
use crate::schema::{Event, EventLogAdapter, EventRecord};
use log::info;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub const STAGE_CONFIGURATION: &str = "configuration";
pub const STAGE_PARSE: &str = "parse";
pub const STAGE_ENCODE: &str = "encode";

/// Convert an event log (JSON array or NDJSON) into a report JSON string
/// (stateless, one-shot, default configuration).
///
/// # Example
/// ```ignore
/// let report_json = events_to_report(&ndjson)?;
/// ```
pub fn events_to_report(input: &str) -> Result<String, ComputeError> {
    let pipeline = RetentionPipeline::new(AnalysisConfig::default())?;
    let report = pipeline.run_json(input)?;
    ReportEncoder::new()
        .encode_to_json(&report)
        .map_err(|e| e.in_stage(STAGE_ENCODE))
}

/// Parse rows, choosing array or NDJSON by the first non-blank character
pub fn parse_event_rows(input: &str) -> Result<Vec<EventRecord>, ComputeError> {
    if input.trim_start().starts_with('[') {
        EventLogAdapter::parse_array(input)
    } else {
        EventLogAdapter::parse_ndjson(input)
    }
}

/// Reusable, configuration-carrying pipeline
///
/// The sessionize stage is exposed on its own so that its output stays valid
/// when a later discovery run is cancelled.
pub struct RetentionPipeline {
    config: AnalysisConfig,
    segmenter: SessionSegmenter,
    cancel: Option<Arc<AtomicBool>>,
}

impl RetentionPipeline {
    /// Validate the configuration and build the pipeline
    pub fn new(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config
            .validate()
            .map_err(|e| e.in_stage(STAGE_CONFIGURATION))?;
        let segmenter = SessionSegmenter::new(&config.profile.session_markers);
        Ok(Self {
            config,
            segmenter,
            cancel: None,
        })
    }

    /// Raise the flag to stop budgeted discovery stages early
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Parse and validate rows; the first bad row aborts the run
    pub fn parse(&self, input: &str) -> Result<Vec<Event>, ComputeError> {
        let records = parse_event_rows(input).map_err(|e| e.in_stage(STAGE_PARSE))?;
        let events = EventLogAdapter::to_events(&records).map_err(|e| e.in_stage(STAGE_PARSE))?;
        info!("Parsed {} events", events.len());
        Ok(events)
    }

    /// Assign session ids over the full stream
    pub fn sessionize(&self, events: Vec<Event>) -> SessionizedLog {
        let log = self.segmenter.segment(events);
        info!(
            "Sessionized {} events ({} boundaries, {} markers)",
            log.len(),
            log.boundary_count(),
            log.marker_count()
        );
        log
    }

    /// Profile and mine a sessionized log
    pub fn analyze(&self, log: &SessionizedLog) -> Report {
        let view = ApplicationView::new(log);
        let profile = Profiler::profile(&view, &self.config.profile);

        let mut discovery = PatternDiscovery::new(&self.config);
        if let Some(cancel) = &self.cancel {
            discovery = discovery.with_cancel_flag(cancel.clone());
        }
        let discovered = discovery.discover(&view);

        let report = Report::assemble(profile, discovered, &self.config);
        info!(
            "Report ready: {} events, {} users, {} sessions",
            report.metadata.total_events,
            report.metadata.unique_users,
            report.metadata.total_sessions
        );
        report
    }

    /// Run every stage over validated events
    pub fn run(&self, events: Vec<Event>) -> Report {
        let log = self.sessionize(events);
        self.analyze(&log)
    }

    /// Run every stage over a JSON array or NDJSON event log
    pub fn run_json(&self, input: &str) -> Result<Report, ComputeError> {
        let events = self.parse(input)?;
        Ok(self.run(events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::STAGE_SEQUENTIAL_PATTERNS;
    use crate::test_support::{app, sys};
    use std::sync::atomic::Ordering;

    const SAMPLE_NDJSON: &str = r#"
{"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15T14:00:00Z", "category": "application"}
{"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15T14:01:00Z", "category": "application"}
{"user_id": "u1", "event_name": "Session Started", "timestamp": "2024-01-15T14:02:00Z", "category": "system"}
{"user_id": "u1", "event_name": "select_seat", "timestamp": "2024-01-15T14:03:00Z", "category": "application"}
{"user_id": "u1", "event_name": "pay", "timestamp": "2024-01-15T14:04:00Z", "category": "application"}
{"user_uuid": "u2", "event_name": "home", "event_time": "2024-01-15 15:00:00 +0000", "category": "Application"}
"#;

    #[test]
    fn test_events_to_report() {
        let json = events_to_report(SAMPLE_NDJSON).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["metadata"]["total_events"], 5);
        assert_eq!(value["metadata"]["unique_users"], 2);
        assert_eq!(value["sessions"]["total_sessions"], 3);
        assert_eq!(value["sessions"]["session_markers_used"], 1);
    }

    #[test]
    fn test_array_input_is_detected() {
        let array = r#"[
            {"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15T14:00:00Z", "category": "application"}
        ]"#;
        let pipeline = RetentionPipeline::new(AnalysisConfig::default()).unwrap();
        let report = pipeline.run_json(array).unwrap();
        assert_eq!(report.basic_stats.total_events, 1);
    }

    #[test]
    fn test_bad_timestamp_names_parse_stage() {
        let input = r#"{"user_id": "u1", "event_name": "search", "timestamp": "yesterday", "category": "application"}"#;
        let pipeline = RetentionPipeline::new(AnalysisConfig::default()).unwrap();

        match pipeline.run_json(input) {
            Err(ComputeError::StageFailed { stage, message }) => {
                assert_eq!(stage, STAGE_PARSE);
                assert!(message.contains("yesterday"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let mut config = AnalysisConfig::default();
        config.discovery.min_confidence = 2.0;

        match RetentionPipeline::new(config) {
            Err(ComputeError::StageFailed { stage, .. }) => {
                assert_eq!(stage, STAGE_CONFIGURATION)
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("config should be rejected"),
        }
    }

    #[test]
    fn test_empty_log_produces_empty_report() {
        let pipeline = RetentionPipeline::new(AnalysisConfig::default()).unwrap();
        let report = pipeline.run_json("").unwrap();

        assert_eq!(report.metadata.total_events, 0);
        assert_eq!(report.sessions.total_sessions, 0);
        assert!(report.survival_analysis.survival_curve.is_empty());
        assert!(report.intervention_rules.intervention_triggers.is_empty());
    }

    #[test]
    fn test_sessionized_log_survives_cancelled_discovery() {
        let cancel = Arc::new(AtomicBool::new(false));
        let pipeline = RetentionPipeline::new(AnalysisConfig::default())
            .unwrap()
            .with_cancel_flag(cancel.clone());

        let log = pipeline.sessionize(vec![
            app("u1", "A", 0),
            app("u1", "B", 1),
            sys("u1", "Session Started", 2),
            app("u1", "A", 3),
            app("u1", "B", 4),
        ]);

        cancel.store(true, Ordering::Relaxed);
        let cancelled = pipeline.analyze(&log);
        assert!(cancelled.is_truncated());
        assert!(cancelled
            .metadata
            .truncated_stages
            .contains(&STAGE_SEQUENTIAL_PATTERNS.to_string()));

        cancel.store(false, Ordering::Relaxed);
        let complete = pipeline.analyze(&log);
        assert!(!complete.is_truncated());
        assert_eq!(complete.sessions.total_sessions, 2);
        assert_eq!(complete.sequential_patterns.frequent_patterns[0].display, "A → B");
    }
}
