//! Report assembly and encoding
//!
//! [`Report`] is the single versioned output document. It is a pure function
//! of the input log and configuration; provenance (instance id and compute
//! time) is only stamped when the encoder is asked to.

use crate::config::AnalysisConfig;
use crate::discovery::{
    DiscoveryOutput, FrictionPoints, InterventionRules, SequentialPatterns, SurvivalAnalysis,
    UserSegments,
};
use crate::error::ComputeError;
use crate::profiler::{
    BasicStats, DeduplicationSummary, EventClassification, ProfileOutput, SessionStats,
    SystemEventProfile, TimePatterns, TransitionSummary,
};
use crate::schema::SCHEMA_VERSION;
use crate::{PRODUCER_NAME, VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current report schema version
pub const REPORT_VERSION: &str = "retention.report.v1";

/// Discovery thresholds echoed into the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfigSummary {
    pub min_support: f64,
    pub min_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub producer: String,
    pub version: String,
    pub instance_id: String,
    pub computed_at_utc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub report_version: String,
    /// Input schema the events were read with
    pub schema_version: String,
    /// Application events analyzed
    pub total_events: usize,
    pub unique_users: usize,
    pub total_sessions: usize,
    pub discovery_config: DiscoveryConfigSummary,
    /// Stages cut short by the work budget
    pub truncated_stages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub provenance: Option<Provenance>,
}

/// The full analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub basic_stats: BasicStats,
    pub sessions: SessionStats,
    pub transitions: TransitionSummary,
    pub event_classification: EventClassification,
    pub sequential_patterns: SequentialPatterns,
    pub user_segments: UserSegments,
    pub survival_analysis: SurvivalAnalysis,
    pub friction_points: FrictionPoints,
    pub intervention_rules: InterventionRules,
    pub time_patterns: TimePatterns,
    pub deduplication: DeduplicationSummary,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub system_events: Option<SystemEventProfile>,
}

impl Report {
    /// Combine the profiler and discovery outputs
    pub fn assemble(
        profile: ProfileOutput,
        discovery: DiscoveryOutput,
        config: &AnalysisConfig,
    ) -> Self {
        let metadata = ReportMetadata {
            report_version: REPORT_VERSION.to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            total_events: profile.basic_stats.total_events,
            unique_users: profile.basic_stats.unique_users,
            total_sessions: profile.sessions.total_sessions,
            discovery_config: DiscoveryConfigSummary {
                min_support: config.discovery.min_support,
                min_confidence: config.discovery.min_confidence,
            },
            truncated_stages: discovery.truncated_stages(),
            provenance: None,
        };

        Self {
            metadata,
            basic_stats: profile.basic_stats,
            sessions: profile.sessions,
            transitions: profile.transitions,
            event_classification: profile.event_classification,
            sequential_patterns: discovery.sequential_patterns,
            user_segments: discovery.user_segments,
            survival_analysis: discovery.survival_analysis,
            friction_points: discovery.friction_points,
            intervention_rules: discovery.intervention_rules,
            time_patterns: profile.time_patterns,
            deduplication: profile.deduplication,
            system_events: profile.system_events,
        }
    }

    /// Whether any budgeted stage returned partial results
    pub fn is_truncated(&self) -> bool {
        !self.metadata.truncated_stages.is_empty()
    }
}

/// Serializes reports, optionally stamping provenance
pub struct ReportEncoder {
    instance_id: String,
    provenance: bool,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create an encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
            provenance: false,
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            instance_id,
            provenance: false,
        }
    }

    /// Stamp producer, instance id and compute time into the metadata
    pub fn with_provenance(mut self) -> Self {
        self.provenance = true;
        self
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn stamp(&self, report: &Report) -> Report {
        let mut report = report.clone();
        if self.provenance {
            report.metadata.provenance = Some(Provenance {
                producer: PRODUCER_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
                computed_at_utc: Utc::now().to_rfc3339(),
            });
        }
        report
    }

    /// Encode to compact JSON
    pub fn encode_to_json(&self, report: &Report) -> Result<String, ComputeError> {
        serde_json::to_string(&self.stamp(report))
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    /// Encode to indented JSON
    pub fn encode_to_json_pretty(&self, report: &Report) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.stamp(report))
            .map_err(|e| ComputeError::EncodingError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::PatternDiscovery;
    use crate::profiler::{ApplicationView, Profiler};
    use crate::test_support::{sessionize, stream};

    fn sample_report() -> Report {
        let mut events = stream("u1", &["search", "search", "select_seat", "pay"]);
        events.extend(stream("u2", &["search", "home"]));
        let log = sessionize(events);
        let view = ApplicationView::new(&log);
        let config = AnalysisConfig::default();

        let profile = Profiler::profile(&view, &config.profile);
        let discovery = PatternDiscovery::new(&config).discover(&view);
        Report::assemble(profile, discovery, &config)
    }

    #[test]
    fn test_metadata() {
        let report = sample_report();
        assert_eq!(report.metadata.report_version, REPORT_VERSION);
        assert_eq!(report.metadata.schema_version, "event_log.v1");
        assert_eq!(report.metadata.total_events, 6);
        assert_eq!(report.metadata.unique_users, 2);
        assert_eq!(report.metadata.total_sessions, 2);
        assert_eq!(report.metadata.discovery_config.min_support, 0.05);
        assert!(!report.is_truncated());
    }

    #[test]
    fn test_top_level_keys() {
        let json = ReportEncoder::new().encode_to_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "metadata",
            "basic_stats",
            "sessions",
            "transitions",
            "event_classification",
            "sequential_patterns",
            "user_segments",
            "survival_analysis",
            "friction_points",
            "intervention_rules",
            "time_patterns",
            "deduplication",
        ] {
            assert!(object.contains_key(key), "missing key {key}");
        }
        assert!(!object.contains_key("system_events"));
        assert!(value["metadata"].get("provenance").is_none());
        assert_eq!(
            value["sessions"]["session_detection_method"],
            "system_events_only"
        );
    }

    #[test]
    fn test_default_encoding_is_deterministic() {
        let report = sample_report();
        let a = ReportEncoder::new().encode_to_json(&report).unwrap();
        let b = ReportEncoder::new().encode_to_json(&report).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_provenance_on_request() {
        let encoder = ReportEncoder::with_instance_id("run-1".to_string()).with_provenance();
        let json = encoder.encode_to_json_pretty(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let provenance = &value["metadata"]["provenance"];
        assert_eq!(provenance["producer"], PRODUCER_NAME);
        assert_eq!(provenance["instance_id"], "run-1");
        assert!(provenance["computed_at_utc"].is_string());
    }
}
