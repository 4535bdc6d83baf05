//! Pattern discovery output records

use crate::stats::FeatureSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Separator used in display keys such as `search → select_seat`
pub const SEQUENCE_SEPARATOR: &str = " → ";

/// Outcome label carried by every intervention rule
pub const DROPOUT_OUTCOME: &str = "dropout_likely";

/// Join event names into a display key
pub fn display_key<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| name.as_ref())
        .collect::<Vec<&str>>()
        .join(SEQUENCE_SEPARATOR)
}

/// A contiguous sub-sequence seen in many sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequentPattern {
    pub pattern: Vec<String>,
    pub display: String,
    /// Occurrences across all sessions (a session may contribute several)
    pub count: usize,
}

/// Consecutive runs of one event name within sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionRecord {
    pub event_name: String,
    pub sessions_with_repetition: usize,
    /// Runs of length > 1
    pub run_count: usize,
    pub avg_consecutive_run_length: f64,
    pub max_consecutive_run_length: usize,
    /// Events beyond the first of each run
    pub total_repeated_events: usize,
}

/// Last events of sessions, counted globally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropoutSequence {
    pub sequence: Vec<String>,
    pub display: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequentialPatterns {
    pub total_sequences: usize,
    pub total_events: usize,
    /// Events left after collapsing consecutive runs inside each session
    pub canonical_events: usize,
    /// Occurrence threshold derived from `min_support`
    pub min_count: usize,
    pub frequent_patterns: Vec<FrequentPattern>,
    pub repetition_patterns: Vec<RepetitionRecord>,
    pub dropout_sequences: Vec<DropoutSequence>,
    /// Display key -> short reading of the pattern
    pub pattern_insights: BTreeMap<String, String>,
    pub truncated: bool,
}

/// Per-user aggregate used for clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeatureVector {
    pub user_id: String,
    pub total_events: usize,
    pub unique_event_count: usize,
    pub diversity: f64,
    pub repetition_ratio: f64,
    pub time_span_hours: f64,
    pub session_count: usize,
    pub avg_session_length: f64,
}

impl UserFeatureVector {
    /// The four clustering dimensions, in a fixed order
    pub fn clustering_features(&self) -> [f64; 4] {
        [
            self.total_events as f64,
            self.diversity,
            self.repetition_ratio,
            self.time_span_hours,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentMethod {
    DensityCluster,
    ThresholdFallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentCharacteristics {
    pub avg_events: f64,
    pub avg_diversity: f64,
    pub avg_repetition: f64,
}

/// A named group of users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub label: String,
    pub count: usize,
    /// Share of all users, 0-100
    pub percentage: f64,
    pub characteristics: SegmentCharacteristics,
    pub description: String,
    /// Density clusters merged under this label; `-1` is noise, empty for
    /// fallback segments
    pub cluster_ids: Vec<i64>,
    pub method: SegmentMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSegments {
    pub total_users: usize,
    /// Dense clusters found (noise excluded)
    pub clusters_found: usize,
    pub noise_users: usize,
    pub segments: Vec<Segment>,
    pub feature_summary: BTreeMap<String, FeatureSummary>,
}

impl UserSegments {
    pub fn segment(&self, label: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.label == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivalPoint {
    pub step: usize,
    pub surviving_sessions: usize,
    pub survival_rate: f64,
    pub dropout_rate: f64,
}

/// A step where the survival rate falls sharply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalDropoff {
    pub step: usize,
    /// `survival_before - survival_after`
    pub drop: f64,
    pub drop_percentage: f64,
    pub survival_before: f64,
    pub survival_after: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivalAnalysis {
    pub total_sessions: usize,
    pub survival_curve: Vec<SurvivalPoint>,
    pub critical_dropoffs: Vec<CriticalDropoff>,
    pub median_session_length: Option<f64>,
    pub sessions_reaching_step_10: usize,
    pub sessions_reaching_step_20: usize,
    /// Session lengths, ascending
    #[serde(skip)]
    pub(crate) sorted_lengths: Vec<usize>,
}

impl SurvivalAnalysis {
    /// Survival rate at any step, including past the curve horizon
    pub fn survival_rate_at(&self, step: usize) -> Option<f64> {
        if self.sorted_lengths.is_empty() {
            return None;
        }
        let shorter = self.sorted_lengths.partition_point(|&len| len < step);
        let surviving = self.sorted_lengths.len() - shorter;
        Some(surviving as f64 / self.sorted_lengths.len() as f64)
    }
}

/// Stickiness of one event type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionScore {
    pub event_name: String,
    pub repetition_rate: f64,
    /// Median seconds between consecutive occurrences within a session
    pub avg_time_gap: Option<f64>,
    /// `repetition_rate * 100`
    pub friction_score: f64,
    pub users_affected: usize,
    pub total_occurrences: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionSeverity {
    Critical,
    High,
    Medium,
    None,
}

impl FrictionSeverity {
    pub fn from_repetition_rate(rate: f64) -> Self {
        if rate > 0.5 {
            FrictionSeverity::Critical
        } else if rate > 0.3 {
            FrictionSeverity::High
        } else {
            FrictionSeverity::Medium
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrictionSummary {
    pub top_event: Option<String>,
    pub severity: FrictionSeverity,
    pub message: String,
}

impl Default for FrictionSummary {
    fn default() -> Self {
        Self {
            top_event: None,
            severity: FrictionSeverity::None,
            message: "No significant friction points detected".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrictionPoints {
    pub high_friction_events: Vec<FrictionScore>,
    pub friction_summary: FrictionSummary,
}

/// One conjunct of a rule condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePredicate {
    pub event_name: String,
    /// `true` when the event occurred more than the repeat threshold
    pub repeated: bool,
}

/// `condition => dropout_likely`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub condition: String,
    pub predicates: Vec<RulePredicate>,
    pub outcome: String,
    pub confidence: f64,
    /// Sessions matching condition and outcome (Apriori) or the condition (manual)
    pub support: usize,
    pub lift: Option<f64>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAlgorithm {
    Apriori,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRules {
    pub algorithm: RuleAlgorithm,
    pub total_transactions: usize,
    pub total_rules: usize,
    pub intervention_triggers: Vec<AssociationRule>,
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_key() {
        assert_eq!(display_key(&["search", "select_seat"]), "search → select_seat");
        assert_eq!(display_key::<&str>(&[]), "");
    }

    #[test]
    fn test_survival_rate_beyond_horizon() {
        let analysis = SurvivalAnalysis {
            sorted_lengths: vec![1, 2, 2, 150],
            ..SurvivalAnalysis::default()
        };
        assert_eq!(analysis.survival_rate_at(1), Some(1.0));
        assert_eq!(analysis.survival_rate_at(2), Some(0.75));
        assert_eq!(analysis.survival_rate_at(120), Some(0.25));
        assert_eq!(analysis.survival_rate_at(151), Some(0.0));
        assert_eq!(SurvivalAnalysis::default().survival_rate_at(1), None);
    }

    #[test]
    fn test_severity_bands() {
        assert_eq!(
            FrictionSeverity::from_repetition_rate(0.6),
            FrictionSeverity::Critical
        );
        assert_eq!(
            FrictionSeverity::from_repetition_rate(0.5),
            FrictionSeverity::High
        );
        assert_eq!(
            FrictionSeverity::from_repetition_rate(0.2),
            FrictionSeverity::Medium
        );
    }
}
