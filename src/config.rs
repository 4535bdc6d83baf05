//! Analysis configuration
//!
//! All thresholds are plain values passed into the pipeline at construction
//! time. `AnalysisConfig::validate` must succeed before any event is touched.

use crate::error::ComputeError;
use serde::{Deserialize, Serialize};

/// System event names that always open a new session
pub const DEFAULT_SESSION_MARKERS: [&str; 5] = [
    "Session Started",
    "Journey Started",
    "App Installed",
    "User Login",
    "Push Click",
];

/// Top-level configuration for a batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub profile: ProfileConfig,
    pub discovery: DiscoveryConfig,
    pub clustering: ClusteringConfig,
    pub budget: BudgetConfig,
}

/// Session & transition profiler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// Event names that mark a session boundary
    pub session_markers: Vec<String>,
    /// Minimum exit probability for an event to count as high-exit (exclusive)
    pub high_exit_threshold: f64,
    pub max_high_exit_events: usize,
    pub max_common_transitions: usize,
    /// Entries kept in the common start/end event maps
    pub max_common_session_events: usize,
    /// Include the push/lifecycle profile of system events
    pub analyze_system_events: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            session_markers: DEFAULT_SESSION_MARKERS.iter().map(|m| m.to_string()).collect(),
            high_exit_threshold: 0.30,
            max_high_exit_events: 10,
            max_common_transitions: 20,
            max_common_session_events: 10,
            analyze_system_events: false,
        }
    }
}

/// Pattern discovery thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Minimum pattern / itemset support as a fraction of sessions
    pub min_support: f64,
    /// Minimum rule confidence
    pub min_confidence: f64,
    pub min_pattern_len: usize,
    pub max_pattern_len: usize,
    pub max_frequent_patterns: usize,
    pub max_dropout_sequences: usize,
    pub max_itemset_len: usize,
    pub max_rules: usize,
    /// Sessions an `event > Nx` condition needs before the fallback scores it
    pub fallback_min_sessions: usize,
    /// An event seen more than this many times in a session is "repeated"
    pub repeat_threshold: usize,
    /// A session longer than this (and diverse enough) counts as a success
    pub success_min_length: usize,
    pub success_min_distinct: usize,
    /// Friction score (0-100) an event must exceed to be reported
    pub friction_threshold: f64,
    pub max_friction_events: usize,
    pub survival_max_steps: usize,
    /// Survival-rate drop between adjacent steps that marks a critical drop-off
    pub dropoff_threshold: f64,
    pub max_dropoffs: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_support: 0.05,
            min_confidence: 0.6,
            min_pattern_len: 2,
            max_pattern_len: 5,
            max_frequent_patterns: 50,
            max_dropout_sequences: 30,
            max_itemset_len: 3,
            max_rules: 15,
            fallback_min_sessions: 10,
            repeat_threshold: 3,
            success_min_length: 20,
            success_min_distinct: 10,
            friction_threshold: 10.0,
            max_friction_events: 20,
            survival_max_steps: 100,
            dropoff_threshold: 0.05,
            max_dropoffs: 10,
        }
    }
}

/// Density clustering parameters (applied to standardized features)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    /// Neighborhood radius
    pub eps: f64,
    /// Neighbors (including the point itself) needed for a core point
    pub min_points: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 0.5,
            min_points: 50,
        }
    }
}

/// Limits for the long-running discovery stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Wall-clock limit per stage
    pub max_stage_millis: Option<u64>,
    /// Work-unit limit per stage
    pub max_stage_iterations: Option<u64>,
}

impl AnalysisConfig {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: AnalysisConfig = serde_json::from_str(json)
            .map_err(|e| ComputeError::InvalidConfig(format!("malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every threshold before processing begins
    pub fn validate(&self) -> Result<(), ComputeError> {
        let d = &self.discovery;
        check_fraction("discovery.min_support", d.min_support)?;
        check_fraction("discovery.min_confidence", d.min_confidence)?;
        check_fraction("discovery.dropoff_threshold", d.dropoff_threshold)?;
        check_fraction("profile.high_exit_threshold", self.profile.high_exit_threshold)?;

        if d.min_pattern_len < 1 {
            return Err(ComputeError::InvalidConfig(
                "discovery.min_pattern_len must be at least 1".to_string(),
            ));
        }
        if d.min_pattern_len > d.max_pattern_len {
            return Err(ComputeError::InvalidConfig(format!(
                "pattern window is inverted: min_pattern_len {} > max_pattern_len {}",
                d.min_pattern_len, d.max_pattern_len
            )));
        }
        if d.max_itemset_len < 2 {
            return Err(ComputeError::InvalidConfig(
                "discovery.max_itemset_len must be at least 2 to form a rule".to_string(),
            ));
        }
        if d.survival_max_steps < 1 {
            return Err(ComputeError::InvalidConfig(
                "discovery.survival_max_steps must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&d.friction_threshold) {
            return Err(ComputeError::InvalidConfig(format!(
                "discovery.friction_threshold must be in [0, 100], got {}",
                d.friction_threshold
            )));
        }
        if !(self.clustering.eps.is_finite() && self.clustering.eps > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "clustering.eps must be positive, got {}",
                self.clustering.eps
            )));
        }
        if self.clustering.min_points < 1 {
            return Err(ComputeError::InvalidConfig(
                "clustering.min_points must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), ComputeError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ComputeError::InvalidConfig(format!(
            "{name} must be in [0, 1], got {value}"
        )));
    }
    Ok(())
}
