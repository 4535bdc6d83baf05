//! Pattern discovery engine
//!
//! Consumes the sessionized application view and mines higher-order structure:
//! frequent subsequences, behavioral segments, session survival, friction and
//! dropout rules. The two unbounded stages (subsequence enumeration and itemset
//! mining) each run under a fresh [`Budget`] and report truncation instead of
//! running forever.

mod clustering;
mod friction;
mod itemsets;
mod rules;
mod segments;
mod sequences;
mod survival;
mod types;

pub use clustering::{standardize, Clusterer, Dbscan, NOISE};
pub use friction::FrictionDetector;
pub use itemsets::{Apriori, FrequentItemsets, ItemsetMiner};
pub use rules::{Item, RuleMiner, SessionTransaction};
pub use segments::{BehavioralSegmenter, EXPLORERS, OTHERS, QUICK_BOOKERS, STRUGGLERS};
pub use sequences::{find_dropout_sequences, find_repetitions, SequenceMiner};
pub use survival::SurvivalAnalyzer;
pub use types::*;

use crate::budget::Budget;
use crate::config::AnalysisConfig;
use crate::profiler::ApplicationView;
use log::{info, warn};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub const STAGE_SEQUENTIAL_PATTERNS: &str = "sequential_patterns";
pub const STAGE_INTERVENTION_RULES: &str = "intervention_rules";

/// Everything the discovery engine contributes to the report
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutput {
    pub sequential_patterns: SequentialPatterns,
    pub user_segments: UserSegments,
    pub survival_analysis: SurvivalAnalysis,
    pub friction_points: FrictionPoints,
    pub intervention_rules: InterventionRules,
}

impl DiscoveryOutput {
    /// Names of the stages that stopped early
    pub fn truncated_stages(&self) -> Vec<String> {
        let mut stages = Vec::new();
        if self.sequential_patterns.truncated {
            stages.push(STAGE_SEQUENTIAL_PATTERNS.to_string());
        }
        if self.intervention_rules.truncated {
            stages.push(STAGE_INTERVENTION_RULES.to_string());
        }
        stages
    }
}

/// Runs every discovery stage over one application view
pub struct PatternDiscovery<'c> {
    config: &'c AnalysisConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'c> PatternDiscovery<'c> {
    pub fn new(config: &'c AnalysisConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Share a cancellation flag with the budgeted stages
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn budget(&self) -> Budget {
        Budget::for_stage(&self.config.budget, self.cancel.clone())
    }

    pub fn discover(&self, view: &ApplicationView) -> DiscoveryOutput {
        let discovery = &self.config.discovery;
        let sequences = view.session_sequences();
        info!(
            "Discovering patterns in {} sessions from {} users",
            sequences.len(),
            view.user_count()
        );

        let sequential_patterns =
            SequenceMiner::from_config(discovery).mine(&sequences, &mut self.budget());
        info!(
            "Sequential patterns: {} frequent, {} repeating events",
            sequential_patterns.frequent_patterns.len(),
            sequential_patterns.repetition_patterns.len()
        );

        let user_segments =
            BehavioralSegmenter::from_config(&self.config.clustering).segment(view);
        info!(
            "Segments: {} for {} users ({} clusters)",
            user_segments.segments.len(),
            user_segments.total_users,
            user_segments.clusters_found
        );

        let survival_analysis =
            SurvivalAnalyzer::from_config(discovery).analyze(&view.session_lengths());
        let friction_points = FrictionDetector::from_config(discovery).detect(view);
        info!(
            "Friction: {} events above threshold",
            friction_points.high_friction_events.len()
        );

        let intervention_rules =
            RuleMiner::from_config(discovery).mine(&sequences, &mut self.budget());

        let output = DiscoveryOutput {
            sequential_patterns,
            user_segments,
            survival_analysis,
            friction_points,
            intervention_rules,
        };
        let truncated = output.truncated_stages();
        if !truncated.is_empty() {
            warn!("Stages truncated by budget: {}", truncated.join(", "));
        }
        output
    }
}
