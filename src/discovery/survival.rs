//! Empirical session-length survival

use crate::config::DiscoveryConfig;
use crate::discovery::types::{CriticalDropoff, SurvivalAnalysis, SurvivalPoint};
use crate::stats::median;

#[derive(Debug, Clone)]
pub struct SurvivalAnalyzer {
    max_steps: usize,
    dropoff_threshold: f64,
    max_dropoffs: usize,
}

impl SurvivalAnalyzer {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            max_steps: config.survival_max_steps,
            dropoff_threshold: config.dropoff_threshold,
            max_dropoffs: config.max_dropoffs,
        }
    }

    /// Survival curve over session lengths (events per session)
    pub fn analyze(&self, session_lengths: &[usize]) -> SurvivalAnalysis {
        let mut sorted = session_lengths.to_vec();
        sorted.sort_unstable();
        let total = sorted.len();

        let longest = sorted.last().copied().unwrap_or(0);
        let horizon = self.max_steps.min(longest);

        let survival_curve: Vec<SurvivalPoint> = (1..=horizon)
            .map(|step| {
                let surviving = total - sorted.partition_point(|&len| len < step);
                let survival_rate = surviving as f64 / total as f64;
                SurvivalPoint {
                    step,
                    surviving_sessions: surviving,
                    survival_rate,
                    dropout_rate: 1.0 - survival_rate,
                }
            })
            .collect();

        let mut critical_dropoffs: Vec<CriticalDropoff> = survival_curve
            .windows(2)
            .filter_map(|pair| {
                let (before, after) = (&pair[0], &pair[1]);
                let drop = before.survival_rate - after.survival_rate;
                (drop > self.dropoff_threshold).then(|| CriticalDropoff {
                    step: after.step,
                    drop,
                    drop_percentage: drop * 100.0,
                    survival_before: before.survival_rate,
                    survival_after: after.survival_rate,
                })
            })
            .collect();
        critical_dropoffs.sort_by(|a, b| b.drop.total_cmp(&a.drop).then(a.step.cmp(&b.step)));
        critical_dropoffs.truncate(self.max_dropoffs);

        let lengths: Vec<f64> = sorted.iter().map(|&len| len as f64).collect();
        let reaching = |step: usize| sorted.iter().filter(|&&len| len >= step).count();

        SurvivalAnalysis {
            total_sessions: total,
            median_session_length: median(&lengths),
            sessions_reaching_step_10: reaching(10),
            sessions_reaching_step_20: reaching(20),
            survival_curve,
            critical_dropoffs,
            sorted_lengths: sorted,
        }
    }
}
