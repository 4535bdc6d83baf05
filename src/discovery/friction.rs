//! Per-event friction scoring
//!
//! An occurrence counts as a repetition when the same user's previous
//! application event has the same name.

use crate::config::DiscoveryConfig;
use crate::discovery::types::{FrictionPoints, FrictionScore, FrictionSeverity, FrictionSummary};
use crate::profiler::ApplicationView;
use crate::stats::median;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

#[derive(Default)]
struct EventTally<'a> {
    occurrences: usize,
    repeats: usize,
    users: HashSet<&'a str>,
    gaps: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct FrictionDetector {
    threshold: f64,
    max_events: usize,
}

impl FrictionDetector {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            threshold: config.friction_threshold,
            max_events: config.max_friction_events,
        }
    }

    pub fn detect(&self, view: &ApplicationView) -> FrictionPoints {
        let mut tallies: HashMap<&str, EventTally> = HashMap::new();

        for (&user, indices) in view.users() {
            let mut previous: Option<&str> = None;
            for &idx in indices {
                let name = view.name(idx);
                let tally = tallies.entry(name).or_default();
                tally.occurrences += 1;
                tally.users.insert(user);
                if previous == Some(name) {
                    tally.repeats += 1;
                }
                previous = Some(name);
            }
        }

        // Gaps between occurrences of the same name inside one session
        for indices in view.sessions().values() {
            let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
            for &idx in indices {
                let event = view.event(idx);
                let name = event.event_name.as_str();
                if let Some(previous) = last_seen.insert(name, event.timestamp) {
                    if let Some(tally) = tallies.get_mut(name) {
                        let gap = event.timestamp - previous;
                        tally.gaps.push(gap.num_milliseconds() as f64 / 1000.0);
                    }
                }
            }
        }

        let mut scores: Vec<FrictionScore> = tallies
            .into_iter()
            .filter_map(|(name, tally)| {
                let repetition_rate = tally.repeats as f64 / tally.occurrences as f64;
                let friction_score = repetition_rate * 100.0;
                (friction_score > self.threshold).then(|| FrictionScore {
                    event_name: name.to_string(),
                    repetition_rate,
                    avg_time_gap: median(&tally.gaps),
                    friction_score,
                    users_affected: tally.users.len(),
                    total_occurrences: tally.occurrences,
                })
            })
            .collect();

        scores.sort_by(|a, b| {
            b.friction_score
                .total_cmp(&a.friction_score)
                .then_with(|| a.event_name.cmp(&b.event_name))
        });
        scores.truncate(self.max_events);

        let friction_summary = summarize(&scores);
        FrictionPoints {
            high_friction_events: scores,
            friction_summary,
        }
    }
}

fn summarize(scores: &[FrictionScore]) -> FrictionSummary {
    let Some(top) = scores.first() else {
        return FrictionSummary::default();
    };
    let severity = FrictionSeverity::from_repetition_rate(top.repetition_rate);
    let verdict = match severity {
        FrictionSeverity::Critical => {
            "CRITICAL: More than half of occurrences are repeats - major UX issue."
        }
        FrictionSeverity::High => "HIGH: Significant user hesitation detected.",
        _ => "MEDIUM: Some friction present but manageable.",
    };
    FrictionSummary {
        top_event: Some(top.event_name.clone()),
        severity,
        message: format!(
            "Highest friction: '{}' with {:.1}% repetition rate. {} users affected. {}",
            top.event_name,
            top.repetition_rate * 100.0,
            top.users_affected,
            verdict
        ),
    }
}
