//! Sequential pattern mining over session sequences
//!
//! Counts every contiguous window of each session, finds maximal runs of a
//! repeated event, and tallies the last two and three events of each session.

use crate::budget::Budget;
use crate::config::DiscoveryConfig;
use crate::discovery::types::{
    display_key, DropoutSequence, FrequentPattern, RepetitionRecord, SequentialPatterns,
};
use crate::profiler::canonical_sequence;
use crate::stats::rank_counts;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};

/// Patterns scanned for insights
const INSIGHT_PATTERNS: usize = 10;
/// Repetition records scanned for insights
const INSIGHT_REPETITIONS: usize = 5;

/// Frequent sub-sequence, repetition and dropout-tail miner
#[derive(Debug, Clone)]
pub struct SequenceMiner {
    min_support: f64,
    min_len: usize,
    max_len: usize,
    max_patterns: usize,
    max_dropouts: usize,
}

impl SequenceMiner {
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self {
            min_support: config.min_support,
            min_len: config.min_pattern_len,
            max_len: config.max_pattern_len,
            max_patterns: config.max_frequent_patterns,
            max_dropouts: config.max_dropout_sequences,
        }
    }

    /// Occurrence threshold for `total_sessions` sessions
    pub fn min_count(&self, total_sessions: usize) -> usize {
        (total_sessions as f64 * self.min_support).floor() as usize
    }

    /// Mine all sequential patterns; window counting stops when `budget` runs out
    pub fn mine(&self, sequences: &[Vec<&str>], budget: &mut Budget) -> SequentialPatterns {
        let min_count = self.min_count(sequences.len());
        let counts = self.count_windows(sequences, budget);
        let truncated = budget.is_exhausted();
        if truncated {
            warn!(
                "Sequence mining truncated after {} windows ({} distinct)",
                budget.used(),
                counts.len()
            );
        }
        debug!("{} distinct windows, min_count {}", counts.len(), min_count);

        let frequent_patterns: Vec<FrequentPattern> =
            rank_counts(counts.into_iter().filter(|&(_, count)| count >= min_count))
                .into_iter()
                .take(self.max_patterns)
                .map(|(pattern, count)| FrequentPattern {
                    pattern: pattern.iter().map(|s| s.to_string()).collect(),
                    display: display_key(pattern),
                    count,
                })
                .collect();

        let repetition_patterns = find_repetitions(sequences);
        let dropout_sequences = find_dropout_sequences(sequences, self.max_dropouts);
        let pattern_insights = interpret(&frequent_patterns, &repetition_patterns);

        SequentialPatterns {
            total_sequences: sequences.len(),
            total_events: sequences.iter().map(Vec::len).sum(),
            canonical_events: sequences.iter().map(|s| canonical_sequence(s).len()).sum(),
            min_count,
            frequent_patterns,
            repetition_patterns,
            dropout_sequences,
            pattern_insights,
            truncated,
        }
    }

    fn count_windows<'s>(
        &self,
        sequences: &'s [Vec<&'s str>],
        budget: &mut Budget,
    ) -> HashMap<&'s [&'s str], usize> {
        let mut counts: HashMap<&'s [&'s str], usize> = HashMap::new();
        'sessions: for sequence in sequences {
            let upper = self.max_len.min(sequence.len());
            for len in self.min_len..=upper {
                for window in sequence.windows(len) {
                    if !budget.tick() {
                        break 'sessions;
                    }
                    *counts.entry(window).or_default() += 1;
                }
            }
        }
        counts
    }
}

#[derive(Default)]
struct RunStats {
    sessions: usize,
    runs: Vec<usize>,
}

/// Maximal runs (length > 1) of one event name, aggregated across sessions
pub fn find_repetitions(sequences: &[Vec<&str>]) -> Vec<RepetitionRecord> {
    let mut stats: HashMap<&str, RunStats> = HashMap::new();

    for sequence in sequences {
        let mut seen_in_session: Vec<&str> = Vec::new();
        let mut i = 0;
        while i < sequence.len() {
            let name = sequence[i];
            let run = sequence[i..].iter().take_while(|&&n| n == name).count();
            if run > 1 {
                let entry = stats.entry(name).or_default();
                entry.runs.push(run);
                if !seen_in_session.contains(&name) {
                    entry.sessions += 1;
                    seen_in_session.push(name);
                }
            }
            i += run;
        }
    }

    let mut records: Vec<RepetitionRecord> = stats
        .into_iter()
        .map(|(name, stats)| {
            let total: usize = stats.runs.iter().sum();
            RepetitionRecord {
                event_name: name.to_string(),
                sessions_with_repetition: stats.sessions,
                run_count: stats.runs.len(),
                avg_consecutive_run_length: total as f64 / stats.runs.len() as f64,
                max_consecutive_run_length: stats.runs.iter().copied().max().unwrap_or(0),
                total_repeated_events: total - stats.runs.len(),
            }
        })
        .collect();

    records.sort_by(|a, b| {
        b.sessions_with_repetition
            .cmp(&a.sessions_with_repetition)
            .then_with(|| a.event_name.cmp(&b.event_name))
    });
    records
}

/// Last two and last three events of every session, most common first
pub fn find_dropout_sequences(sequences: &[Vec<&str>], limit: usize) -> Vec<DropoutSequence> {
    let mut counts: HashMap<&[&str], usize> = HashMap::new();
    for sequence in sequences {
        for len in [2, 3] {
            if sequence.len() >= len {
                *counts.entry(&sequence[sequence.len() - len..]).or_default() += 1;
            }
        }
    }

    rank_counts(counts)
        .into_iter()
        .take(limit)
        .map(|(tail, count)| DropoutSequence {
            sequence: tail.iter().map(|s| s.to_string()).collect(),
            display: display_key(tail),
            count,
        })
        .collect()
}

fn interpret(
    patterns: &[FrequentPattern],
    repetitions: &[RepetitionRecord],
) -> BTreeMap<String, String> {
    let mut insights = BTreeMap::new();

    for pattern in patterns.iter().take(INSIGHT_PATTERNS) {
        let lower = pattern.display.to_lowercase();
        let insight = if lower.contains("search") && pattern.count > 100 {
            "Users frequently search multiple times - possible discovery issues"
        } else if lower.contains("select_seat") {
            "Seat selection appears in common journeys - critical conversion point"
        } else if lower.contains("login") {
            "Authentication is a common step - reduce friction here"
        } else {
            continue;
        };
        insights.insert(pattern.display.clone(), insight.to_string());
    }

    for record in repetitions.iter().take(INSIGHT_REPETITIONS) {
        if record.avg_consecutive_run_length > 3.0 {
            insights.insert(
                format!("FRICTION: {}", record.event_name),
                format!(
                    "Users repeat this {:.1}x on average - major friction point",
                    record.avg_consecutive_run_length
                ),
            );
        }
    }

    insights
}
