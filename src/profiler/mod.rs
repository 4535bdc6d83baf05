//! Session & transition profiler
//!
//! Segments the full stream into sessions, then profiles the application
//! events: aggregate counts, session statistics, the transition model and
//! keyword classes. System events only contribute session boundaries unless
//! the opt-in system profile is requested.

mod basic_stats;
mod classifier;
mod dedup;
mod segmenter;
mod sessions;
mod system_events;
mod time_patterns;
mod transitions;
mod types;
mod view;

pub use basic_stats::BasicStatsComputer;
pub use classifier::EventClassifier;
pub use dedup::{canonical_sequence, Deduplicator};
pub use segmenter::{SessionIndex, SessionSegmenter, SessionizedLog};
pub use sessions::SessionStatsComputer;
pub use system_events::SystemEventAnalyzer;
pub use time_patterns::TimePatternAnalyzer;
pub use transitions::TransitionModel;
pub use types::*;
pub use view::{ApplicationView, SessionKey};

use crate::config::ProfileConfig;
use log::{debug, info};

/// Everything the profiler contributes to the report
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileOutput {
    pub basic_stats: BasicStats,
    pub sessions: SessionStats,
    pub time_patterns: TimePatterns,
    pub transitions: TransitionSummary,
    pub event_classification: EventClassification,
    pub deduplication: DeduplicationSummary,
    pub system_events: Option<SystemEventProfile>,
}

/// Runs every profiler stage over one application view
pub struct Profiler;

impl Profiler {
    pub fn profile(view: &ApplicationView, config: &ProfileConfig) -> ProfileOutput {
        info!(
            "Profiling {} application events from {} users",
            view.len(),
            view.user_count()
        );

        let basic_stats = BasicStatsComputer::compute(view);
        let sessions = SessionStatsComputer::compute(view, config);
        debug!(
            "Sessions: {} (bounce rate {:.3})",
            sessions.total_sessions, sessions.bounce_rate
        );

        let time_patterns = TimePatternAnalyzer::analyze(view);
        let transitions = TransitionModel::build(view).summarize(config);
        debug!(
            "Transitions: {} source events, {} high-exit",
            transitions.transition_probabilities.len(),
            transitions.high_exit_events.len()
        );

        let event_classification = EventClassifier::classify(view);
        let deduplication = Deduplicator::summarize(view);

        let system_events = config
            .analyze_system_events
            .then(|| SystemEventAnalyzer::analyze(view.log()));

        ProfileOutput {
            basic_stats,
            sessions,
            time_patterns,
            transitions,
            event_classification,
            deduplication,
            system_events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app, sessionize, sys};

    #[test]
    fn test_system_profile_is_opt_in() {
        let log = sessionize(vec![
            sys("u1", "App Installed", 0),
            app("u1", "search", 1),
        ]);
        let view = ApplicationView::new(&log);

        let default = Profiler::profile(&view, &ProfileConfig::default());
        assert!(default.system_events.is_none());

        let config = ProfileConfig {
            analyze_system_events: true,
            ..ProfileConfig::default()
        };
        let with_system = Profiler::profile(&view, &config);
        assert_eq!(
            with_system.system_events.map(|s| s.app_lifecycle.total_installs),
            Some(1)
        );
    }

    #[test]
    fn test_profile_counts_only_application_events() {
        let log = sessionize(vec![
            app("u1", "A", 0),
            app("u1", "B", 1),
            sys("u1", "Session Started", 2),
            app("u1", "C", 3),
            app("u1", "D", 4),
            app("u1", "E", 5),
            app("u2", "A", 0),
            app("u2", "B", 1),
        ]);
        let view = ApplicationView::new(&log);
        let output = Profiler::profile(&view, &ProfileConfig::default());

        assert_eq!(output.basic_stats.total_events, 7);
        assert_eq!(output.sessions.total_sessions, 3);
        assert_eq!(output.deduplication.repetitions_removed, 0);
    }
}
