//! Keyword-based event classification
//!
//! Rules are checked in a fixed order and the first match wins.

use crate::profiler::types::{ClassSummary, EventClass, EventClassification};
use crate::profiler::view::ApplicationView;
use std::collections::{BTreeMap, HashMap};

/// Example names kept per class
const MAX_EXAMPLES: usize = 5;

/// Substring rules, in priority order
const KEYWORD_RULES: [(EventClass, &[&str]); 6] = [
    (EventClass::Authentication, &["_auth_", "login", "otp"]),
    (EventClass::Search, &["search", "filter"]),
    (EventClass::Selection, &["select", "choose", "pick"]),
    (EventClass::Transaction, &["payment", "book", "ticket"]),
    (EventClass::Navigation, &["pageview", "click", "back"]),
    (EventClass::Onboarding, &["onboarding"]),
];

/// Maps event names to semantic classes
pub struct EventClassifier;

impl EventClassifier {
    /// Class of a single event name
    pub fn classify_name(event_name: &str) -> EventClass {
        let lower = event_name.to_lowercase();
        for (class, keywords) in KEYWORD_RULES {
            if keywords.iter().any(|k| lower.contains(k)) {
                return class;
            }
        }
        if event_name.starts_with('_') {
            EventClass::ApiCalls
        } else {
            EventClass::Other
        }
    }

    /// Classify every distinct application event name; empty classes are omitted
    pub fn classify(view: &ApplicationView) -> EventClassification {
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut distinct: Vec<&str> = Vec::new();
        for &idx in view.indices() {
            let name = view.name(idx);
            let count = occurrences.entry(name).or_default();
            if *count == 0 {
                distinct.push(name);
            }
            *count += 1;
        }

        let mut grouped: BTreeMap<EventClass, Vec<&str>> = BTreeMap::new();
        for name in distinct {
            grouped.entry(Self::classify_name(name)).or_default().push(name);
        }

        grouped
            .into_iter()
            .map(|(class, names)| {
                let event_count = names.iter().map(|n| occurrences[n]).sum();
                let summary = ClassSummary {
                    event_count,
                    unique_events: names.len(),
                    examples: names
                        .iter()
                        .take(MAX_EXAMPLES)
                        .map(|n| n.to_string())
                        .collect(),
                };
                (class, summary)
            })
            .collect()
    }
}
