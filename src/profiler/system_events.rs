//! Push funnel and app lifecycle over system-category events

use crate::profiler::segmenter::SessionizedLog;
use crate::profiler::types::{AppLifecycle, PushFunnel, PushProfile, SystemEventProfile};
use std::collections::BTreeMap;

const PUSH_SENT: &str = "Push Sent";
const PUSH_DELIVERED: &str = "Push Delivered";
const PUSH_CLICK: &str = "Push Click";
const PUSH_FAILURE: &str = "Push Failure";
const APP_INSTALLED: &str = "App Installed";
const APP_UNINSTALLED: &str = "App Uninstalled";

pub struct SystemEventAnalyzer;

impl SystemEventAnalyzer {
    pub fn analyze(log: &SessionizedLog) -> SystemEventProfile {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for event in log.events().iter().filter(|e| !e.is_application()) {
            *counts.entry(event.event_name.as_str()).or_default() += 1;
        }
        let count = |name: &str| counts.get(name).copied().unwrap_or(0);

        let push_breakdown: BTreeMap<String, usize> = counts
            .iter()
            .filter(|(name, _)| name.contains("Push"))
            .map(|(&name, &c)| (name.to_string(), c))
            .collect();

        let push_notifications = (!push_breakdown.is_empty()).then(|| {
            let sent = count(PUSH_SENT);
            let delivered = count(PUSH_DELIVERED);
            let funnel = (sent > 0).then(|| PushFunnel {
                total_sent: sent,
                delivery_rate: ratio(delivered, sent),
                click_rate: ratio(count(PUSH_CLICK), delivered),
                failure_rate: ratio(count(PUSH_FAILURE), sent),
            });
            PushProfile {
                funnel,
                event_breakdown: push_breakdown,
            }
        });

        let installs = count(APP_INSTALLED);
        let uninstalls = count(APP_UNINSTALLED);

        SystemEventProfile {
            total_events: counts.values().sum(),
            push_notifications,
            app_lifecycle: AppLifecycle {
                total_installs: installs,
                total_uninstalls: uninstalls,
                churn_rate: ratio(uninstalls, installs),
            },
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app, sessionize, sys};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_funnel() {
        let mut events = Vec::new();
        for i in 0..10 {
            events.push(sys("u1", "Push Sent", i));
        }
        for i in 0..8 {
            events.push(sys("u1", "Push Delivered", 20 + i));
        }
        events.push(sys("u1", "Push Click", 40));
        events.push(sys("u1", "Push Click", 41));
        events.push(sys("u1", "Push Failure", 42));
        events.push(app("u1", "search", 43));
        let log = sessionize(events);

        let profile = SystemEventAnalyzer::analyze(&log);
        assert_eq!(profile.total_events, 21);

        let push = profile.push_notifications.unwrap();
        let funnel = push.funnel.unwrap();
        assert_eq!(funnel.total_sent, 10);
        assert_eq!(funnel.delivery_rate, 0.8);
        assert_eq!(funnel.click_rate, 0.25);
        assert_eq!(funnel.failure_rate, 0.1);
        assert_eq!(push.event_breakdown.get("Push Click"), Some(&2));
    }

    #[test]
    fn test_lifecycle_without_pushes() {
        let log = sessionize(vec![
            sys("u1", "App Installed", 0),
            sys("u2", "App Installed", 0),
            sys("u2", "App Uninstalled", 5),
        ]);
        let profile = SystemEventAnalyzer::analyze(&log);

        assert!(profile.push_notifications.is_none());
        assert_eq!(profile.app_lifecycle.total_installs, 2);
        assert_eq!(profile.app_lifecycle.churn_rate, 0.5);
    }

    #[test]
    fn test_clicks_without_sends_have_no_funnel() {
        let log = sessionize(vec![sys("u1", "Push Click", 0)]);
        let push = SystemEventAnalyzer::analyze(&log).push_notifications.unwrap();
        assert!(push.funnel.is_none());
        assert_eq!(push.event_breakdown.len(), 1);
    }
}
