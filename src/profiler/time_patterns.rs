//! Hour-of-day and day-of-week activity
//!
//! Buckets use each event's own offset, so a log written in local time keeps
//! its local peak hours.

use crate::profiler::types::TimePatterns;
use crate::profiler::view::ApplicationView;
use crate::stats::{mean, median, rank_counts};
use chrono::{Datelike, NaiveDate, Timelike, Weekday};
use std::collections::{BTreeMap, HashMap, HashSet};

const PEAK_HOURS: usize = 3;

pub struct TimePatternAnalyzer;

impl TimePatternAnalyzer {
    pub fn analyze(view: &ApplicationView) -> TimePatterns {
        let mut hourly: BTreeMap<u32, usize> = BTreeMap::new();
        let mut daily: BTreeMap<String, usize> = BTreeMap::new();
        let mut per_date: HashMap<NaiveDate, usize> = HashMap::new();

        for event in view.events() {
            let ts = event.local_time();
            *hourly.entry(ts.hour()).or_default() += 1;
            *daily.entry(day_name(ts.weekday()).to_string()).or_default() += 1;
            *per_date.entry(ts.date_naive()).or_default() += 1;
        }

        let peak_hours = rank_counts(hourly.iter().map(|(&h, &c)| (h, c)))
            .into_iter()
            .take(PEAK_HOURS)
            .map(|(hour, _)| hour)
            .collect();

        let per_day: Vec<f64> = per_date.values().map(|&c| c as f64).collect();

        let active_days: Vec<f64> = view
            .users()
            .values()
            .map(|indices| {
                let dates: HashSet<NaiveDate> = indices
                    .iter()
                    .map(|&i| view.event(i).local_time().date_naive())
                    .collect();
                dates.len() as f64
            })
            .collect();

        TimePatterns {
            hourly_activity: hourly,
            peak_hours,
            daily_activity: daily,
            avg_events_per_day: mean(&per_day),
            median_events_per_day: median(&per_day),
            avg_active_days_per_user: mean(&active_days),
        }
    }
}

fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{app, sessionize};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_hourly_and_daily() {
        let day = 24 * 60;
        let log = sessionize(vec![
            app("u1", "A", 0),
            app("u1", "B", 5),
            app("u1", "C", 61),
            app("u1", "D", day),
            app("u2", "A", 120),
        ]);
        let view = ApplicationView::new(&log);
        let patterns = TimePatternAnalyzer::analyze(&view);

        assert_eq!(patterns.hourly_activity.get(&14), Some(&3));
        assert_eq!(patterns.hourly_activity.get(&15), Some(&1));
        assert_eq!(patterns.hourly_activity.get(&16), Some(&1));
        assert_eq!(patterns.peak_hours, vec![14, 15, 16]);
        assert_eq!(patterns.daily_activity.get("Monday"), Some(&4));
        assert_eq!(patterns.daily_activity.get("Tuesday"), Some(&1));
        assert_eq!(patterns.avg_events_per_day, Some(2.5));
        assert_eq!(patterns.avg_active_days_per_user, Some(1.5));
    }

    #[test]
    fn test_buckets_follow_source_offset() {
        // 20:30 UTC on Monday is 02:00 Tuesday at +05:30
        let ist = 19_800;
        let log = sessionize(vec![
            app("u1", "A", 390).with_utc_offset(ist),
            app("u1", "B", 395).with_utc_offset(ist),
        ]);
        let view = ApplicationView::new(&log);
        let patterns = TimePatternAnalyzer::analyze(&view);

        assert_eq!(patterns.peak_hours, vec![2]);
        assert_eq!(patterns.hourly_activity.get(&2), Some(&2));
        assert_eq!(patterns.daily_activity.get("Tuesday"), Some(&2));
    }

    #[test]
    fn test_empty() {
        let log = sessionize(Vec::new());
        let view = ApplicationView::new(&log);
        assert_eq!(TimePatternAnalyzer::analyze(&view), TimePatterns::default());
    }
}
