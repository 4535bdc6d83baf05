//! Adapter for reading event_log.v1 rows
//!
//! Accepts either a JSON array of rows or NDJSON (one row per line). Parsing is
//! all-or-nothing: the first malformed row aborts the run with its position.

use crate::error::ComputeError;
use crate::schema::event::{is_naive_timestamp, Event, EventRecord};

/// Adapter for converting raw rows into validated events
pub struct EventLogAdapter;

impl EventLogAdapter {
    /// Parse a JSON string containing an array of rows
    pub fn parse_array(json: &str) -> Result<Vec<EventRecord>, ComputeError> {
        let records: Vec<EventRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) rows
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<EventRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<EventRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Convert rows to events, failing fast on the first invalid row
    pub fn to_events(records: &[EventRecord]) -> Result<Vec<Event>, ComputeError> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| record.to_event(idx))
            .collect()
    }

    /// Validate every row and collect all problems (used by the `validate` command)
    pub fn validate_records(records: &[EventRecord]) -> Vec<ValidationIssue> {
        records
            .iter()
            .enumerate()
            .filter_map(|(idx, record)| {
                record.to_event(idx).err().map(|err| ValidationIssue {
                    index: idx,
                    user_id: record.user_id.clone(),
                    message: err.to_string(),
                    hint: hint_for(record, &err),
                })
            })
            .collect()
    }
}

/// One invalid row
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub index: usize,
    pub user_id: String,
    pub message: String,
    pub hint: Option<String>,
}

fn hint_for(record: &EventRecord, err: &ComputeError) -> Option<String> {
    match err {
        ComputeError::InvalidTimestamp { .. } if is_naive_timestamp(&record.timestamp) => {
            Some("timestamp has no UTC offset; append Z or +HH:MM".to_string())
        }
        ComputeError::InvalidTimestamp { .. } => {
            Some("use ISO-8601, e.g. 2024-01-15T14:05:00Z".to_string())
        }
        ComputeError::InvalidCategory { .. } => {
            Some("category must be application or system".to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NDJSON: &str = r#"
{"user_id": "u1", "event_name": "Session Started", "timestamp": "2024-01-15T14:00:00Z", "category": "system"}
{"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15T14:01:00Z", "category": "application"}

{"user_uuid": "u2", "event_name": "select_seat", "event_time": "2024-01-15 14:02:00.000 +0000", "category": "Application"}
"#;

    #[test]
    fn test_parse_ndjson_skips_blank_lines() {
        let records = EventLogAdapter::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2].user_id, "u2");

        let events = EventLogAdapter::to_events(&records).unwrap();
        assert_eq!(events.len(), 3);
        assert!(!events[0].is_application());
        assert!(events[2].is_application());
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let input = "{\"user_id\": \"u1\"}\n";
        let err = EventLogAdapter::parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_array() {
        let json = r#"[
            {"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15T14:01:00Z", "category": "application"}
        ]"#;
        let records = EventLogAdapter::parse_array(json).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_to_events_fails_fast() {
        let json = r#"[
            {"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15T14:01:00Z", "category": "application"},
            {"user_id": "u1", "event_name": "search", "timestamp": "not a time", "category": "application"}
        ]"#;
        let records = EventLogAdapter::parse_array(json).unwrap();
        let err = EventLogAdapter::to_events(&records).unwrap_err();
        assert!(matches!(err, ComputeError::InvalidTimestamp { index: 1, .. }));
    }

    #[test]
    fn test_validate_collects_all_issues() {
        let json = r#"[
            {"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15 14:01:00", "category": "application"},
            {"user_id": "u1", "event_name": "search", "timestamp": "2024-01-15T14:02:00Z", "category": "application"},
            {"user_id": "u2", "event_name": "search", "timestamp": "2024-01-15T14:03:00Z", "category": "web"}
        ]"#;
        let records = EventLogAdapter::parse_array(json).unwrap();
        let issues = EventLogAdapter::validate_records(&records);

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].index, 0);
        assert!(issues[0].hint.as_deref().unwrap().contains("offset"));
        assert_eq!(issues[1].index, 2);
        assert_eq!(issues[1].user_id, "u2");
    }
}
