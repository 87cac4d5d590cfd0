#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use stocktake_core::eventlog::{fetch_events, MemoryEventLog, RawEventRow};
use stocktake_core::model::EventOrigin;
use stocktake_core::{EventLogSchema, EventLogSource, ExError, ExErrorKind, PeriodKey, SourceStatus, TimeRange};

fn row(value: serde_json::Value) -> RawEventRow {
    serde_json::from_value(value).unwrap()
}

fn january() -> TimeRange {
    PeriodKey::parse("2024-01").unwrap().window()
}

struct BrokenLog;

impl EventLogSource for BrokenLog {
    fn exists(&self) -> stocktake_core::Result<bool> {
        Ok(true)
    }

    fn field_names(&self) -> stocktake_core::Result<Vec<String>> {
        Ok(vec!["date".to_string(), "message".to_string()])
    }

    fn query(&self, _: &str, _: &TimeRange) -> stocktake_core::Result<Vec<RawEventRow>> {
        Err(ExError::new(ExErrorKind::SourceUnavailable).with_message("database is locked"))
    }
}

#[test]
fn test_missing_log_is_unavailable() {
    let (events, status) = fetch_events(&MemoryEventLog::missing(), &EventLogSchema::default(), &january());
    assert!(events.is_empty());
    assert_eq!(status, SourceStatus::Unavailable);
}

#[test]
fn test_query_failure_degrades_to_unavailable() {
    let (events, status) = fetch_events(&BrokenLog, &EventLogSchema::default(), &january());
    assert!(events.is_empty());
    assert_eq!(status, SourceStatus::Unavailable);
}

#[test]
fn test_missing_timestamp_field_is_schema_invalid() {
    let log = MemoryEventLog::new(&["created", "message", "context"]).with_row(row(json!({
        "created": "2024-01-10 10:00:00",
        "message": "Updated plugin Akismet from 5.0 to 5.1"
    })));
    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert!(events.is_empty());
    assert_eq!(
        status,
        SourceStatus::SchemaInvalid {
            missing: vec!["date".to_string()]
        }
    );
}

#[test]
fn test_required_names_are_exact() {
    // "Date" is not "date"; required names are never guessed.
    let log = MemoryEventLog::new(&["Date", "message"]);
    let (_, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert!(matches!(status, SourceStatus::SchemaInvalid { .. }));
}

#[test]
fn test_no_update_rows_is_ok_empty() {
    let log = MemoryEventLog::new(&["date", "message"]).with_row(row(json!({
        "date": "2024-01-10 10:00:00",
        "message": "User admin logged in"
    })));
    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert!(events.is_empty());
    assert_eq!(status, SourceStatus::OkEmpty);
}

#[test]
fn test_structured_and_heuristic_rows() {
    let log = MemoryEventLog::new(&["date", "action", "message", "context"])
        .with_row(row(json!({
            "date": "2024-01-05 09:00:00",
            "action": "plugin_updated",
            "message": "",
            "context": "{\"plugin_slug\":\"akismet/akismet.php\",\"plugin_prev_version\":\"5.0\",\"plugin_version\":\"5.1\"}"
        })))
        .with_row(row(json!({
            "date": "2024-01-06 09:00:00",
            "action": "plugin_update",
            "message": "Updated plugin \"Contact Form 7\" from 5.8 to 5.8.1",
            "context": null
        })))
        .with_row(row(json!({
            "date": "2024-01-07 09:00:00",
            "action": "user_login",
            "message": "Updated plugin Foo from 1 to 2",
            "context": null
        })));

    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 2);

    assert_eq!(events[0].slug, "akismet");
    assert_eq!(events[0].version_from, "5.0");
    assert_eq!(events[0].origin, EventOrigin::Structured);

    assert_eq!(events[1].slug, "contact form 7");
    assert_eq!(events[1].version_to, "5.8.1");
    assert_eq!(events[1].origin, EventOrigin::Heuristic);
}

#[test]
fn test_rows_outside_window_and_unparseable_rows_are_dropped() {
    let log = MemoryEventLog::new(&["date", "message"])
        .with_row(row(json!({
            "date": "2024-02-01 00:00:00",
            "message": "Updated plugin Akismet from 5.0 to 5.1"
        })))
        .with_row(row(json!({
            "date": "not a date",
            "message": "Updated plugin Akismet from 5.0 to 5.1"
        })))
        .with_row(row(json!({
            "date": "2024-01-31 23:59:59",
            "message": "Plugin update finished"
        })));

    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert!(events.is_empty());
    assert_eq!(status, SourceStatus::OkEmpty);
}

#[test]
fn test_context_without_identifier_uses_message() {
    let log = MemoryEventLog::new(&["date", "message", "context"]).with_row(row(json!({
        "date": "2024-01-10 10:00:00",
        "message": "Updated plugin Akismet from 5.0 to 5.1",
        "context": { "new_version": "5.1" }
    })));

    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].slug, "akismet");
    assert_eq!(events[0].version_from, "5.0");
    assert_eq!(events[0].version_to, "5.1");
    assert_eq!(events[0].origin, EventOrigin::Heuristic);
}

#[test]
fn test_fractional_second_timestamps() {
    let log = MemoryEventLog::new(&["date", "message"]).with_row(row(json!({
        "date": "2024-01-10 10:00:00.123456",
        "message": "Updated plugin Akismet from 5.0 to 5.1"
    })));

    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].occurred_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        "2024-01-10 10:00:00"
    );
}

#[test]
fn test_duplicate_events_are_collapsed() {
    let duplicate = json!({
        "date": "2024-01-05 09:00:00",
        "message": "Updated plugin Akismet from 5.0 to 5.1"
    });
    let log = MemoryEventLog::new(&["date", "message"])
        .with_row(row(duplicate.clone()))
        .with_row(row(duplicate));

    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 1);
}

#[test]
fn test_custom_field_names() {
    let schema = EventLogSchema {
        timestamp_field: "occurred".to_string(),
        message_field: Some("summary".to_string()),
        context_field: None,
    };
    let log = MemoryEventLog::new(&["occurred", "summary"]).with_row(row(json!({
        "occurred": "2024-01-15T12:00:00Z",
        "summary": "Plugin Jetpack was updated from 13.0 to 13.1"
    })));

    let (events, status) = fetch_events(&log, &schema, &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events[0].slug, "jetpack");
    assert_eq!(events[0].version_from, "13.0");
}
