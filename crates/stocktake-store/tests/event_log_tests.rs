// SQLite event log probing and querying, end to end through the adapter

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use stocktake_core::eventlog::fetch_events;
use stocktake_core::model::{EventOrigin, PeriodKey, SourceStatus};
use stocktake_core::settings::EventLogSchema;
use stocktake_core::EventLogSource;
use stocktake_store::history::{record_update, updates_for_period, UpdateRecord};
use stocktake_store::SqliteEventLog;
use tempfile::TempDir;

fn january() -> stocktake_core::TimeRange {
    PeriodKey::parse("2024-01").unwrap().window()
}

fn audit_db(dir: &TempDir, ddl: &str) -> std::path::PathBuf {
    let path = dir.path().join("audit.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(ddl).unwrap();
    path
}

#[test]
fn test_external_table_structured_and_text_rows() {
    let dir = TempDir::new().unwrap();
    let path = audit_db(
        &dir,
        r#"
        CREATE TABLE audit_log (id INTEGER PRIMARY KEY, date TEXT, logger TEXT, message TEXT, context TEXT);
        INSERT INTO audit_log (date, logger, message, context) VALUES
            ('2024-01-05 09:00:00', 'plugins', 'Updated plugin {plugin_name}',
             '{"plugin_slug":"akismet/akismet.php","plugin_prev_version":"5.0","plugin_version":"5.1"}'),
            ('2024-01-06 10:00:00', 'plugins', 'Plugin Jetpack was updated from 13.0 to 13.1', NULL),
            ('2024-01-07 10:00:00', 'users', 'Logged in', NULL),
            ('2023-12-31 23:59:59', 'plugins', 'Updated plugin Akismet from 4.9 to 5.0', NULL);
        "#,
    );

    let log = SqliteEventLog::new(&path, "audit_log").unwrap();
    assert!(log.exists().unwrap());

    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].slug, "akismet");
    assert_eq!(events[0].origin, EventOrigin::Structured);
    assert_eq!(events[1].slug, "jetpack");
    assert_eq!(events[1].version_from, "13.0");
    assert_eq!(events[1].origin, EventOrigin::Heuristic);
}

#[test]
fn test_integer_timestamps_are_ranged() {
    let dir = TempDir::new().unwrap();
    let inside = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap().timestamp();
    let outside = Utc.with_ymd_and_hms(2024, 2, 15, 0, 0, 0).unwrap().timestamp();
    let path = audit_db(
        &dir,
        &format!(
            "CREATE TABLE events (date INTEGER, message TEXT);
             INSERT INTO events VALUES ({inside}, 'Updated plugin Akismet from 5.0 to 5.1');
             INSERT INTO events VALUES ({outside}, 'Updated plugin Akismet from 5.1 to 5.2');"
        ),
    );

    let log = SqliteEventLog::new(&path, "events").unwrap();
    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].version_to, "5.1");
}

#[test]
fn test_offset_timestamps_land_in_their_utc_period() {
    let dir = TempDir::new().unwrap();
    let path = audit_db(
        &dir,
        r#"
        CREATE TABLE events (date TEXT, message TEXT);
        INSERT INTO events VALUES
            ('2024-02-01T03:00:00+05:00', 'Updated plugin Akismet from 5.0 to 5.1'),
            ('2024-01-10 10:00:00.123456', 'Updated plugin Jetpack from 13.0 to 13.1');
        "#,
    );
    let log = SqliteEventLog::new(&path, "events").unwrap();
    let schema = EventLogSchema::default();

    let (events, status) = fetch_events(&log, &schema, &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 2);
    let akismet = events.iter().find(|e| e.slug == "akismet").unwrap();
    assert_eq!(akismet.occurred_at, Utc.with_ymd_and_hms(2024, 1, 31, 22, 0, 0).unwrap());
    assert!(events.iter().any(|e| e.slug == "jetpack" && e.version_to == "13.1"));

    let february = PeriodKey::parse("2024-02").unwrap().window();
    let (events, status) = fetch_events(&log, &schema, &february);
    assert_eq!(status, SourceStatus::OkEmpty);
    assert!(events.is_empty());
}

#[test]
fn test_table_without_timestamp_is_schema_invalid() {
    let dir = TempDir::new().unwrap();
    let path = audit_db(&dir, "CREATE TABLE audit_log (created TEXT, message TEXT);");

    let log = SqliteEventLog::new(&path, "audit_log").unwrap();
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
fn test_missing_table_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = audit_db(&dir, "CREATE TABLE other (x TEXT);");

    let log = SqliteEventLog::new(&path, "audit_log").unwrap();
    let (_, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Unavailable);
}

#[test]
fn test_internal_history_view_serves_as_event_log() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    let conn = stocktake_store::db::open_store(&path, stocktake_store::db::DEFAULT_BUSY_TIMEOUT).unwrap();

    let now = Utc::now();
    record_update(
        &conn,
        &UpdateRecord {
            slug: "akismet".to_string(),
            name: "Akismet".to_string(),
            previous_version: "5.0".to_string(),
            new_version: "5.1".to_string(),
            updated_on: Utc.with_ymd_and_hms(2024, 1, 9, 8, 0, 0).unwrap(),
            source: "upgrader".to_string(),
        },
        now,
    )
    .unwrap();
    record_update(
        &conn,
        &UpdateRecord {
            slug: "akismet".to_string(),
            name: "Akismet".to_string(),
            previous_version: "5.1".to_string(),
            new_version: "5.2".to_string(),
            updated_on: Utc.with_ymd_and_hms(2024, 2, 2, 8, 0, 0).unwrap(),
            source: "upgrader".to_string(),
        },
        now,
    )
    .unwrap();

    let january_updates = updates_for_period(&conn, &PeriodKey::parse("2024-01").unwrap()).unwrap();
    assert_eq!(january_updates.len(), 1);

    let log = SqliteEventLog::internal_history(&path);
    let (events, status) = fetch_events(&log, &EventLogSchema::default(), &january());
    assert_eq!(status, SourceStatus::Ok);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].slug, "akismet");
    assert_eq!(events[0].version_from, "5.0");
    assert_eq!(events[0].version_to, "5.1");
    assert_eq!(events[0].origin, EventOrigin::Structured);
}
