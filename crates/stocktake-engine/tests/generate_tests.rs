// generate_or_refresh: classification scenarios, idempotence, lock/force,
// annotation carry-forward and event log fallback

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use stocktake_core::clock::FixedClock;
use stocktake_core::errors::{ExError, ExErrorKind, Result};
use stocktake_core::eventlog::{MemoryEventLog, RawEventRow};
use stocktake_core::inventory::{InventorySource, StaticInventory};
use stocktake_core::model::{
    AnnotationPatch, Classification, ComponentRecord, PeriodKey, SnapshotRow, SourceStatus,
    Summary, TransitionSource,
};
use stocktake_core::settings::{EngineSettings, EventSourceKind};
use stocktake_engine::{
    generate_or_refresh, get_rows, get_snapshot, lock_snapshot, set_annotation, GenerationDeps,
    GenerationStatus, PeriodLocks, RowFilter, Trigger,
};
use tempfile::TempDir;

fn setup_db() -> (TempDir, Connection) {
    let temp_dir = TempDir::new().unwrap();
    let conn = stocktake_store::db::open_store(
        temp_dir.path().join("stocktake.db"),
        stocktake_store::db::DEFAULT_BUSY_TIMEOUT,
    )
    .unwrap();
    (temp_dir, conn)
}

fn period(key: &str) -> PeriodKey {
    PeriodKey::parse(key).unwrap()
}

fn inventory(items: &[(&str, &str)]) -> StaticInventory {
    let observed = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
    StaticInventory::new(
        items
            .iter()
            .map(|(slug, version)| ComponentRecord::new(*slug, slug.to_uppercase(), *version, observed))
            .collect(),
    )
}

fn rows_by_slug(conn: &Connection, key: &str) -> BTreeMap<String, SnapshotRow> {
    get_rows(conn, &period(key), &RowFilter::default())
        .unwrap()
        .into_iter()
        .map(|row| (row.slug.clone(), row))
        .collect()
}

struct Harness {
    locks: PeriodLocks,
    settings: EngineSettings,
    clock: FixedClock,
}

impl Harness {
    fn new(settings: EngineSettings) -> Self {
        Self {
            locks: PeriodLocks::default(),
            settings,
            clock: FixedClock::new(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap()),
        }
    }

    fn deps<'a>(
        &'a self,
        inventory: &'a dyn InventorySource,
        event_log: Option<&'a MemoryEventLog>,
    ) -> GenerationDeps<'a> {
        GenerationDeps {
            inventory,
            event_log: event_log.map(|log| log as &dyn stocktake_core::eventlog::EventLogSource),
            locks: &self.locks,
            settings: &self.settings,
            clock: &self.clock,
        }
    }
}

fn event_row(value: Value) -> RawEventRow {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => RawEventRow::new(),
    }
}

#[test]
fn test_month_over_month_scenario() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());

    let december = inventory(&[("a", "1.0"), ("b", "2.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(period("2023-12"), false), &harness.deps(&december, None)).unwrap();

    let january = inventory(&[("a", "1.1"), ("c", "3.0")]);
    let outcome =
        generate_or_refresh(&mut conn, &Trigger::new(period("2024-01"), false), &harness.deps(&january, None)).unwrap();

    assert_eq!(outcome.status, GenerationStatus::Created);
    assert_eq!(
        outcome.snapshot.summary,
        Summary {
            new: 1,
            updated: 1,
            deleted: 1,
            unchanged: 0
        }
    );

    let rows = rows_by_slug(&conn, "2024-01");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows["a"].classification, Classification::Updated);
    assert_eq!((rows["a"].version_from.as_str(), rows["a"].version_to.as_str()), ("1.0", "1.1"));
    assert_eq!(rows["b"].classification, Classification::Deleted);
    assert_eq!((rows["b"].version_from.as_str(), rows["b"].version_to.as_str()), ("2.0", ""));
    assert!(!rows["b"].active);
    assert_eq!(rows["c"].classification, Classification::New);
    assert_eq!((rows["c"].version_from.as_str(), rows["c"].version_to.as_str()), ("", "3.0"));
}

#[test]
fn test_first_snapshot_is_all_new() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let inv = inventory(&[("a", "1"), ("b", "1"), ("c", "1"), ("d", "1"), ("e", "1")]);

    let outcome =
        generate_or_refresh(&mut conn, &Trigger::new(period("2024-01"), false), &harness.deps(&inv, None)).unwrap();

    assert_eq!(
        outcome.snapshot.summary,
        Summary {
            new: 5,
            updated: 0,
            deleted: 0,
            unchanged: 0
        }
    );
    assert!(rows_by_slug(&conn, "2024-01")
        .values()
        .all(|row| row.classification == Classification::New && row.version_from.is_empty()));
}

#[test]
fn test_deleted_rows_not_carried_into_next_period() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());

    let both = inventory(&[("a", "1.0"), ("b", "1.0")]);
    let only_a = inventory(&[("a", "1.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(period("2024-01"), false), &harness.deps(&both, None)).unwrap();
    generate_or_refresh(&mut conn, &Trigger::new(period("2024-02"), false), &harness.deps(&only_a, None)).unwrap();
    let march =
        generate_or_refresh(&mut conn, &Trigger::new(period("2024-03"), false), &harness.deps(&only_a, None)).unwrap();

    let rows = rows_by_slug(&conn, "2024-03");
    assert_eq!(rows.len(), 1);
    assert_eq!(march.snapshot.summary.unchanged, 1);
    assert_eq!(march.snapshot.summary.deleted, 0);
}

#[test]
fn test_previous_snapshot_skips_missing_months() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());

    let before = inventory(&[("a", "1.0")]);
    let after = inventory(&[("a", "2.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(period("2023-10"), false), &harness.deps(&before, None)).unwrap();
    generate_or_refresh(&mut conn, &Trigger::new(period("2024-01"), false), &harness.deps(&after, None)).unwrap();

    let rows = rows_by_slug(&conn, "2024-01");
    assert_eq!(rows["a"].classification, Classification::Updated);
    assert_eq!(rows["a"].version_from, "1.0");
}

#[test]
fn test_regeneration_is_idempotent() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let prior = inventory(&[("a", "1.0"), ("b", "2.0")]);
    let current = inventory(&[("a", "1.1"), ("c", "3.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(period("2023-12"), false), &harness.deps(&prior, None)).unwrap();

    let trigger = Trigger::new(period("2024-01"), false);
    let first = generate_or_refresh(&mut conn, &trigger, &harness.deps(&current, None)).unwrap();
    let first_rows = rows_by_slug(&conn, "2024-01");

    harness.clock.advance(chrono::Duration::hours(1));
    let second = generate_or_refresh(&mut conn, &trigger, &harness.deps(&current, None)).unwrap();
    let second_rows = rows_by_slug(&conn, "2024-01");

    assert_eq!(first.status, GenerationStatus::Created);
    assert_eq!(second.status, GenerationStatus::Refreshed);
    assert_eq!(first.snapshot.snapshot_id, second.snapshot.snapshot_id);
    assert_eq!(first.snapshot.summary, second.snapshot.summary);
    assert_eq!(first_rows, second_rows);
    assert!(second.snapshot.updated_at > first.snapshot.updated_at);
}

#[test]
fn test_annotations_survive_forced_regeneration() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let jan = period("2024-01");

    let before = inventory(&[("a", "1.0"), ("b", "1.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(jan.clone(), false), &harness.deps(&before, None)).unwrap();
    set_annotation(
        &mut conn,
        &jan,
        "a",
        &AnnotationPatch {
            category: Some("security".to_string()),
            notes: Some("patched CVE".to_string()),
            comments: None,
        },
        &harness.clock,
    )
    .unwrap();
    lock_snapshot(&mut conn, &jan, &harness.clock).unwrap();

    let changed = inventory(&[("a", "1.5"), ("b", "1.0")]);
    let outcome =
        generate_or_refresh(&mut conn, &Trigger::new(jan.clone(), true), &harness.deps(&changed, None)).unwrap();

    assert_eq!(outcome.status, GenerationStatus::Refreshed);
    assert!(outcome.snapshot.locked);
    let rows = rows_by_slug(&conn, "2024-01");
    assert_eq!(rows["a"].current_version, "1.5");
    assert_eq!(rows["a"].annotations.category, "security");
    assert_eq!(rows["a"].annotations.notes, "patched CVE");
    assert!(rows["b"].annotations.is_empty());
}

#[test]
fn test_locked_snapshot_is_not_regenerated_without_force() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let jan = period("2024-01");

    let before = inventory(&[("a", "1.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(jan.clone(), false), &harness.deps(&before, None)).unwrap();
    let locked = lock_snapshot(&mut conn, &jan, &harness.clock).unwrap();

    let changed = inventory(&[("a", "2.0"), ("z", "1.0")]);
    let outcome =
        generate_or_refresh(&mut conn, &Trigger::new(jan.clone(), false), &harness.deps(&changed, None)).unwrap();

    assert_eq!(outcome.status, GenerationStatus::SkippedLocked);
    assert_eq!(outcome.snapshot, locked);
    let rows = rows_by_slug(&conn, "2024-01");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows["a"].current_version, "1.0");

    let err = set_annotation(
        &mut conn,
        &jan,
        "a",
        &AnnotationPatch {
            notes: Some("late".to_string()),
            ..AnnotationPatch::default()
        },
        &harness.clock,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Locked);
}

#[test]
fn test_locked_snapshot_skipped_without_reading_inventory() {
    struct PanicsWhenRead;
    impl InventorySource for PanicsWhenRead {
        fn read_current(&self) -> Result<BTreeMap<String, ComponentRecord>> {
            panic!("inventory must not be read for a locked snapshot");
        }
    }

    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let jan = period("2024-01");
    let inv = inventory(&[("a", "1.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(jan.clone(), false), &harness.deps(&inv, None)).unwrap();
    lock_snapshot(&mut conn, &jan, &harness.clock).unwrap();

    let outcome =
        generate_or_refresh(&mut conn, &Trigger::new(jan, false), &harness.deps(&PanicsWhenRead, None)).unwrap();
    assert_eq!(outcome.status, GenerationStatus::SkippedLocked);
}

#[test]
fn test_inventory_failure_leaves_no_change() {
    struct Unreadable;
    impl InventorySource for Unreadable {
        fn read_current(&self) -> Result<BTreeMap<String, ComponentRecord>> {
            Err(ExError::new(ExErrorKind::SourceUnavailable).with_message("inventory offline"))
        }
    }

    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let jan = period("2024-01");

    let err = generate_or_refresh(&mut conn, &Trigger::new(jan.clone(), false), &harness.deps(&Unreadable, None))
        .unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::SourceUnavailable);
    assert_eq!(err.period_key(), Some("2024-01"));
    assert_eq!(get_snapshot(&conn, &jan).unwrap_err().kind(), ExErrorKind::NotFound);

    let inv = inventory(&[("a", "1.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(jan.clone(), false), &harness.deps(&inv, None)).unwrap();
    let before = rows_by_slug(&conn, "2024-01");
    generate_or_refresh(&mut conn, &Trigger::new(jan, false), &harness.deps(&Unreadable, None)).unwrap_err();
    assert_eq!(rows_by_slug(&conn, "2024-01"), before);
}

#[test]
fn test_event_log_overrides_version_from() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings {
        event_source: EventSourceKind::External,
        ..EngineSettings::default()
    });

    let december = inventory(&[("a", "1.0"), ("b", "5.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(period("2023-12"), false), &harness.deps(&december, None)).unwrap();

    let log = MemoryEventLog::new(&["date", "message", "context"])
        .with_row(event_row(json!({
            "date": "2024-01-10 08:00:00",
            "message": "Plugin updated",
            "context": { "plugin_slug": "a", "plugin_prev_version": "1.0", "plugin_version": "1.1" }
        })))
        .with_row(event_row(json!({
            "date": "2024-01-20 08:00:00",
            "message": "Updated plugin \"A\" from 1.1 to 1.2",
            "context": null
        })));

    let january = inventory(&[("a", "1.2"), ("b", "5.0")]);
    let outcome = generate_or_refresh(
        &mut conn,
        &Trigger::new(period("2024-01"), false),
        &harness.deps(&january, Some(&log)),
    )
    .unwrap();

    assert_eq!(outcome.source_status, SourceStatus::Ok);
    assert_eq!(outcome.enriched_rows, 1);
    let rows = rows_by_slug(&conn, "2024-01");
    assert_eq!(rows["a"].classification, Classification::Updated);
    assert_eq!(rows["a"].version_from, "1.1");
    assert_eq!(rows["a"].version_to, "1.2");
    assert_eq!(rows["a"].transition_source, TransitionSource::EventLog);
    assert_eq!(rows["b"].transition_source, TransitionSource::Diff);
}

#[test]
fn test_schema_invalid_log_falls_back_to_diff() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings {
        event_source: EventSourceKind::External,
        ..EngineSettings::default()
    });

    let december = inventory(&[("a", "1.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(period("2023-12"), false), &harness.deps(&december, None)).unwrap();

    // No timestamp column
    let log = MemoryEventLog::new(&["message", "context"]).with_row(event_row(json!({
        "message": "Updated plugin \"A\" from 1.1 to 1.2"
    })));
    let january = inventory(&[("a", "1.2")]);
    let outcome = generate_or_refresh(
        &mut conn,
        &Trigger::new(period("2024-01"), false),
        &harness.deps(&january, Some(&log)),
    )
    .unwrap();

    assert!(matches!(outcome.source_status, SourceStatus::SchemaInvalid { .. }));
    assert_eq!(outcome.enriched_rows, 0);
    let rows = rows_by_slug(&conn, "2024-01");
    assert_eq!(rows["a"].version_from, "1.0");
    assert_eq!(rows["a"].transition_source, TransitionSource::Diff);
}

#[test]
fn test_event_source_none_ignores_configured_log() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let log = MemoryEventLog::new(&["date", "message", "context"]);
    let inv = inventory(&[("a", "1.0")]);

    let outcome =
        generate_or_refresh(&mut conn, &Trigger::new(period("2024-01"), false), &harness.deps(&inv, Some(&log)))
            .unwrap();
    assert_eq!(outcome.source_status, SourceStatus::Unavailable);
}

#[test]
fn test_classification_filter() {
    let (_dir, mut conn) = setup_db();
    let harness = Harness::new(EngineSettings::default());
    let prior = inventory(&[("a", "1.0"), ("b", "2.0")]);
    let current = inventory(&[("a", "1.1"), ("c", "3.0")]);
    generate_or_refresh(&mut conn, &Trigger::new(period("2023-12"), false), &harness.deps(&prior, None)).unwrap();
    generate_or_refresh(&mut conn, &Trigger::new(period("2024-01"), false), &harness.deps(&current, None)).unwrap();

    let deleted = get_rows(
        &conn,
        &period("2024-01"),
        &RowFilter {
            classification: Some(Classification::Deleted),
        },
    )
    .unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].slug, "b");
}
