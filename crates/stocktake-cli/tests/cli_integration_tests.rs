//! CLI integration tests
//!
//! Run the built binary against a scratch store and inventory file.

use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
    db: PathBuf,
    inventory: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("data").join("stocktake.db");
        let inventory = dir.path().join("inventory.json");
        Self { dir, db, inventory }
    }

    fn write_inventory(&self, json: &str) {
        fs::write(&self.inventory, json).unwrap();
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_stocktake"))
            .current_dir(self.dir.path())
            .env("STOCKTAKE__LOGGING__PROFILE", "test")
            .arg("--db")
            .arg(&self.db)
            .arg("--inventory")
            .arg(&self.inventory)
            .args(args)
            .output()
            .expect("Failed to execute CLI")
    }

    fn run_ok(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "stocktake {:?} failed. Stderr: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    fn db(&self) -> &Path {
        &self.db
    }
}

#[test]
fn test_generate_then_report() {
    let ws = Workspace::new();
    ws.write_inventory(r#"[{"slug": "a", "name": "A", "version": "1.0"}, {"slug": "b", "name": "B", "version": "2.0"}]"#);
    let stdout = ws.run_ok(&["generate", "--period", "2023-12"]);
    assert!(stdout.contains("Snapshot created"));

    ws.write_inventory(r#"[{"slug": "a", "name": "A", "version": "1.1"}, {"slug": "c", "name": "C", "version": "3.0"}]"#);
    ws.run_ok(&["generate", "--period", "2024-01"]);

    let summary: serde_json::Value =
        serde_json::from_str(&ws.run_ok(&["--json", "summary", "--period", "2024-01"])).unwrap();
    assert_eq!(summary["summary"]["new"], 1);
    assert_eq!(summary["summary"]["updated"], 1);
    assert_eq!(summary["summary"]["deleted"], 1);
    assert_eq!(summary["summary"]["unchanged"], 0);
    assert_eq!(summary["state"], "draft");

    let rows: serde_json::Value = serde_json::from_str(&ws.run_ok(&[
        "--json",
        "rows",
        "--period",
        "2024-01",
        "--classification",
        "deleted",
    ]))
    .unwrap();
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
    assert_eq!(rows[0]["slug"], "b");

    let conn = Connection::open(ws.db()).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}

#[test]
fn test_lock_blocks_annotation_until_unlocked() {
    let ws = Workspace::new();
    ws.write_inventory(r#"[{"slug": "a", "name": "A", "version": "1.0"}]"#);
    ws.run_ok(&["generate", "--period", "2024-02"]);
    ws.run_ok(&["lock", "--period", "2024-02"]);

    let rejected = ws.run(&["annotate", "--period", "2024-02", "--slug", "a", "--notes", "hi"]);
    assert!(!rejected.status.success());
    assert!(String::from_utf8_lossy(&rejected.stderr).contains("Error"));

    let skipped = ws.run_ok(&["generate", "--period", "2024-02"]);
    assert!(skipped.contains("not regenerated"));

    ws.run_ok(&["unlock", "--period", "2024-02"]);
    let annotated = ws.run_ok(&["annotate", "--period", "2024-02", "--slug", "a", "--notes", "hi"]);
    assert!(annotated.contains("notes: hi"));
}

#[test]
fn test_missing_inventory_fails_without_writing() {
    let ws = Workspace::new();
    let output = ws.run(&["generate", "--period", "2024-03"]);
    assert!(!output.status.success());

    let listed = ws.run_ok(&["list"]);
    assert!(listed.contains("No snapshots"));
}

#[test]
fn test_record_update_and_prune() {
    let ws = Workspace::new();
    let recorded = ws.run_ok(&[
        "record-update",
        "--slug",
        "forms",
        "--from",
        "1.0",
        "--to",
        "1.1",
        "--at",
        "2020-01-05T10:00:00Z",
    ]);
    assert!(recorded.contains("Recorded forms -> 1.1"));

    let duplicate = ws.run_ok(&[
        "record-update",
        "--slug",
        "forms",
        "--to",
        "1.1",
        "--at",
        "2020-01-05T10:00:00Z",
    ]);
    assert!(duplicate.contains("Already recorded"));

    let pruned = ws.run_ok(&["prune-history", "--retention-days", "30"]);
    assert!(pruned.contains("Pruned 1"));
}

#[test]
fn test_run_scheduled_not_due_when_disabled() {
    let ws = Workspace::new();
    ws.write_inventory("[]");
    let stdout = ws.run_ok(&["run-scheduled", "--now", "2024-04-01T09:00:00Z"]);
    assert!(stdout.contains("Not due"));
}

#[test]
fn test_invalid_period_is_rejected() {
    let ws = Workspace::new();
    ws.write_inventory("[]");
    let output = ws.run(&["generate", "--period", "2024-13"]);
    assert!(!output.status.success());
}
