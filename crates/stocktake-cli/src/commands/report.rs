//! Read-only report commands

use clap::Args;
use stocktake_core::model::Classification;
use stocktake_engine::{apply_engine_query, EngineQuery, EngineQueryResult, RowFilter};

use crate::commands::{open, CliResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// Period key `YYYY-MM` (defaults to the current month)
    #[arg(long)]
    pub period: Option<String>,
}

#[derive(Debug, Args)]
pub struct RowsArgs {
    #[arg(long)]
    pub period: Option<String>,

    /// Only rows of this classification (new, updated, deleted, unchanged)
    #[arg(long)]
    pub classification: Option<Classification>,
}

pub fn execute_show(global: &GlobalArgs, args: PeriodArgs) -> CliResult {
    let (conn, rt) = open(global)?;
    let query = EngineQuery::SnapshotGet {
        period_key: rt.period(args.period.as_deref())?,
    };
    let EngineQueryResult::Snapshot(snapshot) = apply_engine_query(query, &conn)? else {
        return Err("unexpected engine result for show".into());
    };
    rt.print(&snapshot, |s| {
        println!("Snapshot {}:", s.period_key);
        println!("  snapshot_id: {}", s.snapshot_id);
        println!("  state: {}", s.state().as_str());
        println!("  created_at: {}", s.created_at.to_rfc3339());
        println!("  updated_at: {}", s.updated_at.to_rfc3339());
    })
}

pub fn execute_rows(global: &GlobalArgs, args: RowsArgs) -> CliResult {
    let (conn, rt) = open(global)?;
    let query = EngineQuery::SnapshotRows {
        period_key: rt.period(args.period.as_deref())?,
        filter: RowFilter {
            classification: args.classification,
        },
    };
    let EngineQueryResult::Rows(rows) = apply_engine_query(query, &conn)? else {
        return Err("unexpected engine result for rows".into());
    };
    rt.print(&rows, |rows| {
        for row in rows {
            println!(
                "{:<32} {:<10} {:>12} -> {:<12} {}",
                row.slug,
                row.classification.as_str(),
                if row.version_from.is_empty() { "-" } else { row.version_from.as_str() },
                if row.version_to.is_empty() { "-" } else { row.version_to.as_str() },
                row.annotations.category
            );
        }
    })
}

pub fn execute_summary(global: &GlobalArgs, args: PeriodArgs) -> CliResult {
    let (conn, rt) = open(global)?;
    let query = EngineQuery::SnapshotSummary {
        period_key: rt.period(args.period.as_deref())?,
    };
    let EngineQueryResult::Summary(summary) = apply_engine_query(query, &conn)? else {
        return Err("unexpected engine result for summary".into());
    };
    rt.print(&summary, |s| {
        println!("Summary {} ({}):", s.period_key, s.state.as_str());
        for classification in Classification::ALL {
            println!("  {}: {}", classification, s.summary.count(classification));
        }
        println!("  total: {}", s.total);
    })
}

pub fn execute_list(global: &GlobalArgs) -> CliResult {
    let (conn, rt) = open(global)?;
    let EngineQueryResult::Snapshots(snapshots) = apply_engine_query(EngineQuery::SnapshotList, &conn)? else {
        return Err("unexpected engine result for list".into());
    };
    rt.print(&snapshots, |snapshots| {
        if snapshots.is_empty() {
            println!("No snapshots");
        }
        for s in snapshots {
            println!(
                "{}  {:<6}  {} rows  {}",
                s.period_key,
                s.state().as_str(),
                s.summary.total(),
                s.snapshot_id
            );
        }
    })
}
