//! Snapshot write commands: generate, lock/unlock, annotate

use clap::Args;
use stocktake_core::model::AnnotationPatch;
use stocktake_engine::{apply_engine_command, EngineCommand, EngineCommandResult, GenerationStatus, Trigger};

use crate::commands::{open, CliResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct PeriodArgs {
    /// Period key `YYYY-MM` (defaults to the current month)
    #[arg(long)]
    pub period: Option<String>,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    #[arg(long)]
    pub period: Option<String>,

    /// Regenerate even when the snapshot is locked
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Args)]
pub struct AnnotateArgs {
    #[arg(long)]
    pub period: Option<String>,

    #[arg(long)]
    pub slug: String,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub notes: Option<String>,

    #[arg(long)]
    pub comments: Option<String>,
}

pub fn execute_generate(global: &GlobalArgs, args: GenerateArgs) -> CliResult {
    let (mut conn, rt) = open(global)?;
    let trigger = Trigger::new(rt.period(args.period.as_deref())?, args.force);

    let EngineCommandResult::Generated(outcome) =
        apply_engine_command(EngineCommand::Generate(trigger), &mut conn, &rt.deps())?
    else {
        return Err("unexpected engine result for generate".into());
    };

    rt.print(&outcome, |o| {
        let verb = match o.status {
            GenerationStatus::Created => "Snapshot created",
            GenerationStatus::Refreshed => "Snapshot refreshed",
            GenerationStatus::SkippedLocked => "Snapshot locked, not regenerated (use --force)",
        };
        println!("{}:", verb);
        println!("  period: {}", o.snapshot.period_key);
        println!("  snapshot_id: {}", o.snapshot.snapshot_id);
        println!(
            "  new: {}  updated: {}  deleted: {}  unchanged: {}",
            o.snapshot.summary.new, o.snapshot.summary.updated, o.snapshot.summary.deleted, o.snapshot.summary.unchanged
        );
        println!("  event_log: {} ({} rows enriched)", o.source_status, o.enriched_rows);
    })
}

pub fn execute_lock(global: &GlobalArgs, args: PeriodArgs, lock: bool) -> CliResult {
    let (mut conn, rt) = open(global)?;
    let period_key = rt.period(args.period.as_deref())?;
    let cmd = if lock {
        EngineCommand::Lock { period_key }
    } else {
        EngineCommand::Unlock { period_key }
    };

    let snapshot = match apply_engine_command(cmd, &mut conn, &rt.deps())? {
        EngineCommandResult::Locked(s) | EngineCommandResult::Unlocked(s) => s,
        _ => return Err("unexpected engine result for lock".into()),
    };
    rt.print(&snapshot, |s| {
        println!(
            "Snapshot {} {}",
            s.period_key,
            if s.locked { "locked" } else { "unlocked" }
        );
    })
}

pub fn execute_annotate(global: &GlobalArgs, args: AnnotateArgs) -> CliResult {
    let (mut conn, rt) = open(global)?;
    let cmd = EngineCommand::SetAnnotation {
        period_key: rt.period(args.period.as_deref())?,
        slug: args.slug,
        patch: AnnotationPatch {
            category: args.category,
            notes: args.notes,
            comments: args.comments,
        },
    };

    let EngineCommandResult::Annotated(row) = apply_engine_command(cmd, &mut conn, &rt.deps())? else {
        return Err("unexpected engine result for annotate".into());
    };
    rt.print(&row, |r| {
        println!("Annotated {} in {}:", r.slug, r.period_key);
        println!("  category: {}", r.annotations.category);
        println!("  notes: {}", r.annotations.notes);
        println!("  comments: {}", r.annotations.comments);
    })
}
