//! Update history commands

use chrono::{DateTime, Utc};
use clap::Args;
use stocktake_engine::{apply_engine_command, ComponentUpdate, EngineCommand, EngineCommandResult};

use crate::commands::{open, CliResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct RecordUpdateArgs {
    #[arg(long)]
    pub slug: String,

    /// Display name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Version before the update (inferred from history when omitted)
    #[arg(long)]
    pub from: Option<String>,

    /// Version after the update
    #[arg(long)]
    pub to: String,

    /// RFC 3339 time of the update (defaults to now)
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,

    #[arg(long)]
    pub source: Option<String>,
}

#[derive(Debug, Args)]
pub struct PruneArgs {
    /// Override `engine.history_retention_days`; 0 keeps everything
    #[arg(long)]
    pub retention_days: Option<u32>,
}

pub fn execute_record(global: &GlobalArgs, args: RecordUpdateArgs) -> CliResult {
    let (mut conn, rt) = open(global)?;
    let update = ComponentUpdate {
        slug: args.slug,
        name: args.name,
        previous_version: args.from,
        new_version: args.to,
        updated_on: args.at,
        source: args.source,
    };

    let EngineCommandResult::UpdateRecorded { inserted } =
        apply_engine_command(EngineCommand::RecordUpdate(update.clone()), &mut conn, &rt.deps())?
    else {
        return Err("unexpected engine result for record-update".into());
    };
    rt.print(&serde_json::json!({ "slug": update.slug, "inserted": inserted }), |_| {
        if inserted {
            println!("Recorded {} -> {}", update.slug, update.new_version);
        } else if rt.settings.track_update_history {
            println!("Already recorded: {} -> {}", update.slug, update.new_version);
        } else {
            println!("Update history disabled; nothing recorded");
        }
    })
}

pub fn execute_prune(global: &GlobalArgs, args: PruneArgs) -> CliResult {
    let (mut conn, rt) = open(global)?;
    let cmd = EngineCommand::PruneHistory {
        retention_days: args.retention_days,
    };
    let EngineCommandResult::HistoryPruned { removed } = apply_engine_command(cmd, &mut conn, &rt.deps())? else {
        return Err("unexpected engine result for prune-history".into());
    };
    rt.print(&serde_json::json!({ "removed": removed }), |_| {
        println!("Pruned {} history entries", removed);
    })
}
