//! Scheduler tick

use chrono::{DateTime, Utc};
use clap::Args;
use stocktake_core::clock::Clock;
use stocktake_engine::{apply_engine_command, EngineCommand, EngineCommandResult};

use crate::commands::{open, CliResult, GlobalArgs};

#[derive(Debug, Args)]
pub struct RunScheduledArgs {
    /// RFC 3339 tick time (defaults to now)
    #[arg(long)]
    pub now: Option<DateTime<Utc>>,
}

pub fn execute(global: &GlobalArgs, args: RunScheduledArgs) -> CliResult {
    let (mut conn, rt) = open(global)?;
    let now = args.now.unwrap_or_else(|| rt.clock.now());

    let EngineCommandResult::Scheduled { run } =
        apply_engine_command(EngineCommand::RunScheduled { now }, &mut conn, &rt.deps())?
    else {
        return Err("unexpected engine result for run-scheduled".into());
    };
    rt.print(&run, |run| match run {
        None => println!("Not due at {}", now.to_rfc3339()),
        Some(run) => {
            println!("Scheduled run {}:", run.run_id);
            println!("  period: {}", run.snapshot.period_key);
            println!("  generation: {:?}", run.generation.status);
            println!("  locked: {}", run.snapshot.locked);
        }
    })
}
