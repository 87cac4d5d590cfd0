//! Stocktake CLI
//!
//! Command-line interface for periodic inventory snapshots

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "stocktake")]
#[command(about = "Stocktake - Periodic inventory snapshots and reconciliation", long_about = None)]
struct Cli {
    /// Config file (defaults to ./stocktake.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `store.db_path`
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Override `store.inventory_path`
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate or refresh a period's snapshot
    Generate(commands::snapshot::GenerateArgs),
    /// Lock a snapshot
    Lock(commands::snapshot::PeriodArgs),
    /// Unlock a snapshot
    Unlock(commands::snapshot::PeriodArgs),
    /// Edit a row's annotations
    Annotate(commands::snapshot::AnnotateArgs),
    /// Show a snapshot header
    Show(commands::report::PeriodArgs),
    /// List a snapshot's rows
    Rows(commands::report::RowsArgs),
    /// Show a snapshot's summary counts
    Summary(commands::report::PeriodArgs),
    /// List all snapshots
    List,
    /// Record a component update in the internal history
    RecordUpdate(commands::history::RecordUpdateArgs),
    /// Delete history past the retention window
    PruneHistory(commands::history::PruneArgs),
    /// Scheduler tick: generate (and lock) when due
    RunScheduled(commands::schedule::RunScheduledArgs),
}

fn main() {
    let cli = Cli::parse();

    let global = commands::GlobalArgs {
        config: cli.config,
        db: cli.db,
        inventory: cli.inventory,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Generate(args) => commands::snapshot::execute_generate(&global, args),
        Commands::Lock(args) => commands::snapshot::execute_lock(&global, args, true),
        Commands::Unlock(args) => commands::snapshot::execute_lock(&global, args, false),
        Commands::Annotate(args) => commands::snapshot::execute_annotate(&global, args),
        Commands::Show(args) => commands::report::execute_show(&global, args),
        Commands::Rows(args) => commands::report::execute_rows(&global, args),
        Commands::Summary(args) => commands::report::execute_summary(&global, args),
        Commands::List => commands::report::execute_list(&global),
        Commands::RecordUpdate(args) => commands::history::execute_record(&global, args),
        Commands::PruneHistory(args) => commands::history::execute_prune(&global, args),
        Commands::RunScheduled(args) => commands::schedule::execute(&global, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
