use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use caseflow::format::OutputFormat;
use caseflow::telemetry;

mod app;
mod case_cmd;
mod hearing_cmd;
mod render;

/// Concurrent case editing with conflict detection and an audit trail
///
/// Every write is version-checked: an update that started from an old
/// version is merged when the concurrent edits touch different fields, and
/// refused when they touch the same field. Every successful write appends
/// an audit entry.
///
/// EXIT STATUS:
///
///   0  success (including "nothing changed")
///   2  conflict: nothing was written; reload the case and resubmit
///   1  error
///
/// QUICK START:
///
///   caseflow case create --file case.json --actor-id u-1 --actor-name "Li Wei" --actor-role lawyer
///   caseflow case show 1
///   caseflow case update 1 --request update.json --actor-id u-1 --actor-name "Li Wei" --actor-role lawyer
///   caseflow case log 1 --limit 10
///   caseflow hearing stages 1
#[derive(Parser)]
#[command(name = "caseflow")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(after_help = "See 'caseflow <command> --help' for more information on a specific command.")]
struct Cli {
    /// Config file (default: ./caseflow.toml; missing file means defaults)
    #[arg(long, global = true, env = "CASEFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// File store directory (overrides `store.path` and selects the file backend)
    #[arg(long, global = true, env = "CASEFLOW_STORE")]
    store: Option<PathBuf>,

    /// Output format: json or text
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, inspect, and update cases
    #[command(subcommand)]
    Case(case_cmd::CaseCommands),

    /// Record hearings and query trial-stage availability
    #[command(subcommand)]
    Hearing(hearing_cmd::HearingCommands),
}

fn main() -> ExitCode {
    let _telemetry = telemetry::init();
    let cli = Cli::parse();

    let result = app::App::open(cli.config.as_deref(), cli.store.as_deref(), cli.format)
        .and_then(|app| match cli.command {
            Commands::Case(cmd) => case_cmd::run(&app, cmd),
            Commands::Hearing(cmd) => hearing_cmd::run(&app, cmd),
        });

    match result {
        Ok(status) => status.into(),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
