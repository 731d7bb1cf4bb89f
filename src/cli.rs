//! CLI argument parsing for the fixture orchestrator.
//!
//! The CLI is intentionally thin: each subcommand maps one-to-one onto a
//! library operation, so the orchestration logic stays reusable and testable
//! without a terminal.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Readiness deadline applied when `--timeout` is not given.
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 120;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "dbfix",
    version,
    about = "Docker-backed SQL database fixtures for integration tests",
    after_help = "Examples:\n  dbfix start                     Start all databases\n  dbfix start --wait              Start all and wait for readiness\n  dbfix start mssql2022           Start only MS SQL 2022\n  dbfix stop                      Stop all databases\n  dbfix status                    Show container status\n  dbfix remove                    Remove all containers\n  dbfix load-sql --file schema.sql postgres",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level fixture commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Start(StartArgs),
    Stop(StopArgs),
    Status(StatusArgs),
    Remove(RemoveArgs),
    LoadSql(LoadSqlArgs),
}

/// Start command inputs.
#[derive(Parser, Debug)]
#[command(about = "Start database containers (idempotent)")]
pub struct StartArgs {
    /// Targets to operate on (default: all)
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Wait for databases to be ready and create their test databases
    #[arg(long)]
    pub wait: bool,

    /// Readiness timeout in seconds (with --wait)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    pub timeout: u64,
}

/// Stop command inputs.
#[derive(Parser, Debug)]
#[command(about = "Stop database containers")]
pub struct StopArgs {
    /// Targets to operate on (default: all)
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

/// Status command inputs.
#[derive(Parser, Debug)]
#[command(about = "Show container status for each target")]
pub struct StatusArgs {
    /// Targets to operate on (default: all)
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Remove command inputs.
#[derive(Parser, Debug)]
#[command(about = "Stop and remove database containers")]
pub struct RemoveArgs {
    /// Targets to operate on (default: all)
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

/// Load-sql command inputs.
#[derive(Parser, Debug)]
#[command(about = "Load a SQL file into one running target's test database")]
pub struct LoadSqlArgs {
    /// Target to load into
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Path to the SQL file to load
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,
}
