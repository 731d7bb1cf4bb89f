use anyhow::{bail, Result};
use clap::Parser;
use serde::Serialize;
use std::process::ExitCode;
use std::time::Duration;

mod batch;
mod cli;
mod database;
mod lifecycle;
mod readiness;
mod registry;
mod runtime;

use batch::{run_batch, Operation};
use cli::{Command, LoadSqlArgs, RootArgs, StartArgs, StatusArgs};
use readiness::{wait_for_ready, HostTools, ReadinessError, POLL_INTERVAL};
use registry::select_targets;
use runtime::{ContainerRuntime, ContainerState, DockerCli};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = RootArgs::parse();
    let runtime = DockerCli::new();
    match run(&runtime, args.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(runtime: &dyn ContainerRuntime, command: Command) -> Result<ExitCode> {
    match command {
        Command::Start(args) => cmd_start(runtime, args),
        Command::Stop(args) => cmd_batch(runtime, &args.targets, Operation::Stop),
        Command::Status(args) => cmd_status(runtime, args),
        Command::Remove(args) => cmd_batch(runtime, &args.targets, Operation::Remove),
        Command::LoadSql(args) => cmd_load_sql(runtime, args),
    }
}

/// Abort early when the docker daemon is unreachable. Target names are always
/// resolved before this check so input errors never touch the runtime.
fn ensure_runtime_available(runtime: &dyn ContainerRuntime) -> Result<()> {
    if !runtime.available() {
        bail!("Docker is not available or not running; ensure the Docker daemon is running");
    }
    Ok(())
}

fn cmd_batch(
    runtime: &dyn ContainerRuntime,
    names: &[String],
    operation: Operation,
) -> Result<ExitCode> {
    let targets = select_targets(names)?;
    ensure_runtime_available(runtime)?;

    let report = run_batch(runtime, &targets, operation);
    if report.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn cmd_start(runtime: &dyn ContainerRuntime, args: StartArgs) -> Result<ExitCode> {
    let targets = select_targets(&args.targets)?;
    ensure_runtime_available(runtime)?;

    let report = run_batch(runtime, &targets, Operation::Start);
    if !report.all_succeeded() {
        return Ok(ExitCode::FAILURE);
    }

    if args.wait {
        println!();
        let host = HostTools::new();
        let timeout = Duration::from_secs(args.timeout);
        for target in &targets {
            // A target whose container vanished between start and wait is
            // skipped rather than reported ready.
            if runtime.container_state(&target.container_name)? != ContainerState::Running {
                continue;
            }
            match wait_for_ready(runtime, &host, target, timeout, POLL_INTERVAL) {
                Ok(()) => {}
                Err(err @ ReadinessError::Timeout { .. }) => {
                    println!("  {err}");
                    return Ok(ExitCode::FAILURE);
                }
                Err(ReadinessError::Probe(err)) => return Err(err),
            }
            database::ensure_database(runtime, target)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct StatusRow {
    name: String,
    container: String,
    port: u16,
    state: ContainerState,
}

fn cmd_status(runtime: &dyn ContainerRuntime, args: StatusArgs) -> Result<ExitCode> {
    let targets = select_targets(&args.targets)?;
    ensure_runtime_available(runtime)?;

    let mut rows = Vec::with_capacity(targets.len());
    for target in &targets {
        let state = runtime.container_state(&target.container_name)?;
        rows.push(StatusRow {
            name: target.name.clone(),
            container: target.container_name.clone(),
            port: target.host_port,
            state,
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    println!(
        "{:<12} {:<16} {:<8} {:<12}",
        "Database", "Container", "Port", "Status"
    );
    println!("{}", "-".repeat(50));
    for row in &rows {
        println!(
            "{:<12} {:<16} {:<8} {:<12}",
            row.name,
            row.container,
            row.port,
            row.state.label()
        );
    }
    println!();
    Ok(ExitCode::SUCCESS)
}

fn cmd_load_sql(runtime: &dyn ContainerRuntime, args: LoadSqlArgs) -> Result<ExitCode> {
    let targets = select_targets(std::slice::from_ref(&args.target))?;
    let target = &targets[0];
    ensure_runtime_available(runtime)?;

    if runtime.container_state(&target.container_name)? != ContainerState::Running {
        bail!("container {} is not running", target.container_name);
    }
    database::load_sql(runtime, target, &args.file)?;
    Ok(ExitCode::SUCCESS)
}
