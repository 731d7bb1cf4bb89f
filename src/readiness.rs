//! Two-phase readiness probing for freshly started database containers.
//!
//! An engine reporting ready inside its container does not guarantee the
//! host-side port forwarding is usable yet; probing only internally produces
//! intermittent "connection refused" failures in dependent test runs. Both
//! phases share one deadline: time spent in phase 1 counts against phase 2.
use crate::registry::{EngineFamily, TargetConfig, DB_PASSWORD};
use crate::runtime::ContainerRuntime;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Interval between readiness poll attempts.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Which readiness layer a probe addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Engine accepting connections inside its own container.
    Internal,
    /// Engine reachable from the host through the forwarded port.
    External,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Internal => write!(f, "internal"),
            Phase::External => write!(f, "external"),
        }
    }
}

/// Why a readiness wait did not succeed.
///
/// `Timeout` means the engine never became ready within the deadline;
/// `Probe` means the probe itself could not run, which callers must not
/// confuse with a slow engine.
#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("timed out after {elapsed:?} waiting for {phase} readiness")]
    Timeout { phase: Phase, elapsed: Duration },
    #[error("readiness probe could not run")]
    Probe(#[from] anyhow::Error),
}

/// Host-side connectivity checks through the forwarded port.
pub trait HostClient {
    /// Run the engine-family connectivity probe against `localhost` and the
    /// target's host port. `Ok(None)` means the required client tool is not
    /// installed on the host.
    fn probe(&self, target: &TargetConfig) -> Result<Option<bool>>;
}

/// Host probe implementation using locally installed SQL client tools.
#[derive(Debug, Default)]
pub struct HostTools;

impl HostTools {
    pub fn new() -> Self {
        HostTools
    }

    fn find_sqlcmd(&self) -> Option<PathBuf> {
        // Fixed install locations first; which() only as a fallback so the
        // probe matches whichever tools package provides sqlcmd.
        for candidate in [
            "/opt/mssql-tools18/bin/sqlcmd",
            "/opt/mssql-tools/bin/sqlcmd",
        ] {
            let path = Path::new(candidate);
            if path.is_file() {
                return Some(path.to_path_buf());
            }
        }
        which::which("sqlcmd").ok()
    }
}

impl HostClient for HostTools {
    fn probe(&self, target: &TargetConfig) -> Result<Option<bool>> {
        match target.family {
            EngineFamily::Mssql => {
                let Some(sqlcmd) = self.find_sqlcmd() else {
                    return Ok(None);
                };
                let server = format!("localhost,{}", target.host_port);
                let output = Command::new(&sqlcmd)
                    .args([
                        "-S",
                        server.as_str(),
                        "-U",
                        "SA",
                        "-P",
                        DB_PASSWORD,
                        "-C",
                        "-Q",
                        "SELECT 1",
                        "-l",
                        "5",
                    ])
                    .output()
                    .with_context(|| format!("spawn {}", sqlcmd.display()))?;
                Ok(Some(output.status.success()))
            }
            EngineFamily::Postgres => {
                let Ok(pg_isready) = which::which("pg_isready") else {
                    return Ok(None);
                };
                let port = target.host_port.to_string();
                let output = Command::new(&pg_isready)
                    .args([
                        "-h",
                        "localhost",
                        "-p",
                        port.as_str(),
                        "-U",
                        "postgres",
                        "-t",
                        "5",
                    ])
                    .output()
                    .with_context(|| format!("spawn {}", pg_isready.display()))?;
                Ok(Some(output.status.success()))
            }
        }
    }
}

/// Block until the target's database is reachable or the deadline elapses.
///
/// Phase 1 polls the target's in-container health check; only after it
/// passes does phase 2 poll connectivity from the host. A missing host client
/// tool downgrades phase 2 to a warning.
pub fn wait_for_ready(
    runtime: &dyn ContainerRuntime,
    host: &dyn HostClient,
    target: &TargetConfig,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<(), ReadinessError> {
    println!(
        "  Waiting for {} to be ready (timeout: {}s)...",
        target.name,
        timeout.as_secs()
    );
    let started = Instant::now();

    loop {
        if started.elapsed() >= timeout {
            return Err(ReadinessError::Timeout {
                phase: Phase::Internal,
                elapsed: started.elapsed(),
            });
        }
        let out = runtime
            .exec(&target.container_name, &target.health_check_cmd, None)
            .context("run in-container health check")?;
        if out.success {
            println!(
                "  Internal check passed after {:.1}s, verifying external connectivity...",
                started.elapsed().as_secs_f64()
            );
            break;
        }
        tracing::debug!(fixture = %target.name, "internal health check not ready");
        thread::sleep(poll_interval);
    }

    loop {
        if started.elapsed() >= timeout {
            return Err(ReadinessError::Timeout {
                phase: Phase::External,
                elapsed: started.elapsed(),
            });
        }
        match host.probe(target).context("run host connectivity probe")? {
            None => {
                tracing::warn!(
                    fixture = %target.name,
                    "host client tool not found, skipping external connectivity check"
                );
                println!(
                    "  Warning: host client tool not found, skipping external connectivity check"
                );
                return Ok(());
            }
            Some(true) => {
                println!("  Ready after {:.1}s", started.elapsed().as_secs_f64());
                return Ok(());
            }
            Some(false) => thread::sleep(poll_interval),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::all_targets;
    use crate::runtime::testing::{exec_fail, exec_ok, FakeRuntime};
    use crate::runtime::ContainerState;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    struct FakeHost {
        responses: RefCell<VecDeque<Option<bool>>>,
        default: Option<bool>,
        calls: Cell<usize>,
    }

    impl FakeHost {
        fn always(default: Option<bool>) -> Self {
            FakeHost {
                responses: RefCell::new(VecDeque::new()),
                default,
                calls: Cell::new(0),
            }
        }
    }

    impl HostClient for FakeHost {
        fn probe(&self, _target: &TargetConfig) -> Result<Option<bool>> {
            self.calls.set(self.calls.get() + 1);
            Ok(self
                .responses
                .borrow_mut()
                .pop_front()
                .unwrap_or(self.default))
        }
    }

    fn postgres() -> TargetConfig {
        all_targets()
            .into_iter()
            .find(|target| target.name == "postgres")
            .unwrap()
    }

    fn fast(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn internal_timeout_never_reaches_external_phase() {
        let runtime = FakeRuntime::with_state("postgres-16.4", ContainerState::Running);
        runtime.exec_default_fails.set(true);
        let host = FakeHost::always(Some(true));

        let err = wait_for_ready(&runtime, &host, &postgres(), fast(30), fast(1)).unwrap_err();

        match err {
            ReadinessError::Timeout { phase, .. } => assert_eq!(phase, Phase::Internal),
            other => panic!("expected internal timeout, got {other:?}"),
        }
        assert_eq!(host.calls.get(), 0);
    }

    #[test]
    fn external_probe_runs_only_after_internal_success() {
        let runtime = FakeRuntime::with_state("postgres-16.4", ContainerState::Running);
        runtime.push_exec(exec_fail("starting up"));
        runtime.push_exec(exec_fail("starting up"));
        runtime.push_exec(exec_ok());
        let host = FakeHost::always(Some(true));

        wait_for_ready(&runtime, &host, &postgres(), fast(500), fast(1)).unwrap();

        assert_eq!(runtime.count_calls("exec postgres-16.4"), 3);
        assert_eq!(host.calls.get(), 1);
    }

    #[test]
    fn external_phase_times_out_on_shared_deadline() {
        let runtime = FakeRuntime::with_state("postgres-16.4", ContainerState::Running);
        let host = FakeHost::always(Some(false));

        let err = wait_for_ready(&runtime, &host, &postgres(), fast(30), fast(1)).unwrap_err();

        match err {
            ReadinessError::Timeout { phase, .. } => assert_eq!(phase, Phase::External),
            other => panic!("expected external timeout, got {other:?}"),
        }
        assert!(host.calls.get() >= 1);
    }

    #[test]
    fn missing_host_tool_counts_as_ready() {
        let runtime = FakeRuntime::with_state("postgres-16.4", ContainerState::Running);
        let host = FakeHost::always(None);

        wait_for_ready(&runtime, &host, &postgres(), fast(500), fast(1)).unwrap();

        assert_eq!(host.calls.get(), 1);
    }

    #[test]
    fn probe_execution_failure_is_not_a_timeout() {
        let runtime = FakeRuntime::with_state("postgres-16.4", ContainerState::Running);
        runtime.fail_on("exec postgres-16.4");
        let host = FakeHost::always(Some(true));

        let err = wait_for_ready(&runtime, &host, &postgres(), fast(500), fast(1)).unwrap_err();

        assert!(matches!(err, ReadinessError::Probe(_)), "{err:?}");
    }
}
