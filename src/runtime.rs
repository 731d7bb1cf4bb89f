//! Container runtime capability boundary.
//!
//! Orchestration logic never shells out to `docker` directly; it goes through
//! `ContainerRuntime` so the lifecycle and readiness code can be exercised
//! against a fake runtime in tests.
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::process::{Command, Output, Stdio};

/// Observed state of a container, read fresh from the runtime on every query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

impl ContainerState {
    pub fn label(self) -> &'static str {
        match self {
            ContainerState::Absent => "not exists",
            ContainerState::Stopped => "stopped",
            ContainerState::Running => "running",
        }
    }
}

/// Captured result of one runtime invocation.
#[derive(Clone, Debug)]
pub struct ExecOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    fn from_output(output: Output) -> Self {
        ExecOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Creation parameters for a new container.
#[derive(Debug)]
pub struct RunSpec<'a> {
    pub container_name: &'a str,
    pub image: &'a str,
    pub host_port: u16,
    pub internal_port: u16,
    pub env: &'a [(String, String)],
}

/// Injected capability over the container runtime.
///
/// Every method is a synchronous, blocking call; an `Err` means the runtime
/// client itself could not be invoked, while a failed operation comes back as
/// an unsuccessful `ExecOutput` carrying the runtime's diagnostic text.
pub trait ContainerRuntime {
    /// Whether the runtime daemon is reachable at all.
    fn available(&self) -> bool;

    /// Current state of a named container. An unknown name is `Absent`,
    /// never an error, so callers can branch on the result directly.
    fn container_state(&self, container: &str) -> Result<ContainerState>;

    /// Whether an image is present locally. No network access.
    fn image_present(&self, image: &str) -> Result<bool>;

    /// Pull an image from its registry. May download large data; no timeout
    /// beyond the runtime client's own defaults.
    fn pull_image(&self, image: &str) -> Result<ExecOutput>;

    /// Create and start a container from `spec`.
    fn create_container(&self, spec: &RunSpec<'_>) -> Result<ExecOutput>;

    fn start_container(&self, container: &str) -> Result<ExecOutput>;

    fn stop_container(&self, container: &str) -> Result<ExecOutput>;

    fn remove_container(&self, container: &str) -> Result<ExecOutput>;

    /// Execute a command inside a running container, optionally feeding
    /// `stdin` to it.
    fn exec(&self, container: &str, argv: &[String], stdin: Option<&str>) -> Result<ExecOutput>;
}

/// Runtime implementation that spawns the `docker` CLI.
#[derive(Debug, Default)]
pub struct DockerCli;

impl DockerCli {
    pub fn new() -> Self {
        DockerCli
    }

    fn docker(&self, args: &[&str]) -> Result<ExecOutput> {
        let output = Command::new("docker")
            .args(args)
            .output()
            .with_context(|| format!("spawn docker {}", args.first().copied().unwrap_or("")))?;
        Ok(ExecOutput::from_output(output))
    }
}

impl ContainerRuntime for DockerCli {
    fn available(&self) -> bool {
        // A missing docker binary and an unreachable daemon are equivalent here.
        Command::new("docker")
            .arg("info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn container_state(&self, container: &str) -> Result<ContainerState> {
        let out = self.docker(&[
            "inspect",
            "--format",
            "{{.State.Running}}",
            container,
        ])?;
        if !out.success {
            return Ok(ContainerState::Absent);
        }
        if out.stdout.trim().eq_ignore_ascii_case("true") {
            Ok(ContainerState::Running)
        } else {
            Ok(ContainerState::Stopped)
        }
    }

    fn image_present(&self, image: &str) -> Result<bool> {
        let out = self.docker(&["image", "inspect", image])?;
        Ok(out.success)
    }

    fn pull_image(&self, image: &str) -> Result<ExecOutput> {
        self.docker(&["pull", image])
    }

    fn create_container(&self, spec: &RunSpec<'_>) -> Result<ExecOutput> {
        let port_binding = format!("{}:{}", spec.host_port, spec.internal_port);
        let mut args: Vec<String> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            spec.container_name.into(),
            "-p".into(),
            port_binding,
        ];
        for (key, value) in spec.env {
            args.push("-e".into());
            args.push(format!("{key}={value}"));
        }
        args.push(spec.image.into());

        let refs: Vec<&str> = args.iter().map(String::as_str).collect();
        self.docker(&refs)
    }

    fn start_container(&self, container: &str) -> Result<ExecOutput> {
        self.docker(&["start", container])
    }

    fn stop_container(&self, container: &str) -> Result<ExecOutput> {
        self.docker(&["stop", container])
    }

    fn remove_container(&self, container: &str) -> Result<ExecOutput> {
        self.docker(&["rm", container])
    }

    fn exec(&self, container: &str, argv: &[String], stdin: Option<&str>) -> Result<ExecOutput> {
        let mut cmd = Command::new("docker");
        cmd.arg("exec");
        if stdin.is_some() {
            cmd.arg("-i");
        }
        cmd.arg(container);
        cmd.args(argv);

        let Some(input) = stdin else {
            let output = cmd
                .output()
                .with_context(|| format!("spawn docker exec in {container}"))?;
            return Ok(ExecOutput::from_output(output));
        };

        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawn docker exec in {container}"))?;
        child
            .stdin
            .take()
            .context("open docker exec stdin")?
            .write_all(input.as_bytes())
            .context("write docker exec stdin")?;
        let output = child
            .wait_with_output()
            .with_context(|| format!("wait for docker exec in {container}"))?;
        Ok(ExecOutput::from_output(output))
    }
}
