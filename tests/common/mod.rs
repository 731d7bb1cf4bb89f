//! Shared test infrastructure for integration tests.

use std::process::{Command, Output};

/// Run the built dbfix binary with the given arguments.
pub fn run_dbfix(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dbfix"))
        .args(args)
        .output()
        .expect("failed to spawn dbfix")
}

/// Whether a usable docker daemon is reachable from this environment.
pub fn docker_available() -> bool {
    Command::new("docker")
        .arg("info")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn stderr_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

pub fn stdout_of(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}
