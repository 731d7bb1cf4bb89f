//! Integration tests for input-error exit semantics.
//!
//! Unknown target names must be rejected before any runtime call, so these
//! tests run without docker installed.

mod common;

use common::{docker_available, run_dbfix, stderr_of, stdout_of};

#[test]
fn unknown_target_fails_before_touching_the_runtime() {
    let output = run_dbfix(&["start", "no-such-db"]);

    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("unknown target: no-such-db"), "{stderr}");
    // The rejection lists the registered names for discoverability.
    assert!(stderr.contains("postgres"), "{stderr}");
}

#[test]
fn unknown_target_is_rejected_for_every_subcommand() {
    for subcommand in ["start", "stop", "status", "remove"] {
        let output = run_dbfix(&[subcommand, "bogus"]);
        assert!(
            !output.status.success(),
            "{subcommand} accepted an unknown target"
        );
        assert!(stderr_of(&output).contains("unknown target"), "{subcommand}");
    }
}

#[test]
fn load_sql_rejects_unknown_target_before_reading_the_file() {
    let output = run_dbfix(&["load-sql", "bogus", "--file", "/no/such/file.sql"]);

    assert!(!output.status.success());
    let stderr = stderr_of(&output);
    assert!(stderr.contains("unknown target: bogus"), "{stderr}");
    assert!(!stderr.contains("no/such/file.sql"), "{stderr}");
}

#[test]
fn help_lists_all_subcommands() {
    let output = run_dbfix(&["--help"]);

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    for subcommand in ["start", "stop", "status", "remove", "load-sql"] {
        assert!(stdout.contains(subcommand), "missing {subcommand}: {stdout}");
    }
}

#[test]
fn status_renders_a_row_per_target() {
    if !docker_available() {
        eprintln!("Skipping: docker not available");
        return;
    }

    let output = run_dbfix(&["status"]);

    assert!(output.status.success());
    let stdout = stdout_of(&output);
    for name in ["mssql2025", "mssql2022", "mssql2019", "mssql2017", "postgres"] {
        assert!(stdout.contains(name), "missing {name}: {stdout}");
    }
}

#[test]
fn status_json_is_machine_readable() {
    if !docker_available() {
        eprintln!("Skipping: docker not available");
        return;
    }

    let output = run_dbfix(&["status", "postgres", "--json"]);

    assert!(output.status.success());
    let rows: serde_json::Value =
        serde_json::from_str(&stdout_of(&output)).expect("status --json must emit valid JSON");
    assert_eq!(rows[0]["name"], "postgres");
    assert_eq!(rows[0]["port"], 5432);
}
