//! Logical test-database provisioning and SQL script loading.
use crate::registry::{EngineFamily, TargetConfig};
use crate::runtime::ContainerRuntime;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

/// Ensure the target's test database exists, creating it when missing.
///
/// Safe to call on every invocation: MS SQL guards creation inside the
/// statement, PostgreSQL checks `pg_database` before issuing CREATE.
pub fn ensure_database(runtime: &dyn ContainerRuntime, target: &TargetConfig) -> Result<()> {
    let database = &target.test_database;
    println!("  Creating database {database}...");

    match target.family {
        EngineFamily::Mssql => {
            let mut argv = target.client_argv(None);
            argv.push("-Q".into());
            argv.push(format!(
                "IF NOT EXISTS (SELECT name FROM sys.databases WHERE name = '{database}') \
                 CREATE DATABASE [{database}]"
            ));
            let out = runtime
                .exec(&target.container_name, &argv, None)
                .context("run sqlcmd")?;
            if !out.success {
                bail!("failed to create database {database}: {}", out.stderr.trim());
            }
        }
        EngineFamily::Postgres => {
            let check = vec![
                "psql".to_string(),
                "-U".to_string(),
                "postgres".to_string(),
                "-tAc".to_string(),
                format!("SELECT 1 FROM pg_database WHERE datname = '{database}'"),
            ];
            let out = runtime
                .exec(&target.container_name, &check, None)
                .context("run psql existence check")?;
            if out.stdout.trim() == "1" {
                println!("  Created database (or already exists)");
                return Ok(());
            }

            let create = vec![
                "psql".to_string(),
                "-U".to_string(),
                "postgres".to_string(),
                "-c".to_string(),
                format!("CREATE DATABASE {database}"),
            ];
            let out = runtime
                .exec(&target.container_name, &create, None)
                .context("run psql create")?;
            if !out.success {
                bail!("failed to create database {database}: {}", out.stderr.trim());
            }
        }
    }

    println!("  Created database (or already exists)");
    Ok(())
}

/// Stream a SQL file into the target's in-container client, bound to the
/// test database.
///
/// No transaction boundary is added here; a script failing mid-statement
/// leaves whatever state the client left behind.
pub fn load_sql(runtime: &dyn ContainerRuntime, target: &TargetConfig, path: &Path) -> Result<()> {
    let sql = fs::read_to_string(path)
        .with_context(|| format!("read SQL file {}", path.display()))?;

    println!("Loading {} into {}...", path.display(), target.name);
    let argv = target.client_argv(Some(&target.test_database));
    let out = runtime
        .exec(&target.container_name, &argv, Some(&sql))
        .context("run in-container SQL client")?;
    if !out.success {
        bail!("failed to load SQL file: {}", out.stderr.trim());
    }

    println!("Loaded SQL file successfully");
    Ok(())
}
