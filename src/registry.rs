//! Static registry of database fixture targets.
//!
//! Each target pairs one container with one host port; configuration is fixed
//! at build time, so changing a target requires `remove` then `start`.
use crate::runtime::RunSpec;
use anyhow::{anyhow, Result};

/// Password shared by all fixture databases.
///
/// MS SQL enforces complexity rules: 8+ chars, uppercase, lowercase, digit,
/// special char.
pub const DB_PASSWORD: &str = "Lightweight!Test42";

/// Database product family, selecting client-tool dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineFamily {
    Mssql,
    Postgres,
}

/// One logical database fixture: container, port binding, and provisioning
/// parameters.
#[derive(Clone, Debug)]
pub struct TargetConfig {
    pub name: String,
    pub container_name: String,
    pub image: String,
    pub host_port: u16,
    pub internal_port: u16,
    pub env: Vec<(String, String)>,
    pub health_check_cmd: Vec<String>,
    pub test_database: String,
    pub family: EngineFamily,
}

impl TargetConfig {
    pub fn run_spec(&self) -> RunSpec<'_> {
        RunSpec {
            container_name: &self.container_name,
            image: &self.image,
            host_port: self.host_port,
            internal_port: self.internal_port,
            env: &self.env,
        }
    }

    /// In-container SQL client invocation, optionally bound to a database.
    ///
    /// For MS SQL the sqlcmd path and the `-C` trust flag follow the health
    /// check: mssql-tools18 images need `-C`, older tools reject it.
    pub fn client_argv(&self, database: Option<&str>) -> Vec<String> {
        let mut argv: Vec<String> = match self.family {
            EngineFamily::Mssql => {
                let sqlcmd = self.health_check_cmd[0].clone();
                let mut argv = vec![
                    sqlcmd,
                    "-S".into(),
                    "localhost".into(),
                    "-U".into(),
                    "SA".into(),
                    "-P".into(),
                    DB_PASSWORD.into(),
                ];
                if self.health_check_cmd.iter().any(|arg| arg == "-C") {
                    argv.push("-C".into());
                }
                argv
            }
            EngineFamily::Postgres => {
                vec!["psql".into(), "-U".into(), "postgres".into()]
            }
        };
        if let Some(database) = database {
            argv.push("-d".into());
            argv.push(database.into());
        }
        argv
    }
}

fn mssql_target(name: &str, container: &str, image: &str, host_port: u16) -> TargetConfig {
    // 2022+ images ship mssql-tools18, which requires -C to trust the
    // self-signed server certificate.
    let tools18 = matches!(name, "mssql2022" | "mssql2025");
    let sqlcmd = if tools18 {
        "/opt/mssql-tools18/bin/sqlcmd"
    } else {
        "/opt/mssql-tools/bin/sqlcmd"
    };
    let mut health_check_cmd: Vec<String> = vec![
        sqlcmd.into(),
        "-S".into(),
        "localhost".into(),
        "-U".into(),
        "SA".into(),
        "-P".into(),
        DB_PASSWORD.into(),
    ];
    if tools18 {
        health_check_cmd.push("-C".into());
    }
    health_check_cmd.push("-Q".into());
    health_check_cmd.push("SELECT 1".into());

    TargetConfig {
        name: name.into(),
        container_name: container.into(),
        image: image.into(),
        host_port,
        internal_port: 1433,
        env: vec![
            ("ACCEPT_EULA".into(), "Y".into()),
            ("MSSQL_SA_PASSWORD".into(), DB_PASSWORD.into()),
        ],
        health_check_cmd,
        test_database: "LightweightTest".into(),
        family: EngineFamily::Mssql,
    }
}

/// All registered targets, in display order.
pub fn all_targets() -> Vec<TargetConfig> {
    vec![
        mssql_target(
            "mssql2025",
            "sql2025",
            "mcr.microsoft.com/mssql/server:2025-latest",
            1435,
        ),
        mssql_target(
            "mssql2022",
            "sql2022",
            "mcr.microsoft.com/mssql/server:2022-latest",
            1433,
        ),
        mssql_target(
            "mssql2019",
            "sql2019",
            "mcr.microsoft.com/mssql/server:2019-latest",
            1434,
        ),
        mssql_target(
            "mssql2017",
            "sql2017",
            "mcr.microsoft.com/mssql/server:2017-latest",
            1432,
        ),
        TargetConfig {
            name: "postgres".into(),
            container_name: "postgres-16.4".into(),
            image: "postgres:16.4".into(),
            host_port: 5432,
            internal_port: 5432,
            env: vec![("POSTGRES_PASSWORD".into(), DB_PASSWORD.into())],
            health_check_cmd: vec!["pg_isready".into(), "-U".into(), "postgres".into()],
            test_database: "test".into(),
            family: EngineFamily::Postgres,
        },
    ]
}

/// Resolve requested target names against the registry.
///
/// An empty request means all targets. Any unknown name is a fatal input
/// error; nothing touches the runtime before this resolves.
pub fn select_targets(names: &[String]) -> Result<Vec<TargetConfig>> {
    let all = all_targets();
    if names.is_empty() {
        return Ok(all);
    }

    let mut selected = Vec::with_capacity(names.len());
    for name in names {
        let target = all
            .iter()
            .find(|target| &target.name == name)
            .cloned()
            .ok_or_else(|| {
                let mut available: Vec<&str> =
                    all.iter().map(|target| target.name.as_str()).collect();
                available.sort_unstable();
                anyhow!("unknown target: {name} (available: {})", available.join(", "))
            })?;
        selected.push(target);
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn container_names_and_host_ports_are_unique() {
        let targets = all_targets();
        let containers: BTreeSet<_> = targets
            .iter()
            .map(|target| target.container_name.as_str())
            .collect();
        let ports: BTreeSet<_> = targets.iter().map(|target| target.host_port).collect();
        assert_eq!(containers.len(), targets.len());
        assert_eq!(ports.len(), targets.len());
    }

    #[test]
    fn empty_selection_returns_all_targets() {
        let selected = select_targets(&[]).unwrap();
        assert_eq!(selected.len(), all_targets().len());
    }

    #[test]
    fn selection_preserves_request_order() {
        let selected =
            select_targets(&["postgres".to_string(), "mssql2019".to_string()]).unwrap();
        let names: Vec<_> = selected.iter().map(|target| target.name.as_str()).collect();
        assert_eq!(names, ["postgres", "mssql2019"]);
    }

    #[test]
    fn unknown_target_is_rejected() {
        let err = select_targets(&["mariadb".to_string()]).unwrap_err();
        let message = format!("{err}");
        assert!(message.contains("unknown target: mariadb"), "{message}");
        assert!(message.contains("postgres"), "{message}");
    }

    #[test]
    fn mssql_client_argv_follows_health_check_dialect() {
        let targets = all_targets();
        let modern = targets.iter().find(|t| t.name == "mssql2022").unwrap();
        let legacy = targets.iter().find(|t| t.name == "mssql2017").unwrap();

        let modern_argv = modern.client_argv(Some("LightweightTest"));
        assert_eq!(modern_argv[0], "/opt/mssql-tools18/bin/sqlcmd");
        assert!(modern_argv.iter().any(|arg| arg == "-C"));
        assert_eq!(
            modern_argv[modern_argv.len() - 2..],
            ["-d".to_string(), "LightweightTest".to_string()]
        );

        let legacy_argv = legacy.client_argv(None);
        assert_eq!(legacy_argv[0], "/opt/mssql-tools/bin/sqlcmd");
        assert!(!legacy_argv.iter().any(|arg| arg == "-C"));
    }

    #[test]
    fn postgres_client_argv_uses_psql() {
        let targets = all_targets();
        let postgres = targets.iter().find(|t| t.name == "postgres").unwrap();
        assert_eq!(
            postgres.client_argv(Some("test")),
            ["psql", "-U", "postgres", "-d", "test"]
        );
    }
}
