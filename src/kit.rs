use crate::artifacts::ArtifactDir;
use crate::config::{DatabaseConfig, KitConfig, StderrPolicy};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KitStep {
    /// Introspect the live database into a baseline snapshot.
    Pull,
    /// Diff the rendered schema against the baseline into SQL files.
    Generate,
    /// Apply pending SQL files to the live database.
    Migrate,
    Check,
}

impl KitStep {
    pub fn subcommand(self) -> &'static str {
        match self {
            KitStep::Pull => "pull",
            KitStep::Generate => "generate",
            KitStep::Migrate => "migrate",
            KitStep::Check => "check",
        }
    }
}

impl fmt::Display for KitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subcommand())
    }
}

/// The migration toolchain the engine drives, one step at a time.
pub trait MigrationKit: Send + Sync + 'static {
    fn run(
        &self,
        step: KitStep,
        config: &Path,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;
}

/// Runs `<command> <step> --config=<path>` as a child process.
#[derive(Debug, Clone)]
pub struct DrizzleKit {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    stderr: StderrPolicy,
}

impl DrizzleKit {
    pub fn new(config: &KitConfig) -> Result<Self, EngineError> {
        let (program, args) = config
            .command
            .split_first()
            .ok_or_else(|| EngineError::Unknown("kit command is empty".into()))?;
        Ok(DrizzleKit {
            program: program.clone(),
            args: args.to_vec(),
            timeout: config.timeout,
            stderr: config.stderr,
        })
    }
}

impl MigrationKit for DrizzleKit {
    async fn run(&self, step: KitStep, config: &Path) -> Result<(), EngineError> {
        let program = which::which(&self.program)
            .map_err(|e| {
                EngineError::step(step, format!("cannot locate {}: {}", self.program, e))
            })?;

        let mut cmd = Command::new(&program);
        cmd.args(&self.args)
            .arg(step.subcommand())
            .arg(format!("--config={}", config.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(program = %program.display(), %step, config = %config.display(), "running kit step");

        let child = cmd
            .spawn()
            .map_err(|e| EngineError::step(step, format!("failed to spawn: {}", e)))?;
        // Dropping the child on timeout kills it.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(|e| EngineError::step(step, e.to_string()))?,
            Err(_) => {
                return Err(EngineError::step(
                    step,
                    format!("timed out after {}s", self.timeout.as_secs()),
                ))
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            let detail = if stderr.is_empty() {
                format!("exited with {}", output.status)
            } else {
                stderr
            };
            return Err(EngineError::step(step, detail));
        }
        if !stderr.is_empty() {
            match self.stderr {
                StderrPolicy::Strict => return Err(EngineError::step(step, stderr)),
                StderrPolicy::ExitCode => warn!(%step, %stderr, "kit step wrote to stderr"),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DbCredentials {
    Url {
        url: String,
    },
    Discrete {
        host: String,
        port: u16,
        user: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        database: String,
        ssl: bool,
    },
}

impl DbCredentials {
    /// A request URL wins over the deployment's discrete settings.
    pub fn resolve(url: Option<&str>, database: &DatabaseConfig) -> Self {
        match url {
            Some(url) => DbCredentials::Url { url: url.to_string() },
            None => DbCredentials::Discrete {
                host: database.host.clone(),
                port: database.port,
                user: database.user.clone(),
                password: database.password.clone(),
                database: database.name.clone(),
                ssl: database.ssl,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationsTable {
    pub prefix: String,
    pub table: String,
}

/// The drizzle-kit configuration written as `config.json` per tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantConfig {
    pub dialect: String,
    pub schema: String,
    pub out: String,
    pub migrations: MigrationsTable,
    pub db_credentials: DbCredentials,
}

impl TenantConfig {
    pub fn new(tenant: &str, dir: &ArtifactDir, credentials: DbCredentials) -> Self {
        TenantConfig {
            dialect: "postgresql".into(),
            schema: dir.schema_path().display().to_string(),
            out: dir.migrations_dir().display().to_string(),
            migrations: MigrationsTable {
                prefix: "timestamp".into(),
                table: format!("__{}__migrations__", tenant),
            },
            db_credentials: credentials,
        }
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Unknown(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn tenant_config_shape() {
        let dir = ArtifactDir::new("drizzle", "acme");
        let config = TenantConfig::new(
            "acme",
            &dir,
            DbCredentials::resolve(Some("postgres://u@h/db"), &Config::default().database),
        );
        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["dialect"], "postgresql");
        assert_eq!(json["schema"], "drizzle/acme/schema.ts");
        assert_eq!(json["out"], "drizzle/acme/migrations");
        assert_eq!(json["migrations"]["table"], "__acme__migrations__");
        assert_eq!(json["dbCredentials"]["url"], "postgres://u@h/db");
    }

    #[test]
    fn discrete_credentials_without_url() {
        let creds = DbCredentials::resolve(None, &Config::default().database);
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(json["host"], "localhost");
        assert_eq!(json["port"], 5432);
        assert!(json.get("password").is_none());
        let back: DbCredentials = serde_json::from_value(json).unwrap();
        assert_eq!(back, creds);
    }

    #[test]
    fn empty_command_is_rejected() {
        let mut kit = Config::default().kit;
        kit.command.clear();
        assert!(DrizzleKit::new(&kit).is_err());
    }
}
