use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Test,
    Production,
}

impl FromStr for AppEnv {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnv::Development),
            "test" => Ok(AppEnv::Test),
            "production" => Ok(AppEnv::Production),
            other => bail!("APP_ENV must be development, test or production, got {}", other),
        }
    }
}

/// How diagnostics on drizzle-kit's stderr are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrPolicy {
    /// Any stderr output fails the step, even with a zero exit status.
    Strict,
    /// Only a non-zero exit status fails the step; stderr is logged.
    ExitCode,
}

impl FromStr for StderrPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "strict" => Ok(StderrPolicy::Strict),
            "exit-code" => Ok(StderrPolicy::ExitCode),
            other => bail!("KIT_STDERR_POLICY must be strict or exit-code, got {}", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub env: AppEnv,
    pub log_level: tracing::Level,
}

/// Discrete credentials, used when a request carries no database URL.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
    pub ssl: bool,
}

#[derive(Debug, Clone)]
pub struct KitConfig {
    /// Program followed by leading arguments, e.g. `pnpm drizzle-kit`.
    pub command: Vec<String>,
    pub timeout: Duration,
    pub stderr: StderrPolicy,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Set for localstack; plain HTTP is allowed when present.
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub artifact_root: PathBuf,
    pub database: DatabaseConfig,
    pub kit: KitConfig,
    /// `None` disables archiving of migrations.
    pub storage: Option<StorageConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                port: 3000,
                env: AppEnv::Development,
                log_level: tracing::Level::INFO,
            },
            artifact_root: PathBuf::from("drizzle"),
            database: DatabaseConfig {
                host: "localhost".into(),
                port: 5432,
                user: "postgres".into(),
                password: None,
                name: "postgres".into(),
                ssl: false,
            },
            kit: KitConfig {
                command: vec!["pnpm".into(), "drizzle-kit".into()],
                timeout: Duration::from_secs(120),
                stderr: StderrPolicy::Strict,
            },
            storage: None,
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{} must be a boolean, got {}", key, other)),
    }
}

impl Config {
    /// Loads configuration from environment variables, reading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads values through `lookup`, so
    /// callers never have to mutate the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(port) = lookup("PORT") {
            config.server.port = port.parse().with_context(|| format!("invalid PORT {}", port))?;
        }
        if let Some(env) = lookup("APP_ENV") {
            config.server.env = env.parse()?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.server.log_level = level
                .parse()
                .map_err(|_| {
                    anyhow!("LOG_LEVEL must be error, warn, info or debug, got {}", level)
                })?;
        }
        if let Some(root) = lookup("ARTIFACT_ROOT") {
            config.artifact_root = PathBuf::from(root);
        }

        if let Some(host) = lookup("DB_HOST") {
            config.database.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            config.database.port = port
                .parse()
                .with_context(|| format!("invalid DB_PORT {}", port))?;
        }
        if let Some(user) = lookup("DB_USER") {
            config.database.user = user;
        }
        config.database.password = lookup("DB_PASSWORD");
        if let Some(name) = lookup("DB_NAME") {
            config.database.name = name;
        }
        if let Some(ssl) = lookup("DB_SSL") {
            config.database.ssl = parse_bool("DB_SSL", &ssl)?;
        }

        if let Some(command) = lookup("KIT_COMMAND") {
            let parts: Vec<String> = command.split_whitespace().map(String::from).collect();
            if parts.is_empty() {
                bail!("KIT_COMMAND must not be empty");
            }
            config.kit.command = parts;
        }
        if let Some(secs) = lookup("KIT_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("invalid KIT_TIMEOUT_SECS {}", secs))?;
            config.kit.timeout = Duration::from_secs(secs);
        }
        if let Some(policy) = lookup("KIT_STDERR_POLICY") {
            config.kit.stderr = policy.parse()?;
        }

        if let Some(bucket) = lookup("S3_BUCKET_NAME").filter(|b| !b.is_empty()) {
            let localstack = match lookup("S3_LOCALSTACK") {
                Some(raw) => parse_bool("S3_LOCALSTACK", &raw)?,
                None => false,
            };
            let endpoint = localstack.then(|| {
                lookup("S3_ENDPOINT").unwrap_or_else(|| "http://localhost:4566".to_string())
            });
            config.storage = Some(StorageConfig {
                bucket,
                region: lookup("S3_REGION").unwrap_or_else(|| "us-east-1".to_string()),
                access_key_id: lookup("S3_ACCESS_KEY_ID"),
                secret_access_key: lookup("S3_SECRET_ACCESS_KEY"),
                endpoint,
            });
        }

        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.server.env == AppEnv::Production
    }
}
