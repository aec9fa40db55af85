use crate::archive::{Archive, ArchivedMigration};
use crate::artifacts::{ArtifactDir, CONFIG_FILE, SCHEMA_FILE};
use crate::codegen::generate_drizzle;
use crate::config::{Config, DatabaseConfig};
use crate::error::EngineError;
use crate::ir::SchemaInput;
use crate::kit::{DbCredentials, KitStep, MigrationKit, TenantConfig};
use crate::validate::{validate_database_url, validate_tenant_id};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, info_span, warn, Instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFiles {
    pub config: PathBuf,
    pub schema: PathBuf,
    pub migrations: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedArtifacts {
    pub files: GeneratedFiles,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_migration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchivedMigration>,
}

/// One mutex per tenant; different tenants never wait on each other.
#[derive(Debug, Default)]
struct TenantLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TenantLocks {
    async fn acquire(&self, tenant: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(tenant.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// The tenant directory as it was before a generation cycle. Rollback
/// removes what the cycle created and restores what it overwrote.
struct Snapshot {
    dir_existed: bool,
    config: Option<Vec<u8>>,
    schema: Option<Vec<u8>>,
    migrations: BTreeSet<String>,
    meta: BTreeMap<String, Vec<u8>>,
}

impl Snapshot {
    async fn take(dir: &ArtifactDir) -> Result<Self, EngineError> {
        let meta_dir = dir.meta_dir();
        let mut meta = BTreeMap::new();
        for name in ArtifactDir::list_files(&meta_dir).await? {
            let bytes = ArtifactDir::read(&meta_dir.join(&name)).await?;
            meta.insert(name, bytes);
        }
        Ok(Snapshot {
            dir_existed: ArtifactDir::exists(dir.path()).await,
            config: ArtifactDir::read_if_exists(&dir.config_path()).await?,
            schema: ArtifactDir::read_if_exists(&dir.schema_path()).await?,
            migrations: dir.list_migrations().await?.into_iter().collect(),
            meta,
        })
    }

    async fn rollback(&self, dir: &ArtifactDir) -> Result<(), EngineError> {
        if !self.dir_existed {
            return dir.remove_all().await;
        }
        restore(&dir.config_path(), self.config.as_deref()).await?;
        restore(&dir.schema_path(), self.schema.as_deref()).await?;
        for name in dir.list_migrations().await? {
            if !self.migrations.contains(&name) {
                ArtifactDir::remove_file(&dir.migrations_dir().join(name)).await?;
            }
        }
        let meta_dir = dir.meta_dir();
        for name in ArtifactDir::list_files(&meta_dir).await? {
            if !self.meta.contains_key(&name) {
                ArtifactDir::remove_file(&meta_dir.join(name)).await?;
            }
        }
        for (name, bytes) in &self.meta {
            ArtifactDir::write_bytes(&meta_dir.join(name), bytes).await?;
        }
        Ok(())
    }
}

async fn restore(path: &Path, previous: Option<&[u8]>) -> Result<(), EngineError> {
    match previous {
        Some(bytes) => ArtifactDir::write_bytes(path, bytes).await,
        None => ArtifactDir::remove_file(path).await,
    }
}

/// Drives drizzle-kit for each tenant. Successful artifacts stay on disk so
/// that `migrate` and `check` can reuse the tenant's config.
pub struct Engine<K> {
    root: PathBuf,
    database: DatabaseConfig,
    kit: K,
    archive: Option<Archive>,
    locks: TenantLocks,
}

impl<K: MigrationKit> Engine<K> {
    pub fn new(config: &Config, kit: K, archive: Option<Archive>) -> Self {
        Engine {
            root: config.artifact_root.clone(),
            database: config.database.clone(),
            kit,
            archive,
            locks: TenantLocks::default(),
        }
    }

    pub fn artifact_dir(&self, tenant: &str) -> ArtifactDir {
        ArtifactDir::new(&self.root, tenant)
    }

    pub fn archive_enabled(&self) -> bool {
        self.archive.is_some()
    }

    /// Write config, pull, render the schema and generate SQL. Any failure
    /// puts the tenant directory back the way it was.
    pub async fn generate(
        &self,
        tenant: &str,
        schema: &SchemaInput,
        database_url: Option<&str>,
    ) -> Result<GeneratedArtifacts, EngineError> {
        check_inputs(tenant, database_url)?;
        let _guard = self.locks.acquire(tenant).await;
        self.generate_locked(tenant, schema, database_url)
            .instrument(info_span!("generate", tenant))
            .await
    }

    /// Apply pending migrations generated by an earlier `generate`.
    pub async fn migrate(&self, tenant: &str) -> Result<(), EngineError> {
        validate_tenant_id(tenant)?;
        let _guard = self.locks.acquire(tenant).await;
        self.run_existing(tenant, KitStep::Migrate)
            .instrument(info_span!("migrate", tenant))
            .await
    }

    pub async fn check(&self, tenant: &str) -> Result<(), EngineError> {
        validate_tenant_id(tenant)?;
        let _guard = self.locks.acquire(tenant).await;
        self.run_existing(tenant, KitStep::Check)
            .instrument(info_span!("check", tenant))
            .await
    }

    /// `generate` followed by `migrate` without releasing the tenant lock.
    pub async fn sync(
        &self,
        tenant: &str,
        schema: &SchemaInput,
        database_url: Option<&str>,
    ) -> Result<GeneratedArtifacts, EngineError> {
        check_inputs(tenant, database_url)?;
        let _guard = self.locks.acquire(tenant).await;
        async {
            let artifacts = self.generate_locked(tenant, schema, database_url).await?;
            self.run_existing(tenant, KitStep::Migrate).await?;
            Ok(artifacts)
        }
        .instrument(info_span!("sync", tenant))
        .await
    }

    async fn generate_locked(
        &self,
        tenant: &str,
        schema: &SchemaInput,
        database_url: Option<&str>,
    ) -> Result<GeneratedArtifacts, EngineError> {
        let dir = self.artifact_dir(tenant);
        let snapshot = Snapshot::take(&dir).await?;
        match self.run_cycle(tenant, &dir, schema, database_url).await {
            Ok(artifacts) => Ok(artifacts),
            Err(err) => {
                warn!(error = %err, "generation failed, rolling back artifacts");
                if let Err(cleanup) = snapshot.rollback(&dir).await {
                    warn!(error = %cleanup, "rollback incomplete");
                }
                Err(err)
            }
        }
    }

    async fn run_cycle(
        &self,
        tenant: &str,
        dir: &ArtifactDir,
        schema: &SchemaInput,
        database_url: Option<&str>,
    ) -> Result<GeneratedArtifacts, EngineError> {
        let credentials = DbCredentials::resolve(database_url, &self.database);
        let config = TenantConfig::new(tenant, dir, credentials);
        let config_path = dir.write(CONFIG_FILE, &config.to_json()?).await?;
        info!(path = %config_path.display(), "wrote config");

        self.kit.run(KitStep::Pull, &config_path).await?;
        info!("pulled baseline");

        let schema_path = dir.write(SCHEMA_FILE, &generate_drizzle(schema)).await?;
        info!(path = %schema_path.display(), tables = schema.table_count(), "rendered schema");

        self.kit.run(KitStep::Generate, &config_path).await?;
        let latest_migration = dir.latest_migration().await?;
        info!(latest = ?latest_migration, "generated migrations");

        let archive = match &self.archive {
            Some(archive) => {
                let name = latest_migration.clone().ok_or_else(|| {
                    EngineError::step(KitStep::Generate, "no migration file was generated")
                })?;
                let bytes = ArtifactDir::read(&dir.migrations_dir().join(&name)).await?;
                Some(archive.upload(tenant, &name, bytes).await?)
            }
            None => None,
        };

        Ok(GeneratedArtifacts {
            files: GeneratedFiles {
                config: config_path,
                schema: schema_path,
                migrations: dir.migrations_dir(),
            },
            latest_migration,
            archive,
        })
    }

    async fn run_existing(&self, tenant: &str, step: KitStep) -> Result<(), EngineError> {
        let config_path = self.artifact_dir(tenant).config_path();
        if !ArtifactDir::exists(&config_path).await {
            return Err(EngineError::NotFound(format!(
                "No configuration found for tenant {}. Please generate schema first.",
                tenant
            )));
        }
        self.kit.run(step, &config_path).await?;
        info!(%step, "kit step finished");
        Ok(())
    }
}

fn check_inputs(tenant: &str, database_url: Option<&str>) -> Result<(), EngineError> {
    let mut issues = validate_tenant_id(tenant).err().unwrap_or_default();
    if let Some(url) = database_url {
        issues.extend(validate_database_url(url).err().unwrap_or_default());
    }
    if issues.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(issues))
    }
}
