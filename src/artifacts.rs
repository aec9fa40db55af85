use crate::error::EngineError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

pub const CONFIG_FILE: &str = "config.json";
pub const SCHEMA_FILE: &str = "schema.ts";
pub const MIGRATIONS_DIR: &str = "migrations";
/// drizzle-kit keeps its journal and snapshots here.
pub const META_DIR: &str = "meta";

/// A tenant's artifact directory, `<root>/<tenant>`.
#[derive(Debug, Clone)]
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    pub fn new(root: impl AsRef<Path>, tenant: &str) -> Self {
        ArtifactDir {
            dir: root.as_ref().join(tenant),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    pub fn schema_path(&self) -> PathBuf {
        self.dir.join(SCHEMA_FILE)
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.dir.join(MIGRATIONS_DIR)
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.migrations_dir().join(META_DIR)
    }

    /// Write `contents` to `<dir>/<name>`, creating the directory if needed.
    pub async fn write(&self, name: &str, contents: &str) -> Result<PathBuf, EngineError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| EngineError::fs(&self.dir, e))?;
        let path = self.dir.join(name);
        fs::write(&path, contents)
            .await
            .map_err(|e| EngineError::fs(&path, e))?;
        Ok(path)
    }

    pub async fn exists(path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    /// `*.sql` file names in the migrations directory, sorted. A missing
    /// directory yields an empty list.
    pub async fn list_migrations(&self) -> Result<Vec<String>, EngineError> {
        let mut names = Self::list_files(&self.migrations_dir()).await?;
        names.retain(|name| name.ends_with(".sql"));
        Ok(names)
    }

    /// Names of the regular files directly under `dir`, sorted.
    pub async fn list_files(dir: &Path) -> Result<Vec<String>, EngineError> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(EngineError::fs(dir, e)),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| EngineError::fs(dir, e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| EngineError::fs(entry.path(), e))?
                .is_file();
            if let (true, Some(name)) = (is_file, entry.file_name().to_str()) {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Newest migration by file name; drizzle-kit prefixes them with a timestamp.
    pub async fn latest_migration(&self) -> Result<Option<String>, EngineError> {
        Ok(self.list_migrations().await?.pop())
    }

    pub async fn read(path: &Path) -> Result<Vec<u8>, EngineError> {
        fs::read(path).await.map_err(|e| EngineError::fs(path, e))
    }

    /// Like `read`, but a missing file is `None`.
    pub async fn read_if_exists(path: &Path) -> Result<Option<Vec<u8>>, EngineError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(EngineError::fs(path, e)),
        }
    }

    /// Write raw bytes to `path`, creating parent directories.
    pub async fn write_bytes(path: &Path, contents: &[u8]) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::fs(parent, e))?;
        }
        fs::write(path, contents)
            .await
            .map_err(|e| EngineError::fs(path, e))
    }

    /// Remove one file; a file that is already gone is not an error.
    pub async fn remove_file(path: &Path) -> Result<(), EngineError> {
        match fs::remove_file(path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(EngineError::fs(path, e)),
            _ => Ok(()),
        }
    }

    pub async fn remove_all(&self) -> Result<(), EngineError> {
        match fs::remove_dir_all(&self.dir).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(EngineError::fs(&self.dir, e)),
            _ => Ok(()),
        }
    }
}
