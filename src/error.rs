use crate::kit::KitStep;
use crate::validate::Issue;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed")]
    Validation(Vec<Issue>),
    #[error("{0}")]
    NotFound(String),
    #[error("drizzle-kit {step} failed: {detail}")]
    Migration { step: KitStep, detail: String },
    #[error("file system operation failed on {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("archiving migration failed: {0}")]
    Archive(#[from] object_store::Error),
    #[error("{0}")]
    Unknown(String),
}

impl EngineError {
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub fn step(step: KitStep, detail: impl Into<String>) -> Self {
        EngineError::Migration {
            step,
            detail: detail.into(),
        }
    }

    /// Stable machine-readable code included in every error response.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "VALIDATION_ERROR",
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Migration {
                step: KitStep::Migrate,
                ..
            } => "MIGRATION_FAILED",
            EngineError::Migration { .. } => "SCHEMA_GENERATION_FAILED",
            EngineError::FileSystem { .. } => "FILE_SYSTEM_ERROR",
            EngineError::Archive(_) => "ARCHIVE_FAILED",
            EngineError::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::NotFound(_) => 404,
            _ => 500,
        }
    }

    pub fn issues(&self) -> Option<&[Issue]> {
        match self {
            EngineError::Validation(issues) => Some(issues),
            _ => None,
        }
    }
}

impl From<Vec<Issue>> for EngineError {
    fn from(issues: Vec<Issue>) -> Self {
        EngineError::Validation(issues)
    }
}
