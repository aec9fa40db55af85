pub mod archive;
pub mod artifacts;
pub mod codegen;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod ir;
pub mod kit;
pub mod validate;

pub use codegen::generate_drizzle;
pub use config::Config;
pub use engine::{Engine, GeneratedArtifacts};
pub use error::EngineError;
pub use ir::SchemaInput;
pub use validate::{validate_schema, Issue};

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Read a schema definition from disk. `.toml` files are parsed as TOML,
/// everything else as JSON.
pub fn read_schema_value(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file {}", path.display()))?;
    let is_toml = path.extension().is_some_and(|ext| ext == "toml");
    if is_toml {
        let value: toml::Value = toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(serde_json::to_value(value)?)
    } else {
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Issues as printable lines, e.g. `tables.0.name: Required`.
pub fn lint_schema(value: &Value) -> Vec<String> {
    match validate_schema(value) {
        Ok(_) => Vec::new(),
        Err(issues) => issues.iter().map(ToString::to_string).collect(),
    }
}

/// Load and validate a schema file.
pub fn load_schema_file(path: &Path) -> Result<SchemaInput> {
    let value = read_schema_value(path)?;
    validate_schema(&value).map_err(|issues| {
        let lines: Vec<String> = issues.iter().map(ToString::to_string).collect();
        anyhow!(
            "{} is not a valid schema:\n  {}",
            path.display(),
            lines.join("\n  ")
        )
    })
}
