#![allow(dead_code)]

use schema_engine::kit::{KitStep, MigrationKit};
use schema_engine::{validate_schema, Config, EngineError, SchemaInput};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted stand-in for drizzle-kit.
#[derive(Clone, Default)]
pub struct FakeKit {
    pub calls: Arc<Mutex<Vec<KitStep>>>,
    /// Fail this step as drizzle-kit would when it writes to stderr.
    pub fail_on: Option<KitStep>,
    /// Migration file written by the `generate` step, along with a journal
    /// entry pointing at it.
    pub emit: Option<String>,
    pub delay: Option<Duration>,
    pub active: Arc<AtomicUsize>,
    pub peak: Arc<AtomicUsize>,
}

impl FakeKit {
    pub fn emitting(name: &str) -> Self {
        FakeKit {
            emit: Some(name.to_string()),
            ..FakeKit::default()
        }
    }

    pub fn steps(&self) -> Vec<KitStep> {
        self.calls.lock().unwrap().clone()
    }
}

impl MigrationKit for FakeKit {
    async fn run(&self, step: KitStep, config: &Path) -> Result<(), EngineError> {
        self.calls.lock().unwrap().push(step);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if step == KitStep::Generate {
            if let Some(name) = &self.emit {
                let dir = config.parent().unwrap().join("migrations");
                std::fs::create_dir_all(&dir).unwrap();
                std::fs::write(dir.join(name), "CREATE TABLE \"users\" ();\n").unwrap();
                std::fs::create_dir_all(dir.join("meta")).unwrap();
                let journal = format!("{{\"entries\":[\"{}\"]}}", name);
                std::fs::write(dir.join("meta/_journal.json"), journal).unwrap();
            }
        }
        if self.fail_on == Some(step) {
            return Err(EngineError::step(step, "Error: connection refused"));
        }
        Ok(())
    }
}

pub fn config_in(root: &Path) -> Config {
    Config {
        artifact_root: root.to_path_buf(),
        ..Config::default()
    }
}

pub fn fixture(name: &str) -> PathBuf {
    Path::new("tests/fixtures").join(name)
}

pub fn fixture_value(name: &str) -> serde_json::Value {
    schema_engine::read_schema_value(&fixture(name)).unwrap()
}

pub fn fixture_schema(name: &str) -> SchemaInput {
    validate_schema(&fixture_value(name)).unwrap()
}
