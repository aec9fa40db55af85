use crate::config::StorageConfig;
use crate::error::EngineError;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::info;

/// Where an uploaded migration ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchivedMigration {
    pub bucket: String,
    pub key: String,
    pub checksum: String,
}

/// Object storage for generated migration files.
#[derive(Debug, Clone)]
pub struct Archive {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl Archive {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Archive {
            store,
            bucket: bucket.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self, EngineError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);
        if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder
                .with_access_key_id(key)
                .with_secret_access_key(secret);
        }
        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(true)
                .with_virtual_hosted_style_request(false);
        }
        let store = builder.build()?;
        Ok(Archive::new(Arc::new(store), config.bucket.clone()))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn key(tenant: &str, file_name: &str) -> String {
        format!("tmp/{}/{}", tenant, file_name)
    }

    pub async fn upload(
        &self,
        tenant: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ArchivedMigration, EngineError> {
        let key = Self::key(tenant, file_name);
        let checksum = format!("{:x}", Sha256::digest(&bytes));
        let size = bytes.len();
        self.store
            .put(&ObjectPath::from(key.as_str()), PutPayload::from(bytes))
            .await?;
        info!(bucket = %self.bucket, %key, size, "archived migration");
        Ok(ArchivedMigration {
            bucket: self.bucket.clone(),
            key,
            checksum,
        })
    }
}
