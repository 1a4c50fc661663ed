//! Shared helpers for the integration tests

#![allow(dead_code)]

use keyvaluestorage::prelude::*;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Value used across the storage tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
}

impl Profile {
    pub fn john_doe() -> Self {
        Self {
            name: "john doe".to_string(),
            owner: None,
        }
    }

    pub fn owned_by(owner: &str) -> Self {
        Self {
            owner: Some(owner.to_string()),
            ..Self::john_doe()
        }
    }
}

/// Higher-level consumer holding a shared storage handle
pub struct ProfileStore<S> {
    storage: Arc<S>,
}

impl<S: KeyValueStorage> ProfileStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    pub async fn set<T: Serialize + Sync>(&self, key: &str, value: &T) -> StorageResult<()> {
        self.storage.set_item(key, value).await
    }

    pub async fn get<T: DeserializeOwned + Send>(&self, key: &str) -> StorageResult<Option<T>> {
        self.storage.get_item(key).await
    }
}

/// Path for a database file inside `dir`
pub fn db_path(dir: &tempfile::TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}
