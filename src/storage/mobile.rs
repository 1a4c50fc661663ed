//! Mobile storage adapter
//!
//! Thin pass-through over an injected asynchronous key-value driver with the
//! React Native AsyncStorage shape. The driver is supplied by the caller, so
//! tests and headless builds can swap in [`MemoryAsyncStorage`].

use crate::error::StorageResult;
use crate::storage::adapter::KeyValueStorage;
use crate::storage::codec;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Asynchronous key-value driver supplied by the host platform
#[async_trait]
pub trait AsyncStorageDriver: Send + Sync {
    /// Raw text stored under `key`
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store raw text under `key`
    async fn set_item(&self, key: &str, value: String) -> StorageResult<()>;

    /// Delete `key` if present
    async fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Every stored key
    async fn get_all_keys(&self) -> StorageResult<Vec<String>>;

    /// Raw text for each of `keys`, `None` where a key has no value
    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<(String, Option<String>)>> {
        let mut pairs = Vec::with_capacity(keys.len());
        for key in keys {
            pairs.push((key.clone(), self.get_item(key).await?));
        }
        Ok(pairs)
    }
}

/// In-process [`AsyncStorageDriver`]
#[derive(Debug, Default, Clone)]
pub struct MemoryAsyncStorage {
    data: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryAsyncStorage {
    /// Create an empty driver
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AsyncStorageDriver for MemoryAsyncStorage {
    async fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> StorageResult<()> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.data.read().await.keys().cloned().collect())
    }

    async fn multi_get(&self, keys: &[String]) -> StorageResult<Vec<(String, Option<String>)>> {
        let data = self.data.read().await;
        Ok(keys
            .iter()
            .map(|key| (key.clone(), data.get(key).cloned()))
            .collect())
    }
}

/// Key-value storage backed by an injected [`AsyncStorageDriver`]
#[derive(Clone)]
pub struct MobileStorage {
    driver: Arc<dyn AsyncStorageDriver>,
}

impl std::fmt::Debug for MobileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MobileStorage").finish_non_exhaustive()
    }
}

impl MobileStorage {
    /// Create a mobile adapter forwarding to `driver`
    pub fn new(driver: Arc<dyn AsyncStorageDriver>) -> Self {
        Self { driver }
    }

    /// The injected driver
    pub fn driver(&self) -> &Arc<dyn AsyncStorageDriver> {
        &self.driver
    }
}

impl KeyValueStorage for MobileStorage {
    async fn get_item<T>(&self, key: &str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        tracing::trace!(key, "mobile get_item");
        match self.driver.get_item(key).await? {
            Some(text) => codec::decode(key, &text).map(Some),
            None => Ok(None),
        }
    }

    async fn set_item<T>(&self, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        tracing::trace!(key, "mobile set_item");
        let text = codec::encode(key, value)?;
        self.driver.set_item(key, text).await
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        tracing::trace!(key, "mobile remove_item");
        self.driver.remove_item(key).await
    }

    async fn get_keys(&self) -> StorageResult<Vec<String>> {
        self.driver.get_all_keys().await
    }

    async fn get_entries<T>(&self) -> StorageResult<Vec<(String, T)>>
    where
        T: DeserializeOwned + Send,
    {
        let keys = self.driver.get_all_keys().await?;
        let pairs = self.driver.multi_get(&keys).await?;
        let mut entries = Vec::with_capacity(pairs.len());
        for pair in pairs {
            if let Some(entry) = codec::parse_entry(pair)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
