//! Browser storage adapter
//!
//! Wraps a synchronous Web Storage style API (`localStorage` shape) so every
//! contract operation resolves as soon as the synchronous call returns.

use crate::error::{StorageError, StorageResult};
use crate::storage::adapter::KeyValueStorage;
use crate::storage::codec;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Synchronous key-value API with the shape of the Web Storage interface
pub trait WebStorage: Send + Sync {
    /// Raw text stored under `key`
    fn get_item(&self, key: &str) -> StorageResult<Option<String>>;

    /// Store raw text under `key`
    fn set_item(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Delete `key` if present
    fn remove_item(&self, key: &str) -> StorageResult<()>;

    /// Number of stored keys
    fn length(&self) -> StorageResult<usize>;

    /// Key at position `index`, if any
    fn key(&self, index: usize) -> StorageResult<Option<String>>;

    /// Delete every key
    fn clear(&self) -> StorageResult<()>;

    /// Every stored key, in enumeration order
    fn keys(&self) -> StorageResult<Vec<String>> {
        let length = self.length()?;
        let mut keys = Vec::with_capacity(length);
        for index in 0..length {
            if let Some(key) = self.key(index)? {
                keys.push(key);
            }
        }
        Ok(keys)
    }
}

/// In-process [`WebStorage`] used outside a browser, ordered by key
#[derive(Debug, Default)]
pub struct MemoryWebStorage {
    data: RwLock<BTreeMap<String, String>>,
}

impl MemoryWebStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned(operation: &str) -> StorageError {
    StorageError::operation(operation, "memory web storage lock poisoned")
}

impl WebStorage for MemoryWebStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.read().map_err(|_| poisoned("get_item"))?;
        Ok(data.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.write().map_err(|_| poisoned("set_item"))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        let mut data = self.data.write().map_err(|_| poisoned("remove_item"))?;
        data.remove(key);
        Ok(())
    }

    fn length(&self) -> StorageResult<usize> {
        let data = self.data.read().map_err(|_| poisoned("length"))?;
        Ok(data.len())
    }

    fn key(&self, index: usize) -> StorageResult<Option<String>> {
        let data = self.data.read().map_err(|_| poisoned("key"))?;
        Ok(data.keys().nth(index).cloned())
    }

    fn clear(&self) -> StorageResult<()> {
        let mut data = self.data.write().map_err(|_| poisoned("clear"))?;
        data.clear();
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let data = self.data.read().map_err(|_| poisoned("keys"))?;
        Ok(data.keys().cloned().collect())
    }
}

/// The page's `window.localStorage`.
///
/// `web_sys::Storage` is tied to the JS thread, so the handle lives in a
/// thread local and this type only carries the lookup.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Copy)]
pub struct LocalWebStorage {
    _private: (),
}

#[cfg(target_arch = "wasm32")]
thread_local! {
    static LOCAL_STORAGE: Option<web_sys::Storage> =
        web_sys::window().and_then(|window| window.local_storage().ok().flatten());
}

#[cfg(target_arch = "wasm32")]
impl LocalWebStorage {
    /// Attach to `window.localStorage`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BackendUnavailable`] when there is no window or
    /// the page denies storage access.
    pub fn open() -> StorageResult<Self> {
        if LOCAL_STORAGE.with(|storage| storage.is_some()) {
            Ok(Self { _private: () })
        } else {
            Err(local_storage_missing())
        }
    }

    fn with_storage<R>(
        operation: &str,
        f: impl FnOnce(&web_sys::Storage) -> Result<R, wasm_bindgen::JsValue>,
    ) -> StorageResult<R> {
        LOCAL_STORAGE.with(|storage| match storage {
            Some(storage) => f(storage).map_err(|e| StorageError::operation(operation, format!("{:?}", e))),
            None => Err(local_storage_missing()),
        })
    }
}

#[cfg(target_arch = "wasm32")]
fn local_storage_missing() -> StorageError {
    StorageError::BackendUnavailable {
        backend: "localStorage".to_string(),
        reason: "window.localStorage is not accessible".to_string(),
    }
}

#[cfg(target_arch = "wasm32")]
impl WebStorage for LocalWebStorage {
    fn get_item(&self, key: &str) -> StorageResult<Option<String>> {
        Self::with_storage("get_item", |s| s.get_item(key))
    }

    fn set_item(&self, key: &str, value: &str) -> StorageResult<()> {
        Self::with_storage("set_item", |s| s.set_item(key, value))
    }

    fn remove_item(&self, key: &str) -> StorageResult<()> {
        Self::with_storage("remove_item", |s| s.remove_item(key))
    }

    fn length(&self) -> StorageResult<usize> {
        Self::with_storage("length", |s| s.length()).map(|length| length as usize)
    }

    fn key(&self, index: usize) -> StorageResult<Option<String>> {
        let Ok(index) = u32::try_from(index) else {
            return Ok(None);
        };
        Self::with_storage("key", |s| s.key(index))
    }

    fn clear(&self) -> StorageResult<()> {
        Self::with_storage("clear", |s| s.clear())
    }
}

/// Store used when the host does not supply one.
///
/// In a browser build this is `localStorage`. Anywhere else, or when
/// `localStorage` is unavailable, values only live as long as the process.
pub fn default_web_store() -> Arc<dyn WebStorage> {
    local_web_store().unwrap_or_else(|| -> Arc<dyn WebStorage> { Arc::new(MemoryWebStorage::new()) })
}

#[cfg(target_arch = "wasm32")]
fn local_web_store() -> Option<Arc<dyn WebStorage>> {
    match LocalWebStorage::open() {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!(error = %e, "localStorage unavailable, falling back to in-memory web storage");
            None
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn local_web_store() -> Option<Arc<dyn WebStorage>> {
    tracing::warn!("no web store supplied, falling back to in-memory web storage");
    None
}

/// Key-value storage backed by a [`WebStorage`]
#[derive(Clone)]
pub struct BrowserStorage {
    store: Arc<dyn WebStorage>,
}

impl Default for BrowserStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BrowserStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrowserStorage").finish_non_exhaustive()
    }
}

impl BrowserStorage {
    /// Create a browser adapter over a fresh [`MemoryWebStorage`]
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryWebStorage::new()))
    }

    /// Create a browser adapter over `window.localStorage`
    #[cfg(target_arch = "wasm32")]
    pub fn local() -> StorageResult<Self> {
        Ok(Self::with_store(Arc::new(LocalWebStorage::open()?)))
    }

    /// Create a browser adapter over a host-supplied store
    pub fn with_store(store: Arc<dyn WebStorage>) -> Self {
        Self { store }
    }

    /// The underlying synchronous store
    pub fn store(&self) -> &Arc<dyn WebStorage> {
        &self.store
    }
}

impl KeyValueStorage for BrowserStorage {
    async fn get_item<T>(&self, key: &str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        tracing::trace!(key, "browser get_item");
        match self.store.get_item(key)? {
            Some(text) => codec::decode(key, &text).map(Some),
            None => Ok(None),
        }
    }

    async fn set_item<T>(&self, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        tracing::trace!(key, "browser set_item");
        let text = codec::encode(key, value)?;
        self.store.set_item(key, &text)
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        tracing::trace!(key, "browser remove_item");
        self.store.remove_item(key)
    }

    async fn get_keys(&self) -> StorageResult<Vec<String>> {
        self.store.keys()
    }

    async fn get_entries<T>(&self) -> StorageResult<Vec<(String, T)>>
    where
        T: DeserializeOwned + Send,
    {
        let mut entries = Vec::new();
        for key in self.store.keys()? {
            let raw = self.store.get_item(&key)?;
            if let Some(entry) = codec::parse_entry((key, raw))? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}
