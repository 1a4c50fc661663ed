//! Storage module for key-value persistence
//!
//! This module provides one asynchronous key-value contract with three
//! interchangeable backend adapters:
//! - **Browser storage** - Wraps a synchronous Web Storage style API
//! - **Mobile storage** - Forwards to an injected AsyncStorage style driver
//! - **Persistent storage** - SQLite database file for server and CLI use
//!   (requires the `persistent` feature, enabled by default)
//!
//! Callers depend on [`KeyValueStorage`] only. The concrete adapter is picked
//! once, at construction time, from the runtime [`Environment`].
//!
//! # Examples
//!
//! ## Persistent Storage
//!
//! ```rust
//! use keyvaluestorage::storage::{KeyValueStorage, PersistentConfig, PersistentStorage};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = PersistentStorage::open(PersistentConfig::new(":memory:"))?;
//!
//! storage.set_item("yolo", &json!({ "name": "john doe" })).await?;
//! let item: Option<serde_json::Value> = storage.get_item("yolo").await?;
//! assert_eq!(item, Some(json!({ "name": "john doe" })));
//!
//! storage.remove_item("yolo").await?;
//! assert!(storage.get_keys().await?.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Picking a backend from the environment
//!
//! ```rust
//! use keyvaluestorage::storage::{Environment, KeyValueStorage, Storage, StorageOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = Storage::for_environment(Environment::Browser, StorageOptions::default())?;
//! storage.set_item("count", &3).await?;
//! assert_eq!(storage.get_item::<u32>("count").await?, Some(3));
//! # Ok(())
//! # }
//! ```

// Core contract and shared encoding
pub mod adapter;
pub mod codec;

// Backend adapters
pub mod browser;
pub mod mobile;

#[cfg(feature = "persistent")]
pub mod persistent;

// Re-export main types for convenience
pub use adapter::KeyValueStorage;
pub use browser::{default_web_store, BrowserStorage, MemoryWebStorage, WebStorage};

#[cfg(target_arch = "wasm32")]
pub use browser::LocalWebStorage;
pub use mobile::{AsyncStorageDriver, MemoryAsyncStorage, MobileStorage};

#[cfg(feature = "persistent")]
pub use persistent::{PersistentConfig, PersistentStorage};

pub use constants::MEMORY_DATABASE;

use crate::error::StorageResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Storage constants
pub mod constants {
    //! Constants used throughout the storage module

    /// Database name that opens a non-persistent, in-memory database
    pub const MEMORY_DATABASE: &str = ":memory:";

    /// Table used by the persistent adapter unless configured otherwise
    pub const DEFAULT_TABLE: &str = "keyvaluestorage";

    /// Default time a persistent write waits on another connection's commit
    pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
}

/// Runtime environment used to pick a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Browser, backed by Web Storage
    Browser,
    /// React Native style mobile runtime, backed by an injected driver
    Mobile,
    /// Server or CLI process, backed by a database file
    Server,
}

impl Environment {
    /// Environment of the current compilation target
    pub fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            Environment::Browser
        } else if cfg!(any(target_os = "android", target_os = "ios")) {
            Environment::Mobile
        } else {
            Environment::Server
        }
    }
}

/// Construction options for [`Storage`]
#[derive(Clone, Default)]
pub struct StorageOptions {
    /// Database settings for [`Environment::Server`]
    #[cfg(feature = "persistent")]
    pub persistent: PersistentConfig,
    /// Store for [`Environment::Browser`]; [`default_web_store`] when `None`
    pub web_store: Option<Arc<dyn WebStorage>>,
    /// Driver for [`Environment::Mobile`]; an in-memory driver when `None`
    pub async_driver: Option<Arc<dyn AsyncStorageDriver>>,
}

impl std::fmt::Debug for StorageOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("StorageOptions");
        #[cfg(feature = "persistent")]
        debug.field("persistent", &self.persistent);
        debug
            .field("web_store", &self.web_store.is_some())
            .field("async_driver", &self.async_driver.is_some())
            .finish()
    }
}

impl StorageOptions {
    /// Options for the database at `database`
    #[cfg(feature = "persistent")]
    pub fn database(database: impl Into<String>) -> Self {
        Self {
            persistent: PersistentConfig::new(database),
            ..Default::default()
        }
    }

    /// Options with an injected mobile driver
    pub fn with_async_driver(mut self, driver: Arc<dyn AsyncStorageDriver>) -> Self {
        self.async_driver = Some(driver);
        self
    }

    /// Options with an injected web store
    pub fn with_web_store(mut self, store: Arc<dyn WebStorage>) -> Self {
        self.web_store = Some(store);
        self
    }
}

/// Key-value storage chosen at construction time
#[derive(Debug)]
pub enum Storage {
    /// Web Storage backend
    Browser(BrowserStorage),
    /// Injected asynchronous driver backend
    Mobile(MobileStorage),
    /// SQLite database backend
    #[cfg(feature = "persistent")]
    Persistent(PersistentStorage),
}

impl Storage {
    /// Open storage for the detected environment
    pub fn open(options: StorageOptions) -> StorageResult<Self> {
        Self::for_environment(Environment::detect(), options)
    }

    /// Open storage for `environment`
    pub fn for_environment(environment: Environment, options: StorageOptions) -> StorageResult<Self> {
        tracing::debug!(?environment, "selecting key-value storage backend");
        match environment {
            Environment::Browser => {
                let store = options.web_store.unwrap_or_else(default_web_store);
                Ok(Storage::Browser(BrowserStorage::with_store(store)))
            }
            Environment::Mobile => {
                let driver = options.async_driver.unwrap_or_else(|| -> Arc<dyn AsyncStorageDriver> {
                    tracing::warn!("no async storage driver supplied, falling back to in-memory driver");
                    Arc::new(MemoryAsyncStorage::new())
                });
                Ok(Storage::Mobile(MobileStorage::new(driver)))
            }
            Environment::Server => {
                #[cfg(feature = "persistent")]
                {
                    PersistentStorage::open(options.persistent).map(Storage::Persistent)
                }
                #[cfg(not(feature = "persistent"))]
                {
                    Err(crate::error::StorageError::BackendUnavailable {
                        backend: "sqlite".to_string(),
                        reason: "built without the `persistent` feature".to_string(),
                    })
                }
            }
        }
    }

    /// Environment this storage was opened for
    pub fn environment(&self) -> Environment {
        match self {
            Storage::Browser(_) => Environment::Browser,
            Storage::Mobile(_) => Environment::Mobile,
            #[cfg(feature = "persistent")]
            Storage::Persistent(_) => Environment::Server,
        }
    }
}

impl KeyValueStorage for Storage {
    async fn get_item<T>(&self, key: &str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self {
            Storage::Browser(s) => s.get_item(key).await,
            Storage::Mobile(s) => s.get_item(key).await,
            #[cfg(feature = "persistent")]
            Storage::Persistent(s) => s.get_item(key).await,
        }
    }

    async fn set_item<T>(&self, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        match self {
            Storage::Browser(s) => s.set_item(key, value).await,
            Storage::Mobile(s) => s.set_item(key, value).await,
            #[cfg(feature = "persistent")]
            Storage::Persistent(s) => s.set_item(key, value).await,
        }
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        match self {
            Storage::Browser(s) => s.remove_item(key).await,
            Storage::Mobile(s) => s.remove_item(key).await,
            #[cfg(feature = "persistent")]
            Storage::Persistent(s) => s.remove_item(key).await,
        }
    }

    async fn get_keys(&self) -> StorageResult<Vec<String>> {
        match self {
            Storage::Browser(s) => s.get_keys().await,
            Storage::Mobile(s) => s.get_keys().await,
            #[cfg(feature = "persistent")]
            Storage::Persistent(s) => s.get_keys().await,
        }
    }

    async fn get_entries<T>(&self) -> StorageResult<Vec<(String, T)>>
    where
        T: DeserializeOwned + Send,
    {
        match self {
            Storage::Browser(s) => s.get_entries().await,
            Storage::Mobile(s) => s.get_entries().await,
            #[cfg(feature = "persistent")]
            Storage::Persistent(s) => s.get_entries().await,
        }
    }
}
