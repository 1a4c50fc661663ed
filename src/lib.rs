//! # Key-Value Storage
//!
//! A uniform asynchronous key-value storage interface with interchangeable
//! backends for browser, mobile and server environments.
//!
//! ## Features
//!
//! - **Storage Contract**: [`storage::KeyValueStorage`], get/set/remove/list over JSON values
//! - **Browser Adapter**: wraps a synchronous Web Storage style API
//! - **Mobile Adapter**: forwards to an injected AsyncStorage style driver
//! - **Persistent Adapter**: SQLite database file shared by every handle opened on the same path
//!
//! ## Optional Features
//!
//! - `persistent`: SQLite backend (enabled by default)
//!
//! ## Example
//!
//! ```rust
//! use keyvaluestorage::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let storage = BrowserStorage::new();
//! storage.set_item("greeting", "hello").await?;
//!
//! let greeting: Option<String> = storage.get_item("greeting").await?;
//! assert_eq!(greeting.as_deref(), Some("hello"));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(clippy::all)]

// Re-export core error types
pub use error::{Error, Result};

// Core modules
pub mod error;
pub mod storage;

// Re-export commonly used types
pub mod prelude {
    //! Common types and traits for convenient importing

    pub use crate::error::{Error, Result, StorageError, StorageResult};
    pub use crate::storage::{
        AsyncStorageDriver, BrowserStorage, Environment, KeyValueStorage, MemoryAsyncStorage,
        MemoryWebStorage, MobileStorage, Storage, StorageOptions, WebStorage,
    };

    #[cfg(feature = "persistent")]
    pub use crate::storage::{PersistentConfig, PersistentStorage};
}

// Version information
/// The version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The name of this crate
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        assert!(!VERSION.is_empty());
        assert_eq!(CRATE_NAME, "keyvaluestorage");
    }
}
