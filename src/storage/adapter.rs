//! Storage adapter trait shared by every backend

use crate::error::StorageResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;

/// Asynchronous key-value contract implemented by the browser, mobile and
/// persistent adapters.
///
/// Values are any JSON-compatible type. A missing key resolves to `Ok(None)`;
/// errors are reserved for unreadable data and failing backends.
pub trait KeyValueStorage: Send + Sync {
    /// Get the value stored under `key`, decoded into `T`
    fn get_item<T>(&self, key: &str) -> impl Future<Output = StorageResult<Option<T>>> + Send
    where
        T: DeserializeOwned + Send;

    /// Store `value` under `key`, replacing any previous value
    fn set_item<T>(&self, key: &str, value: &T) -> impl Future<Output = StorageResult<()>> + Send
    where
        T: Serialize + Sync + ?Sized;

    /// Delete `key`; succeeds when the key is already absent
    fn remove_item(&self, key: &str) -> impl Future<Output = StorageResult<()>> + Send;

    /// List every stored key
    fn get_keys(&self) -> impl Future<Output = StorageResult<Vec<String>>> + Send;

    /// List every stored pair, decoded into `T`
    fn get_entries<T>(&self) -> impl Future<Output = StorageResult<Vec<(String, T)>>> + Send
    where
        T: DeserializeOwned + Send;
}

impl<S: KeyValueStorage> KeyValueStorage for Arc<S> {
    fn get_item<T>(&self, key: &str) -> impl Future<Output = StorageResult<Option<T>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        (**self).get_item(key)
    }

    fn set_item<T>(&self, key: &str, value: &T) -> impl Future<Output = StorageResult<()>> + Send
    where
        T: Serialize + Sync + ?Sized,
    {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> impl Future<Output = StorageResult<()>> + Send {
        (**self).remove_item(key)
    }

    fn get_keys(&self) -> impl Future<Output = StorageResult<Vec<String>>> + Send {
        (**self).get_keys()
    }

    fn get_entries<T>(&self) -> impl Future<Output = StorageResult<Vec<(String, T)>>> + Send
    where
        T: DeserializeOwned + Send,
    {
        (**self).get_entries()
    }
}
