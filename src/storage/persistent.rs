//! Persistent storage adapter backed by SQLite
//!
//! Every handle owns its own connection. Handles opened against the same file
//! see each other's writes once SQLite commits them; concurrent writers to the
//! same key are ordered by SQLite alone (last commit wins).
//!
//! The special database name [`MEMORY_DATABASE`] opens a private in-memory
//! database that disappears with its handle.

use crate::error::{StorageError, StorageResult};
use crate::storage::adapter::KeyValueStorage;
use crate::storage::codec;
use crate::storage::constants::{DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_TABLE, MEMORY_DATABASE};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Persistent storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentConfig {
    /// Database file path, or `":memory:"`
    pub database: String,
    /// Table holding the entries
    pub table: String,
    /// How long a write waits for another connection's commit
    pub busy_timeout: Duration,
}

impl Default for PersistentConfig {
    fn default() -> Self {
        Self {
            database: MEMORY_DATABASE.to_string(),
            table: DEFAULT_TABLE.to_string(),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }
}

impl PersistentConfig {
    /// Configuration for the database at `database` with default settings
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..Default::default()
        }
    }

    /// Whether this configuration opens an in-memory database
    pub fn is_memory(&self) -> bool {
        self.database == MEMORY_DATABASE
    }
}

/// Key-value storage backed by an SQLite database
///
/// File databases run in WAL mode with `synchronous = FULL`, so a completed
/// `set_item` or `remove_item` survives power loss.
///
/// SQLite calls, including waits on `busy_timeout`, run inline on the thread
/// polling the future. Under a contended file this blocks that executor
/// thread for up to the configured timeout.
pub struct PersistentStorage {
    conn: Mutex<Connection>,
    config: PersistentConfig,
    queries: Queries,
}

/// SQL text for the configured table
#[derive(Debug)]
struct Queries {
    get: String,
    set: String,
    remove: String,
    keys: String,
    entries: String,
}

impl Queries {
    fn new(table: &str) -> Self {
        Self {
            get: format!("SELECT value FROM \"{table}\" WHERE key = ?1"),
            set: format!(
                "INSERT INTO \"{table}\" (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value"
            ),
            remove: format!("DELETE FROM \"{table}\" WHERE key = ?1"),
            keys: format!("SELECT key FROM \"{table}\" ORDER BY key"),
            entries: format!("SELECT key, value FROM \"{table}\" ORDER BY key"),
        }
    }
}

impl std::fmt::Debug for PersistentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStorage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PersistentStorage {
    /// Open (creating if needed) the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::BackendUnavailable`] if the table name is
    /// invalid or the database cannot be opened or initialized.
    pub fn open(config: PersistentConfig) -> StorageResult<Self> {
        validate_table(&config.table)?;

        let conn = if config.is_memory() {
            Connection::open_in_memory().map_err(|e| unavailable(&config, e))?
        } else {
            ensure_parent_dir(&config)?;
            open_connection(Path::new(&config.database)).map_err(|e| unavailable(&config, e))?
        };

        configure_connection(&conn, &config).map_err(|e| unavailable(&config, e))?;
        ensure_schema(&conn, &config.table).map_err(|e| unavailable(&config, e))?;

        tracing::debug!(database = %config.database, table = %config.table, "opened persistent storage");

        let queries = Queries::new(&config.table);
        Ok(Self {
            conn: Mutex::new(conn),
            config,
            queries,
        })
    }

    /// Open the database at `database` with default settings
    pub fn open_path(database: impl Into<String>) -> StorageResult<Self> {
        Self::open(PersistentConfig::new(database))
    }

    /// Configuration this handle was opened with
    pub fn config(&self) -> &PersistentConfig {
        &self.config
    }

    fn connection(&self, operation: &str) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::BackendUnavailable {
            backend: self.config.database.clone(),
            reason: format!("connection poisoned during {}", operation),
        })
    }

    fn read_raw(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.connection("get_item")?;
        conn.query_row(&self.queries.get, params![key], |row| row.get(0))
            .optional()
            .map_err(|e| StorageError::operation("get_item", e))
    }

    fn read_entries(&self) -> StorageResult<Vec<(String, String)>> {
        let conn = self.connection("get_entries")?;
        let mut stmt = conn
            .prepare_cached(&self.queries.entries)
            .map_err(|e| StorageError::operation("get_entries", e))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| StorageError::operation("get_entries", e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StorageError::operation("get_entries", e))
    }
}

impl KeyValueStorage for PersistentStorage {
    async fn get_item<T>(&self, key: &str) -> StorageResult<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        tracing::trace!(key, database = %self.config.database, "persistent get_item");
        match self.read_raw(key)? {
            Some(text) => codec::decode(key, &text).map(Some),
            None => Ok(None),
        }
    }

    async fn set_item<T>(&self, key: &str, value: &T) -> StorageResult<()>
    where
        T: Serialize + Sync + ?Sized,
    {
        tracing::trace!(key, database = %self.config.database, "persistent set_item");
        let text = codec::encode(key, value)?;
        let conn = self.connection("set_item")?;
        conn.execute(&self.queries.set, params![key, text])
            .map_err(|e| StorageError::operation("set_item", e))?;
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> StorageResult<()> {
        tracing::trace!(key, database = %self.config.database, "persistent remove_item");
        let conn = self.connection("remove_item")?;
        conn.execute(&self.queries.remove, params![key])
            .map_err(|e| StorageError::operation("remove_item", e))?;
        Ok(())
    }

    async fn get_keys(&self) -> StorageResult<Vec<String>> {
        let conn = self.connection("get_keys")?;
        let mut stmt = conn
            .prepare_cached(&self.queries.keys)
            .map_err(|e| StorageError::operation("get_keys", e))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| StorageError::operation("get_keys", e))?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(|e| StorageError::operation("get_keys", e))
    }

    async fn get_entries<T>(&self) -> StorageResult<Vec<(String, T)>>
    where
        T: DeserializeOwned + Send,
    {
        self.read_entries()?
            .into_iter()
            .map(|(key, text)| {
                let value = codec::decode(&key, &text)?;
                Ok((key, value))
            })
            .collect()
    }
}

fn unavailable(config: &PersistentConfig, reason: impl std::fmt::Display) -> StorageError {
    StorageError::BackendUnavailable {
        backend: config.database.clone(),
        reason: reason.to_string(),
    }
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
fn validate_table(table: &str) -> StorageResult<()> {
    let valid = !table.is_empty()
        && !table.starts_with(|c: char| c.is_ascii_digit())
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::BackendUnavailable {
            backend: "sqlite".to_string(),
            reason: format!("invalid table name: {:?}", table),
        })
    }
}

fn ensure_parent_dir(config: &PersistentConfig) -> StorageResult<()> {
    if let Some(parent) = Path::new(&config.database).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| unavailable(config, e))?;
        }
    }
    Ok(())
}

fn open_connection(path: &Path) -> rusqlite::Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    Connection::open_with_flags(path, flags)
}

fn configure_connection(conn: &Connection, config: &PersistentConfig) -> rusqlite::Result<()> {
    // set before anything else so the WAL switch can wait on other handles
    conn.busy_timeout(config.busy_timeout)?;
    if !config.is_memory() {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;",
        )?;
    }
    Ok(())
}

fn ensure_schema(conn: &Connection, table: &str) -> rusqlite::Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{table}\" (
            key   TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        );"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn db_path(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn test_file_database_uses_wal_with_full_sync() {
        let dir = TempDir::new().unwrap();
        let storage = PersistentStorage::open_path(db_path(&dir, "durable.db")).unwrap();
        let conn = storage.connection("test").unwrap();

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        let synchronous: i64 = conn.query_row("PRAGMA synchronous", [], |row| row.get(0)).unwrap();

        assert_eq!(journal_mode, "wal");
        // 2 = FULL
        assert_eq!(synchronous, 2);
    }

    #[tokio::test]
    async fn test_memory_database() {
        let storage = PersistentStorage::open(PersistentConfig::default()).unwrap();
        assert!(storage.config().is_memory());

        let value = json!({ "name": "john doe" });
        storage.set_item("yolo", &value).await.unwrap();
        assert_eq!(storage.get_item::<Value>("yolo").await.unwrap(), Some(value.clone()));

        let entries: Vec<(String, Value)> = storage.get_entries().await.unwrap();
        assert_eq!(entries, vec![("yolo".to_string(), value)]);
        assert_eq!(storage.get_keys().await.unwrap(), vec!["yolo".to_string()]);

        storage.remove_item("yolo").await.unwrap();
        assert!(storage.get_item::<Value>("yolo").await.unwrap().is_none());
        storage.remove_item("yolo").await.unwrap();
    }

    #[tokio::test]
    async fn test_memory_databases_are_private() {
        let a = PersistentStorage::open_path(MEMORY_DATABASE).unwrap();
        let b = PersistentStorage::open_path(MEMORY_DATABASE).unwrap();

        a.set_item("yolo", &1).await.unwrap();
        assert!(b.get_item::<i32>("yolo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_keeps_one_row() {
        let storage = PersistentStorage::open_path(MEMORY_DATABASE).unwrap();
        storage.set_item("k", &"first").await.unwrap();
        storage.set_item("k", &"second").await.unwrap();

        assert_eq!(storage.get_keys().await.unwrap().len(), 1);
        assert_eq!(storage.get_item::<String>("k").await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir, "nested/dbs/store.db");

        let storage = PersistentStorage::open_path(path.clone()).unwrap();
        storage.set_item("k", &true).await.unwrap();
        assert!(Path::new(&path).exists());
    }

    #[tokio::test]
    async fn test_custom_table() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir, "tables.db");
        let first = PersistentStorage::open(PersistentConfig {
            table: "first".to_string(),
            ..PersistentConfig::new(path.clone())
        })
        .unwrap();
        let second = PersistentStorage::open(PersistentConfig {
            table: "second".to_string(),
            ..PersistentConfig::new(path)
        })
        .unwrap();

        first.set_item("k", &1).await.unwrap();
        assert!(second.get_item::<i32>("k").await.unwrap().is_none());
    }

    #[test]
    fn test_invalid_table_rejected() {
        let err = PersistentStorage::open(PersistentConfig {
            table: "drop table; --".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable { .. }));

        assert!(validate_table("keyvaluestorage").is_ok());
        assert!(validate_table("1abc").is_err());
        assert!(validate_table("").is_err());
    }

    #[test]
    fn test_unopenable_path_fails_at_construction() {
        let dir = TempDir::new().unwrap();
        // a directory cannot be opened as a database file
        let err = PersistentStorage::open_path(dir.path().to_string_lossy().into_owned()).unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_value_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let path = db_path(&dir, "corrupt.db");
        let storage = PersistentStorage::open_path(path.clone()).unwrap();

        let raw = Connection::open(&path).unwrap();
        raw.execute(
            "INSERT INTO keyvaluestorage (key, value) VALUES ('broken', '{nope')",
            [],
        )
        .unwrap();

        let err = storage.get_item::<Value>("broken").await.unwrap_err();
        assert!(err.is_decode());
        assert!(storage.get_entries::<Value>().await.unwrap_err().is_decode());
        // the key is still listed
        assert_eq!(storage.get_keys().await.unwrap(), vec!["broken".to_string()]);
    }
}
