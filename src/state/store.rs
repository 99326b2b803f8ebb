// Model store: registry and artifact persistence behind one trait
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use super::db::{init_db, init_db_at, init_db_in_memory, DbConnection, DbError};
use super::models::{ArtifactKey, Partition, SymbolEntry};
use super::queries;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Db(DbError::Sqlite(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable key/value storage for recognizer state. Artifacts are opaque
/// bytes; the classifier owns their encoding.
pub trait ModelStore: Send + Sync {
    fn load_registry(&self, partition: Partition) -> StoreResult<Vec<SymbolEntry>>;
    fn save_registry(&self, partition: Partition, symbols: &[SymbolEntry]) -> StoreResult<()>;

    fn get_artifact(&self, key: &ArtifactKey) -> StoreResult<Option<Vec<u8>>>;
    fn put_artifact(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()>;
    /// Returns whether the artifact existed
    fn delete_artifact(&self, key: &ArtifactKey) -> StoreResult<bool>;
    fn list_artifacts(&self, partition: Partition) -> StoreResult<Vec<ArtifactKey>>;

    /// Replace the registry and every artifact of `partition` at once. On
    /// error the previous contents are left in place.
    fn replace_partition(
        &self,
        partition: Partition,
        symbols: &[SymbolEntry],
        artifacts: &[(ArtifactKey, Vec<u8>)],
    ) -> StoreResult<()>;
}

/// SQLite-backed store
#[derive(Clone)]
pub struct SqliteStore {
    db: DbConnection,
}

impl SqliteStore {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::new(init_db_at(path)?))
    }

    pub fn open_default() -> StoreResult<Self> {
        Ok(Self::new(init_db()?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::new(init_db_in_memory()?))
    }
}

impl ModelStore for SqliteStore {
    fn load_registry(&self, partition: Partition) -> StoreResult<Vec<SymbolEntry>> {
        Ok(queries::list_symbols(&self.db, partition)?)
    }

    fn save_registry(&self, partition: Partition, symbols: &[SymbolEntry]) -> StoreResult<()> {
        Ok(queries::replace_symbols(&self.db, partition, symbols)?)
    }

    fn get_artifact(&self, key: &ArtifactKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(queries::get_artifact(&self.db, key)?)
    }

    fn put_artifact(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()> {
        Ok(queries::upsert_artifact(&self.db, key, data)?)
    }

    fn delete_artifact(&self, key: &ArtifactKey) -> StoreResult<bool> {
        Ok(queries::delete_artifact(&self.db, key)?)
    }

    fn list_artifacts(&self, partition: Partition) -> StoreResult<Vec<ArtifactKey>> {
        Ok(queries::list_artifacts(&self.db, partition)?)
    }

    fn replace_partition(
        &self,
        partition: Partition,
        symbols: &[SymbolEntry],
        artifacts: &[(ArtifactKey, Vec<u8>)],
    ) -> StoreResult<()> {
        Ok(queries::replace_partition(&self.db, partition, symbols, artifacts)?)
    }
}

#[derive(Default)]
struct MemoryInner {
    registries: HashMap<Partition, Vec<SymbolEntry>>,
    artifacts: HashMap<ArtifactKey, Vec<u8>>,
}

/// Process-local store with no persistence
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ModelStore for MemoryStore {
    fn load_registry(&self, partition: Partition) -> StoreResult<Vec<SymbolEntry>> {
        Ok(self
            .lock()
            .registries
            .get(&partition)
            .cloned()
            .unwrap_or_default())
    }

    fn save_registry(&self, partition: Partition, symbols: &[SymbolEntry]) -> StoreResult<()> {
        self.lock().registries.insert(partition, symbols.to_vec());
        Ok(())
    }

    fn get_artifact(&self, key: &ArtifactKey) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.lock().artifacts.get(key).cloned())
    }

    fn put_artifact(&self, key: &ArtifactKey, data: &[u8]) -> StoreResult<()> {
        self.lock().artifacts.insert(key.clone(), data.to_vec());
        Ok(())
    }

    fn delete_artifact(&self, key: &ArtifactKey) -> StoreResult<bool> {
        Ok(self.lock().artifacts.remove(key).is_some())
    }

    fn list_artifacts(&self, partition: Partition) -> StoreResult<Vec<ArtifactKey>> {
        let mut keys: Vec<ArtifactKey> = self
            .lock()
            .artifacts
            .keys()
            .filter(|key| key.partition == partition)
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn replace_partition(
        &self,
        partition: Partition,
        symbols: &[SymbolEntry],
        artifacts: &[(ArtifactKey, Vec<u8>)],
    ) -> StoreResult<()> {
        let mut inner = self.lock();
        inner.artifacts.retain(|key, _| key.partition != partition);
        for (key, data) in artifacts {
            inner.artifacts.insert(key.clone(), data.clone());
        }
        inner.registries.insert(partition, symbols.to_vec());
        Ok(())
    }
}
