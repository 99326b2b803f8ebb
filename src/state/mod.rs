// State management module
// Handles model persistence, the symbol registry storage and archives

pub mod archive;
pub mod db;
pub mod models;
pub mod queries;
pub mod storage;
pub mod store;

pub use archive::{export_partition, import_partition, ArchiveError, ArchiveSummary};
pub use db::{init_db, init_db_at, DbConnection, DbError};
pub use models::{ArtifactKey, ArtifactKind, Partition, SymbolEntry};
pub use storage::{get_app_data_dir, get_config_dir, StorageError};
pub use store::{MemoryStore, ModelStore, SqliteStore, StoreError, StoreResult};
