// Partition archive import/export
//
// An archive is a standalone JSON file holding one partition's registry and
// every artifact, guarded by a SHA256 checksum of the serialized payload.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::models::{ArtifactKind, Partition, SymbolEntry};
use super::storage::{calculate_sha256, read_file, store_file, StorageError};
use super::store::{ModelStore, StoreError};
use super::ArtifactKey;

pub const ARCHIVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid artifact encoding: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Unsupported archive version {0}")]
    UnsupportedVersion(u32),
    #[error("Archive holds partition {found}, expected {expected}")]
    PartitionMismatch {
        expected: Partition,
        found: Partition,
    },
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedArtifact {
    pub symbol: Option<String>,
    pub kind: ArtifactKind,
    /// Hex-encoded artifact bytes
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivePayload {
    pub format_version: u32,
    pub partition: Partition,
    pub exported_at: DateTime<Utc>,
    pub symbols: Vec<SymbolEntry>,
    pub artifacts: Vec<ArchivedArtifact>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ArchiveFile {
    sha256: String,
    payload: ArchivePayload,
}

/// Summary of what an export or import moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub partition: Partition,
    pub symbols: usize,
    pub artifacts: usize,
}

fn payload_checksum(payload: &ArchivePayload) -> ArchiveResult<String> {
    Ok(calculate_sha256(&serde_json::to_vec(payload)?))
}

/// Write the registry and artifacts of `partition` to `path`
pub fn export_partition(
    store: &dyn ModelStore,
    partition: Partition,
    path: &Path,
) -> ArchiveResult<ArchiveSummary> {
    let symbols = store.load_registry(partition)?;

    let mut artifacts = Vec::new();
    for key in store.list_artifacts(partition)? {
        let Some(data) = store.get_artifact(&key)? else {
            continue;
        };
        artifacts.push(ArchivedArtifact {
            symbol: key.symbol,
            kind: key.kind,
            data: hex::encode(data),
        });
    }

    let payload = ArchivePayload {
        format_version: ARCHIVE_FORMAT_VERSION,
        partition,
        exported_at: Utc::now(),
        symbols,
        artifacts,
    };

    let summary = ArchiveSummary {
        partition,
        symbols: payload.symbols.len(),
        artifacts: payload.artifacts.len(),
    };

    let file = ArchiveFile {
        sha256: payload_checksum(&payload)?,
        payload,
    };
    store_file(path, &serde_json::to_vec_pretty(&file)?)?;

    log::info!(
        "Exported {} symbols and {} artifacts of {} to {}",
        summary.symbols,
        summary.artifacts,
        partition,
        path.display()
    );
    Ok(summary)
}

/// Read and verify an archive without touching any store
pub fn read_archive(path: &Path) -> ArchiveResult<ArchivePayload> {
    let bytes = read_file(path)?;
    let file: ArchiveFile = serde_json::from_slice(&bytes)?;

    if file.payload.format_version != ARCHIVE_FORMAT_VERSION {
        return Err(ArchiveError::UnsupportedVersion(file.payload.format_version));
    }

    let actual = payload_checksum(&file.payload)?;
    if actual != file.sha256 {
        return Err(ArchiveError::ChecksumMismatch {
            expected: file.sha256,
            actual,
        });
    }

    Ok(file.payload)
}

/// Replace `partition` in the store with the contents of an archive.
/// `partition` defaults to the one recorded in the archive.
pub fn import_partition(
    store: &dyn ModelStore,
    path: &Path,
    partition: Option<Partition>,
) -> ArchiveResult<ArchiveSummary> {
    let payload = read_archive(path)?;
    if let Some(expected) = partition {
        if expected != payload.partition {
            return Err(ArchiveError::PartitionMismatch {
                expected,
                found: payload.partition,
            });
        }
    }
    let partition = payload.partition;

    // Decode everything before the store is modified
    let mut decoded = Vec::with_capacity(payload.artifacts.len());
    for artifact in &payload.artifacts {
        let key = ArtifactKey {
            partition,
            symbol: artifact.symbol.clone(),
            kind: artifact.kind,
        };
        decoded.push((key, hex::decode(&artifact.data)?));
    }

    store.replace_partition(partition, &payload.symbols, &decoded)?;

    log::info!(
        "Imported {} symbols and {} artifacts into {} from {}",
        payload.symbols.len(),
        decoded.len(),
        partition,
        path.display()
    );

    Ok(ArchiveSummary {
        partition,
        symbols: payload.symbols.len(),
        artifacts: decoded.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::store::MemoryStore;
    use tempfile::TempDir;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .save_registry(Partition::UserDefined, &[SymbolEntry::new("circle")])
            .unwrap();
        store
            .put_artifact(
                &ArtifactKey::symbol(Partition::UserDefined, "circle", ArtifactKind::Tolerance),
                b"0.5",
            )
            .unwrap();
        store
            .put_artifact(&ArtifactKey::joint(Partition::UserDefined), b"{\"k\":5}")
            .unwrap();
        store
    }

    #[test]
    fn test_export_then_import_into_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("user.glyphs.json");

        let summary = export_partition(&seeded_store(), Partition::UserDefined, &path).unwrap();
        assert_eq!(summary.symbols, 1);
        assert_eq!(summary.artifacts, 2);

        let target = MemoryStore::new();
        let stale = ArtifactKey::symbol(Partition::UserDefined, "old", ArtifactKind::TrainingSet);
        target.put_artifact(&stale, b"[]").unwrap();

        import_partition(&target, &path, None).unwrap();

        assert!(target.get_artifact(&stale).unwrap().is_none());
        assert_eq!(
            target
                .get_artifact(&ArtifactKey::joint(Partition::UserDefined))
                .unwrap()
                .unwrap(),
            b"{\"k\":5}"
        );
        assert_eq!(target.load_registry(Partition::UserDefined).unwrap()[0].name, "circle");
    }

    #[test]
    fn test_tampered_archive_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("user.glyphs.json");
        export_partition(&seeded_store(), Partition::UserDefined, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::write(&path, text.replace("circle", "square")).unwrap();

        let target = MemoryStore::new();
        let err = import_partition(&target, &path, None).unwrap_err();
        assert!(matches!(err, ArchiveError::ChecksumMismatch { .. }));
        assert!(target.load_registry(Partition::UserDefined).unwrap().is_empty());
    }

    #[test]
    fn test_import_rejects_other_partition() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("user.glyphs.json");
        export_partition(&seeded_store(), Partition::UserDefined, &path).unwrap();

        let err = import_partition(&MemoryStore::new(), &path, Some(Partition::Hardcoded32))
            .unwrap_err();
        assert!(matches!(err, ArchiveError::PartitionMismatch { .. }));
    }
}
