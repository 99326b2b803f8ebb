// File system locations and checksums
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

const APP_DIR_NAME: &str = "glyphpad";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to get app data directory")]
    NoAppDataDir,
    #[error("Failed to get config directory")]
    NoConfigDir,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Get the app data directory, creating it if needed
pub fn get_app_data_dir() -> StorageResult<PathBuf> {
    let data_dir = dirs::data_dir().ok_or(StorageError::NoAppDataDir)?;
    let app_dir = data_dir.join(APP_DIR_NAME);
    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Get the config directory, creating it if needed
pub fn get_config_dir() -> StorageResult<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(StorageError::NoConfigDir)?;
    let app_dir = config_dir.join(APP_DIR_NAME);
    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Default location of the model database
pub fn default_database_path() -> StorageResult<PathBuf> {
    Ok(get_app_data_dir()?.join("glyphpad.db"))
}

/// Write a file (creating parent directories) and return its SHA256 hash
pub fn store_file(path: &Path, data: &[u8]) -> StorageResult<String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut file = fs::File::create(path)?;
    file.write_all(data)?;

    Ok(calculate_sha256(data))
}

/// Read a file from disk
pub fn read_file(path: &Path) -> StorageResult<Vec<u8>> {
    Ok(fs::read(path)?)
}

/// Calculate SHA256 hash of data
pub fn calculate_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_sha256() {
        let data = b"hello world";
        let hash = calculate_sha256(data);
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_store_and_read_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("blob.bin");

        let hash = store_file(&path, b"hello world").unwrap();
        assert_eq!(hash, calculate_sha256(b"hello world"));
        assert_eq!(read_file(&path).unwrap(), b"hello world");
    }
}
