//! Storage slot for the persisted ranges snapshot
//!
//! Provides a `CacheStore` that owns exactly one file on disk. Reads report
//! missing, unreadable and malformed files as distinct errors so the resolver
//! can decide how to fall back; writes go through a temporary file and a
//! rename so a half-written snapshot is never observable.

use std::future::Future;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use directories::ProjectDirs;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::data::CacheRecord;

/// File name used when no XDG cache directory is available
const FALLBACK_FILE_NAME: &str = ".aws-ip-ranges.cache";

/// File name inside the XDG cache directory
const CACHE_FILE_NAME: &str = "ip-ranges.json";

/// Distinguishes temporary files of concurrent writes within one process
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Errors reported by the storage slot
#[derive(Debug, Error)]
pub enum StoreError {
    /// The slot does not exist or is not a regular file
    #[error("cache file not found")]
    NotFound,

    /// The slot exists but the requested access is not permitted
    #[error("permission denied on cache file")]
    PermissionDenied,

    /// The slot holds something that is not a cache record (including nothing)
    #[error("cache file is malformed: {0}")]
    Parse(#[from] serde_json::Error),

    /// Any other filesystem failure
    #[error("cache file I/O failed: {0}")]
    Io(io::Error),
}

impl From<io::Error> for StoreError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound,
            ErrorKind::PermissionDenied => StoreError::PermissionDenied,
            _ => StoreError::Io(err),
        }
    }
}

/// Access required on the slot before using it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Access {
    pub read: bool,
    pub write: bool,
}

impl Access {
    pub const READ: Access = Access {
        read: true,
        write: false,
    };

    pub const READ_WRITE: Access = Access {
        read: true,
        write: true,
    };
}

/// Reads, writes and removes the single cache file
#[derive(Debug, Clone)]
pub struct CacheStore {
    /// Location of the cache file
    path: PathBuf,
}

impl CacheStore {
    /// Creates a CacheStore using the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/awsips/ip-ranges.json` on Linux, or the equivalent XDG
    /// path elsewhere. Returns `None` if no home directory can be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "awsips")?;
        Some(Self::with_path(project_dirs.cache_dir().join(CACHE_FILE_NAME)))
    }

    /// Creates a CacheStore for a specific file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The XDG location, or `.aws-ip-ranges.cache` in the working directory
    pub fn default_path() -> PathBuf {
        Self::new()
            .map(|store| store.path)
            .unwrap_or_else(|| PathBuf::from(FALLBACK_FILE_NAME))
    }

    /// The file this store manages
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true only if the slot is present and is a regular file
    ///
    /// Any stat failure, including permission denied, counts as absent.
    pub async fn exists(&self) -> bool {
        match fs::metadata(&self.path).await {
            Ok(metadata) => metadata.is_file(),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "cache file stat failed");
                false
            }
        }
    }

    /// Verifies the slot can be opened with the requested access
    ///
    /// Write access is probed without truncating or creating the file.
    pub async fn check_access(&self, access: Access) -> Result<(), StoreError> {
        OpenOptions::new()
            .read(access.read)
            .write(access.write)
            .open(&self.path)
            .await?;
        Ok(())
    }

    /// Reads and parses the slot
    ///
    /// An empty file is the "no cache" sentinel and fails to parse like any
    /// other malformed content.
    pub async fn read(&self) -> Result<CacheRecord, StoreError> {
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Replaces the slot with `record`
    ///
    /// The record is written and synced to a sibling temporary file, then
    /// renamed over the slot. The temporary file is removed if either step
    /// fails. The parent directory is created if missing.
    pub async fn write(&self, record: &CacheRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.temp_path();
        if let Err(err) = self.replace_from(&tmp, json.as_bytes()).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        debug!(path = %self.path.display(), entries = record.entries.len(), "cache file written");
        Ok(())
    }

    /// Removes the slot
    ///
    /// If the file cannot be removed for any reason it is truncated to an
    /// empty placeholder instead, which later reads report as malformed.
    /// Never fails outward.
    pub async fn delete(&self) {
        self.delete_with(fs::remove_file).await;
    }

    /// `delete` with the removal step supplied by the caller
    pub(crate) async fn delete_with<F, Fut>(&self, remove: F)
    where
        F: FnOnce(PathBuf) -> Fut,
        Fut: Future<Output = io::Result<()>>,
    {
        match remove(self.path.clone()).await {
            Ok(()) => debug!(path = %self.path.display(), "deleted cache file"),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "could not delete cache file");
                self.write_placeholder().await;
            }
        }
    }

    /// Truncates the slot in place to the empty "no cache" sentinel
    async fn write_placeholder(&self) {
        match fs::write(&self.path, b"").await {
            Ok(()) => debug!("wrote empty cache file instead"),
            Err(err) => debug!(error = %err, "could not write empty cache file either"),
        }
    }

    /// Writes `bytes` to `tmp`, syncs it and renames it over the slot
    async fn replace_from(&self, tmp: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(tmp, &self.path).await
    }

    /// Temporary sibling used for atomic writes
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| CACHE_FILE_NAME.to_string());
        let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.path.with_file_name(format!(
            ".{}.tmp.{}.{}",
            name,
            std::process::id(),
            sequence
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Prefix;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_store() -> (CacheStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_path(temp_dir.path().join("ranges.json"));
        (store, temp_dir)
    }

    fn sample_record() -> CacheRecord {
        let prefix: Prefix =
            serde_json::from_value(json!({ "service": "S3", "ip_prefix": "52.95.0.0/16" }))
                .unwrap();
        CacheRecord::with_timestamp(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            vec![prefix],
        )
    }

    #[tokio::test]
    async fn test_exists_false_for_missing_file() {
        let (store, _temp_dir) = create_test_store();
        assert!(!store.exists().await);
    }

    #[tokio::test]
    async fn test_exists_false_for_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_path(temp_dir.path());
        assert!(!store.exists().await, "A directory is not a cache file");
    }

    #[tokio::test]
    async fn test_write_then_read_returns_same_record() {
        let (store, _temp_dir) = create_test_store();
        let record = sample_record();

        store.write(&record).await.expect("Write should succeed");

        assert!(store.exists().await);
        let read = store.read().await.expect("Read should succeed");
        assert_eq!(read, record);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file() {
        let (store, temp_dir) = create_test_store();

        store.write(&sample_record()).await.expect("Write should succeed");

        let names: Vec<String> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["ranges.json".to_string()]);
    }

    #[tokio::test]
    async fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("nested").join("cache").join("ranges.json");
        let store = CacheStore::with_path(path.clone());

        store.write(&sample_record()).await.expect("Write should succeed");

        assert!(path.exists(), "Cache file should exist");
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_record() {
        let (store, _temp_dir) = create_test_store();
        let first = sample_record();
        let second = CacheRecord::new(Vec::new());

        store.write(&first).await.expect("First write should succeed");
        store.write(&second).await.expect("Second write should succeed");

        assert_eq!(store.read().await.expect("Should read cache"), second);
    }

    #[tokio::test]
    async fn test_write_onto_directory_fails_and_cleans_up() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let slot = temp_dir.path().join("slot");
        std::fs::create_dir(&slot).unwrap();
        std::fs::write(slot.join("keep"), b"x").unwrap();
        let store = CacheStore::with_path(slot);

        assert!(store.write(&sample_record()).await.is_err());

        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1, "Temporary file should be removed");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let (store, _temp_dir) = create_test_store();
        assert!(matches!(store.read().await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_read_empty_file_is_parse_error() {
        let (store, _temp_dir) = create_test_store();
        std::fs::write(store.path(), "").unwrap();

        assert!(matches!(store.read().await, Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_read_garbage_is_parse_error() {
        let (store, _temp_dir) = create_test_store();
        std::fs::write(store.path(), "{\"timestamp\": ").unwrap();

        assert!(matches!(store.read().await, Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_check_access_missing_file_is_not_found() {
        let (store, _temp_dir) = create_test_store();
        let result = store.check_access(Access::READ).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_check_access_does_not_truncate() {
        let (store, _temp_dir) = create_test_store();
        store.write(&sample_record()).await.unwrap();

        store
            .check_access(Access::READ_WRITE)
            .await
            .expect("Access check should pass");

        assert_eq!(store.read().await.unwrap(), sample_record());
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let (store, _temp_dir) = create_test_store();
        store.write(&sample_record()).await.unwrap();

        store.delete().await;

        assert!(!store.exists().await);
    }

    #[tokio::test]
    async fn test_delete_missing_file_leaves_empty_placeholder() {
        let (store, _temp_dir) = create_test_store();

        store.delete().await;

        assert!(store.exists().await);
        assert_eq!(std::fs::read(store.path()).unwrap().len(), 0);
        assert!(matches!(store.read().await, Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_delete_denied_leaves_empty_placeholder() {
        let (store, _temp_dir) = create_test_store();
        store.write(&sample_record()).await.unwrap();

        store
            .delete_with(|_| async { Err(io::Error::from(ErrorKind::PermissionDenied)) })
            .await;

        assert!(store.exists().await, "Slot should still be present");
        assert_eq!(std::fs::read(store.path()).unwrap().len(), 0);
        assert!(matches!(store.read().await, Err(StoreError::Parse(_))));
    }

    #[tokio::test]
    async fn test_placeholder_write_failure_is_swallowed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = CacheStore::with_path(temp_dir.path().join("missing").join("ranges.json"));

        store.delete().await;

        assert!(!store.exists().await);
    }

    #[test]
    fn test_new_creates_xdg_compliant_path() {
        if let Some(store) = CacheStore::new() {
            let path_str = store.path().to_string_lossy();
            assert!(
                path_str.contains("awsips"),
                "Cache path should contain project name"
            );
        }
        // Test passes if new() returns None (e.g., no home directory in CI)
    }

    #[test]
    fn test_io_error_classification() {
        let err: StoreError = io::Error::from(ErrorKind::NotFound).into();
        assert!(matches!(err, StoreError::NotFound));
        let err: StoreError = io::Error::from(ErrorKind::PermissionDenied).into();
        assert!(matches!(err, StoreError::PermissionDenied));
        let err: StoreError = io::Error::from(ErrorKind::Other).into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
