//! Durable storage: snapshot history with retention, and the offline model cache.
//!
//! Every write is a temp-file-then-rename, so a crash leaves each file either
//! fully present or untouched. Writers are serialized per store instance.

mod atomic;
mod cache;
mod snapshots;

pub use cache::{Cache, CacheError, CacheManager};
pub use snapshots::SnapshotStore;

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

/// Errors from the snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(Uuid),
    #[error("Snapshot {0} is already stored")]
    AlreadyExists(Uuid),
    #[error("Stored file {} is unreadable: {reason}", .path.display())]
    Corrupted { path: PathBuf, reason: String },
    #[error("Storage I/O error at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Failed to serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
