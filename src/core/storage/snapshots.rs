//! Append-only snapshot store (snapshots/<id>.json) and change ledgers (changes/<id>.json).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::core::models::{Change, Snapshot};

use super::atomic::{TMP_SUFFIX, write_atomic};
use super::StorageError;

const SNAPSHOTS_DIR: &str = "snapshots";
const CHANGES_DIR: &str = "changes";

pub struct SnapshotStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl SnapshotStore {
    /// Store rooted at `root`. Directories are created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOTS_DIR)
    }

    fn changes_dir(&self) -> PathBuf {
        self.root.join(CHANGES_DIR)
    }

    fn snapshot_path(&self, id: Uuid) -> PathBuf {
        self.snapshots_dir().join(format!("{}.json", id))
    }

    fn changes_path(&self, current_id: Uuid) -> PathBuf {
        self.changes_dir().join(format!("{}.json", current_id))
    }

    /// Persist a snapshot. Snapshots are never overwritten.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.snapshot_path(snapshot.snapshot_id());
        if path.exists() {
            return Err(StorageError::AlreadyExists(snapshot.snapshot_id()));
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        write_atomic(&path, &json).map_err(|e| StorageError::io(&path, e))?;
        log::debug!(
            "Saved snapshot {} ({})",
            snapshot.snapshot_id(),
            snapshot.overall_status().as_str()
        );
        Ok(())
    }

    /// Load one snapshot by id.
    pub fn load(&self, id: Uuid) -> Result<Snapshot, StorageError> {
        let path = self.snapshot_path(id);
        match fs::read(&path) {
            Ok(data) => parse_snapshot(&path, &data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(StorageError::SnapshotNotFound(id)),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// All snapshots, oldest first. In-flight temp files are ignored; any other
    /// unparseable `*.json` entry fails the listing with [`StorageError::Corrupted`].
    pub fn list(&self) -> Result<Vec<Snapshot>, StorageError> {
        let dir = self.snapshots_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StorageError::io(&dir, e)),
        };

        let mut snapshots = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&dir, e))?;
            let path = entry.path();
            if !is_snapshot_file(&path) {
                continue;
            }
            let data = match fs::read(&path) {
                Ok(d) => d,
                // Pruned between read_dir and read.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(&path, e)),
            };
            snapshots.push(parse_snapshot(&path, &data)?);
        }
        sort_oldest_first(&mut snapshots);
        Ok(snapshots)
    }

    /// Snapshot with the greatest `created_at`, or `None` when nothing was ever saved.
    /// A corrupted store is an error, never an empty one.
    pub fn load_latest(&self) -> Result<Option<Snapshot>, StorageError> {
        Ok(self.list()?.pop())
    }

    /// Delete snapshots older than `retention`, always keeping the newest one.
    /// Returns how many snapshots were removed.
    pub fn prune(&self, retention: Duration) -> Result<usize, StorageError> {
        self.prune_at(retention, Utc::now())
    }

    pub(crate) fn prune_at(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let cutoff = now - retention;
        let mut snapshots = self.list()?;
        // Newest is never a candidate.
        snapshots.pop();

        let mut removed = 0;
        for snapshot in snapshots.iter().filter(|s| s.created_at() < cutoff) {
            let path = self.snapshot_path(snapshot.snapshot_id());
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::io(&path, e)),
            }
            let ledger = self.changes_path(snapshot.snapshot_id());
            if let Err(e) = fs::remove_file(&ledger)
                && e.kind() != io::ErrorKind::NotFound
            {
                log::warn!("Failed to remove change ledger {}: {}", ledger.display(), e);
            }
        }
        if removed > 0 {
            log::info!("Pruned {} snapshot(s) older than {}", removed, cutoff);
        }
        Ok(removed)
    }

    /// Persist the ledger produced when `current_id` was diffed against its predecessor.
    pub fn save_changes(&self, current_id: Uuid, changes: &[Change]) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.changes_path(current_id);
        if path.exists() {
            return Err(StorageError::AlreadyExists(current_id));
        }
        let json = serde_json::to_vec_pretty(changes)?;
        write_atomic(&path, &json).map_err(|e| StorageError::io(&path, e))
    }

    /// Ledger recorded for `current_id`, or `None` if that snapshot was never diffed.
    pub fn load_changes(&self, current_id: Uuid) -> Result<Option<Vec<Change>>, StorageError> {
        let path = self.changes_path(current_id);
        let data = match fs::read(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|e| StorageError::Corrupted {
                path,
                reason: e.to_string(),
            })
    }
}

fn is_snapshot_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    !name.starts_with('.') && !name.ends_with(TMP_SUFFIX) && name.ends_with(".json")
}

fn parse_snapshot(path: &Path, data: &[u8]) -> Result<Snapshot, StorageError> {
    serde_json::from_slice(data).map_err(|e| StorageError::Corrupted {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn sort_oldest_first(snapshots: &mut [Snapshot]) {
    snapshots.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.snapshot_id().cmp(&b.snapshot_id()))
    });
}
