//! Snapshot persistence
//!
//! The whole forest lives in one JSON file that is rewritten in full after every
//! mutation. Reads never fail: a missing or corrupt file degrades to an empty forest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{self, Snapshot, Task};

/// File name of the snapshot, both in the data directory and next to the executable
pub const SNAPSHOT_FILE: &str = "tasks.json";

const EMPTY_SNAPSHOT: &str = r#"{"tasks": []}"#;

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid snapshot: {0}")]
    Invalid(String),
}

impl StoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when the snapshot file simply does not exist yet
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Resolves the snapshot location inside `data_dir`, bootstrapping it on first run.
///
/// Creates `data_dir` if needed. When the snapshot file is absent it is seeded from
/// `template` (copied byte-for-byte) if that file exists, otherwise with an empty forest.
/// Once the file exists this call has no side effects.
pub fn resolve_storage_path(
    data_dir: &Path,
    template: Option<&Path>,
) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(data_dir).map_err(|e| StoreError::io(data_dir, e))?;

    let path = data_dir.join(SNAPSHOT_FILE);
    if path.exists() {
        return Ok(path);
    }

    match template.filter(|t| t.is_file()) {
        Some(template) => {
            info!(template = %template.display(), path = %path.display(), "seeding snapshot from template");
            fs::copy(template, &path).map_err(|e| StoreError::io(&path, e))?;
        }
        None => {
            info!(path = %path.display(), "seeding empty snapshot");
            fs::write(&path, EMPTY_SNAPSHOT).map_err(|e| StoreError::io(&path, e))?;
        }
    }

    Ok(path)
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    tasks: &'a [Task],
}

/// Reads and writes the forest snapshot at a single path
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the forest, surfacing every failure
    pub fn try_load(&self) -> Result<Vec<Task>, StoreError> {
        let text = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;
        models::validate(&snapshot.tasks).map_err(StoreError::Invalid)?;
        Ok(snapshot.tasks)
    }

    /// Loads the forest, degrading to an empty one if the file is missing or corrupt.
    /// The old file is left as is.
    pub fn load(&self) -> Vec<Task> {
        match self.try_load() {
            Ok(tasks) => {
                debug!(path = %self.path.display(), nodes = models::count(&tasks), "loaded snapshot");
                tasks
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                Vec::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring unreadable snapshot, starting empty");
                Vec::new()
            }
        }
    }

    /// Overwrites the snapshot with the full forest.
    ///
    /// The text goes to a sibling temp file first and is renamed over the target,
    /// so readers never see a half-written snapshot.
    pub fn save(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(&SnapshotRef { tasks })?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| StoreError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&self.path, e));
        }

        debug!(path = %self.path.display(), nodes = models::count(tasks), "saved snapshot");
        Ok(())
    }
}
