//! Durable storage of the last-known routing-table snapshot.
//!
//! The file is plain UTF-8 text, one route line per line. Writes go to a
//! temporary file in the target directory which is fsynced and then renamed
//! over the live file, so readers only ever see a complete snapshot.

use routewatch_common::PersistenceError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::types::RouteSnapshot;

/// Result of reading the store at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSnapshot {
    /// The stored snapshot, empty when absent or unreadable.
    pub snapshot: RouteSnapshot,
    /// True when the file existed and was read without error.
    pub clean: bool,
}

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store for `path`. Nothing is touched on disk until used.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the persisted snapshot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the persisted snapshot; empty when absent or unreadable.
    pub fn load(&self) -> RouteSnapshot {
        self.load_state().snapshot
    }

    /// Loads the persisted snapshot and reports whether it was usable.
    pub fn load_state(&self) -> LoadedSnapshot {
        match fs::read(&self.path) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    let snapshot = RouteSnapshot::from_text(&text);
                    tracing::debug!(
                        path = %self.path.display(),
                        routes = snapshot.len(),
                        "Loaded previous snapshot"
                    );
                    LoadedSnapshot {
                        snapshot,
                        clean: true,
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "Snapshot file is not valid UTF-8, starting from empty"
                    );
                    LoadedSnapshot {
                        snapshot: RouteSnapshot::empty(),
                        clean: false,
                    }
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No previous snapshot found");
                LoadedSnapshot {
                    snapshot: RouteSnapshot::empty(),
                    clean: false,
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Cannot read snapshot file, starting from empty"
                );
                LoadedSnapshot {
                    snapshot: RouteSnapshot::empty(),
                    clean: false,
                }
            }
        }
    }

    /// Atomically replaces the persisted snapshot.
    pub fn save(&self, snapshot: &RouteSnapshot) -> Result<(), PersistenceError> {
        let err = |e: io::Error| PersistenceError::new(&self.path, e);

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(err)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(err)?;
        tmp.write_all(snapshot.to_text().as_bytes()).map_err(err)?;
        tmp.as_file().sync_all().map_err(err)?;
        tmp.persist(&self.path).map_err(|e| err(e.error))?;

        // Makes the rename itself durable; not supported everywhere.
        if let Err(e) = File::open(&dir).and_then(|d| d.sync_all()) {
            tracing::debug!(dir = %dir.display(), error = %e, "Directory fsync skipped");
        }

        tracing::debug!(
            path = %self.path.display(),
            routes = snapshot.len(),
            "Snapshot saved"
        );
        Ok(())
    }
}
