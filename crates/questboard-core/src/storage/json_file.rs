//! Pretty-printed JSON documents on disk with `.bak` siblings.
//!
//! A document at `data/quests.json` keeps its backups next to it as
//! `data/quests.json.20250410_0400.bak`.

use std::path::{Path, PathBuf};

use super::DocumentStore;
use crate::error::StorageError;

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    fn backup_path(&self, stamp: &str) -> PathBuf {
        self.dir().join(format!("{}.{stamp}.bak", self.file_name()))
    }

    fn read(path: &Path) -> Result<String, StorageError> {
        std::fs::read_to_string(path).map_err(|source| StorageError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DocumentStore for JsonFileStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::ReadFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Write to a temp sibling, then rename over the document.
    fn save(&self, body: &str) -> Result<(), StorageError> {
        let write_failed = |source| StorageError::WriteFailed {
            path: self.path.clone(),
            source,
        };
        std::fs::create_dir_all(self.dir()).map_err(write_failed)?;
        let tmp = self.dir().join(format!(".{}.tmp", self.file_name()));
        std::fs::write(&tmp, body).map_err(write_failed)?;
        std::fs::rename(&tmp, &self.path).map_err(write_failed)?;
        Ok(())
    }

    fn backup(&self, stamp: &str) -> Result<bool, StorageError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let target = self.backup_path(stamp);
        std::fs::copy(&self.path, &target).map_err(|source| StorageError::WriteFailed {
            path: target,
            source,
        })?;
        Ok(true)
    }

    fn backup_stamps(&self) -> Result<Vec<String>, StorageError> {
        let prefix = format!("{}.", self.file_name());
        let entries = match std::fs::read_dir(self.dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StorageError::ReadFailed {
                    path: self.dir().to_path_buf(),
                    source,
                })
            }
        };

        let mut stamps: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_suffix(".bak"))
                    .map(str::to_string)
            })
            .collect();
        stamps.sort_unstable_by(|a, b| b.cmp(a));
        Ok(stamps)
    }

    fn load_backup(&self, stamp: &str) -> Result<String, StorageError> {
        Self::read(&self.backup_path(stamp))
    }

    fn remove_backup(&self, stamp: &str) -> Result<(), StorageError> {
        let path = self.backup_path(stamp);
        std::fs::remove_file(&path).map_err(|source| StorageError::WriteFailed { path, source })
    }
}
