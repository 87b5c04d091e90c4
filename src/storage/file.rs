use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::{Storage, poisoned};
use crate::error::MwanamamaError;

/// Storage persisted as a single JSON object on disk.
///
/// Every mutation rewrites the whole document through a sibling temp file
/// and a rename, so readers never observe a half-written file. Writers in
/// other processes are not coordinated with; the last rename wins.
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage document at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MwanamamaError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    MwanamamaError::Storage(format!("parse {}: {e}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened file storage");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), MwanamamaError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get_raw(&self, key: &str) -> Result<Option<String>, MwanamamaError> {
        Ok(self.entries.lock().map_err(poisoned)?.get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), MwanamamaError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<Option<String>, MwanamamaError> {
        let mut entries = self.entries.lock().map_err(poisoned)?;
        let previous = entries.remove(key);
        if previous.is_some() {
            self.flush(&entries)?;
        }
        Ok(previous)
    }
}
