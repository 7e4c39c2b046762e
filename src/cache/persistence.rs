use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use tracing::debug;

use super::Cache;
use crate::{RccError, Result};

impl Cache {
    /// Writes a consistent snapshot of the cache to `path`.
    ///
    /// The snapshot is written to a sibling temp file first and then renamed
    /// over the target, so an interrupted write never leaves a truncated file.
    ///
    /// # Errors
    /// * `RccError::Serialization` - If the snapshot cannot be encoded
    /// * `RccError::Persistence` - If the temp file cannot be written or renamed
    pub fn store(&self, path: &Path) -> Result<()> {
        let snapshot: BTreeMap<String, String> = self.read().clone().into_iter().collect();

        let json = serde_json::to_string_pretty(&snapshot).map_err(|e| {
            RccError::Serialization {
                content_type: "cache snapshot".to_string(),
                details: e.to_string(),
            }
        })?;

        let tmp = temp_path(path);

        fs::write(&tmp, json).map_err(|e| RccError::Persistence {
            path: tmp.clone(),
            details: e.to_string(),
        })?;

        fs::rename(&tmp, path).map_err(|e| RccError::Persistence {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        debug!(path = %path.display(), entries = snapshot.len(), "Cache snapshot stored");
        Ok(())
    }

    /// Replaces the cache contents with the snapshot stored at `path`.
    ///
    /// The cache is left untouched when the file cannot be read or decoded.
    ///
    /// # Errors
    /// * `RccError::Io` - If the file is missing or unreadable
    /// * `RccError::Serialization` - If the file content is corrupt
    pub fn load(&self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path).map_err(|e| RccError::Io {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        let snapshot: HashMap<String, String> =
            serde_json::from_str(&content).map_err(|e| RccError::Serialization {
                content_type: format!("cache snapshot '{}'", path.display()),
                details: e.to_string(),
            })?;

        debug!(path = %path.display(), entries = snapshot.len(), "Cache snapshot loaded");
        self.replace(snapshot);
        Ok(())
    }
}

/// Sibling temp file: the full file name with `.tmp` appended, so dotted
/// names never collide with another snapshot.
pub(super) fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
