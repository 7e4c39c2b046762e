use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tracing::info;

use crate::{RccError, Result};

/// Locations of the persisted cache snapshot for one project/environment pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    dir: PathBuf,
    file: PathBuf,
}

impl CachePaths {
    /// Derives the snapshot path `<cache_dir>/.<project>_<env>`.
    pub fn new(cache_dir: impl AsRef<Path>, project: &str, env: &str) -> Self {
        let dir = cache_dir.as_ref().to_path_buf();
        let file = dir.join(format!(".{project}_{env}"));
        Self { dir, file }
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The snapshot file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Creates the cache directory if it does not exist yet.
    ///
    /// # Errors
    /// * `RccError::InvalidConfig` - If the path exists but is not a directory
    /// * `RccError::Persistence` - If the directory cannot be created or inspected
    pub fn ensure_dir(&self) -> Result<()> {
        match fs::metadata(&self.dir) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(RccError::invalid_config(
                "cache_dir",
                format!("'{}' is not a directory", self.dir.display()),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("Creating cache directory: {}", self.dir.display());
                fs::create_dir_all(&self.dir).map_err(|e| RccError::Persistence {
                    path: self.dir.clone(),
                    details: format!("Failed to create cache directory: {e}"),
                })
            }
            Err(e) => Err(RccError::Persistence {
                path: self.dir.clone(),
                details: e.to_string(),
            }),
        }
    }
}
