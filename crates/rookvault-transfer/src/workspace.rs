//! Local working area, laid out as `{root}/{tag}/{pool}/{image}`.

use rookvault_core::AppError;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory shared by every image of one tag and pool.
    pub fn dir(&self, tag: &str, pool: &str) -> PathBuf {
        self.root.join(tag).join(pool)
    }

    pub fn file(&self, tag: &str, pool: &str, image: &str) -> PathBuf {
        self.dir(tag, pool).join(image)
    }

    /// Create the directory for `tag`/`pool`. An existing directory is fine.
    pub async fn ensure_dir(&self, tag: &str, pool: &str) -> Result<PathBuf, AppError> {
        let dir = self.dir(tag, pool);
        match tokio::fs::create_dir_all(&dir).await {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(dir),
            Err(e) => Err(AppError::Workspace {
                path: dir.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Remove a transferred file. Returns whether a file was removed.
    pub async fn remove_file(&self, path: &Path) -> Result<bool, AppError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Workspace {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}
