//! Local filesystem primitives
//!
//! Provides async file I/O with atomic writes to prevent partial/corrupt files,
//! plus the directory walk used for listing.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use store_core::{Error, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};
use uuid::Uuid;
use walkdir::WalkDir;

/// Local filesystem transport
///
/// Operates on caller-supplied paths with support for:
/// - Atomic writes (write to .tmp, then rename)
/// - Automatic directory creation
/// - Recursive file listing in native walk order
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }

    /// Generate a unique temporary file path next to `path`
    fn temp_path(path: &Path) -> PathBuf {
        let temp_name = format!(
            ".{}.{}.tmp",
            path.file_name().unwrap_or_default().to_string_lossy(),
            Uuid::new_v4()
        );
        path.with_file_name(temp_name)
    }

    #[instrument(skip(self), fields(backend = "local"))]
    pub async fn read(&self, path: &Path) -> Result<Bytes> {
        debug!(?path, "Reading file");

        match fs::read(path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::StoragePathNotFound {
                path: path.display().to_string(),
            }),
            Err(e) => Err(Error::Storage {
                message: format!("Failed to read {}: {}", path.display(), e),
            }),
        }
    }

    #[instrument(skip(self, data), fields(backend = "local", size = data.len()))]
    pub async fn write(&self, path: &Path, data: Bytes) -> Result<u64> {
        let temp_path = Self::temp_path(path);
        let size = data.len() as u64;

        debug!(?path, ?temp_path, size, "Writing file atomically");

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to create temp file {:?}: {}", temp_path, e),
            })?;

        file.write_all(&data).await.map_err(|e| Error::Storage {
            message: format!("Failed to write data: {}", e),
        })?;

        file.sync_all().await.map_err(|e| Error::Storage {
            message: format!("Failed to sync file: {}", e),
        })?;

        fs::rename(&temp_path, path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("Failed to rename {:?} to {:?}: {}", temp_path, path, e),
            })?;

        debug!(?path, size, "File written successfully");
        Ok(size)
    }

    /// Create `path` and all missing parents; succeeds if it already exists
    pub async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(|e| Error::Storage {
            message: format!("Failed to create directory {:?}: {}", path, e),
        })
    }

    #[instrument(skip(self), fields(backend = "local"))]
    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).await.is_ok()
    }

    #[instrument(skip(self), fields(backend = "local"))]
    pub async fn remove_file(&self, path: &Path) -> Result<()> {
        debug!(?path, "Deleting file");

        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::StoragePathNotFound {
                path: path.display().to_string(),
            }),
            Err(e) => Err(Error::Storage {
                message: format!("Failed to delete {}: {}", path.display(), e),
            }),
        }
    }

    #[instrument(skip(self), fields(backend = "local"))]
    pub async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        debug!(?path, "Deleting directory tree");

        match fs::remove_dir_all(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::StoragePathNotFound {
                path: path.display().to_string(),
            }),
            Err(e) => Err(Error::Storage {
                message: format!("Failed to delete {}: {}", path.display(), e),
            }),
        }
    }

    /// Recursively collect every file below `root`
    ///
    /// Returns paths relative to `root` with `/` separators, in the order the
    /// walk visits them. A missing root, or a root that is a file, yields an
    /// empty list.
    #[instrument(skip(self), fields(backend = "local"))]
    pub async fn walk(&self, root: &Path) -> Result<Vec<String>> {
        let root = root.to_path_buf();

        let files = tokio::task::spawn_blocking(move || {
            WalkDir::new(&root)
                .min_depth(1)
                .follow_links(false)
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        debug!(error = %e, "Skipping unreadable entry");
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    entry.path().strip_prefix(&root).ok().map(|relative| {
                        relative
                            .components()
                            .map(|c| c.as_os_str().to_string_lossy())
                            .collect::<Vec<_>>()
                            .join("/")
                    })
                })
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| Error::Internal {
            message: format!("Directory walk panicked: {}", e),
        })?;

        debug!(count = files.len(), "Found files");
        Ok(files)
    }
}
