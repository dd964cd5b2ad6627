//! Directory-based file access
//!
//! Implements the [`FileAccess`] collaborator over a local directory. Bytes
//! pass through unchanged; anything format-specific happens outside this
//! module. Lookups for missing paths return `None` instead of failing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{RepositoryError, RepositoryResult};
use crate::traits::{FileAccess, FileInfo, Folder};

/// File access rooted at a local directory.
pub struct DirectoryFileAccess {
    root_path: PathBuf,
}

impl DirectoryFileAccess {
    /// Create file access rooted at `root_path`. The directory must exist.
    pub fn new(root_path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let path = root_path.as_ref();
        if !path.is_dir() {
            return Err(RepositoryError::InvalidPath {
                path: path.to_path_buf(),
            });
        }

        let abs_path = path
            .absolutize()
            .map_err(|e| RepositoryError::Other(format!("Failed to absolutize path: {}", e)))?
            .to_path_buf();

        Ok(Self { root_path: abs_path })
    }

    /// Resolve an id to a path inside the root; rejects traversal outside.
    fn resolve(&self, id: &str) -> Option<PathBuf> {
        let relative = id.trim_start_matches('/');
        if relative.split('/').any(|segment| segment == "..") {
            return None;
        }
        Some(self.root_path.join(relative))
    }
}

#[async_trait]
impl FileAccess for DirectoryFileAccess {
    async fn folder(&self, path: &str) -> RepositoryResult<Option<Folder>> {
        let Some(dir) = self.resolve(path) else {
            return Ok(None);
        };
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut folder = Folder {
            path: path.trim_matches('/').to_string(),
            ..Default::default()
        };

        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.file_type().await?.is_dir() {
                folder.folders.push(name);
            } else {
                let id = if folder.path.is_empty() {
                    name
                } else {
                    format!("{}/{}", folder.path, name)
                };
                folder.files.push(id);
            }
        }
        folder.folders.sort();
        folder.files.sort();
        Ok(Some(folder))
    }

    async fn file(&self, id: &str) -> RepositoryResult<Option<FileInfo>> {
        let Some(path) = self.resolve(id) else {
            return Ok(None);
        };

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            _ => return Ok(None),
        };

        let last_modified = metadata
            .modified()
            .ok()
            .map(|time| DateTime::<Utc>::from(time).timestamp())
            .unwrap_or(0);

        Ok(Some(FileInfo {
            id: id.trim_matches('/').to_string(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            size: metadata.len(),
            last_modified,
        }))
    }

    async fn binary(&self, file: &FileInfo) -> RepositoryResult<Option<Vec<u8>>> {
        let Some(path) = self.resolve(&file.id) else {
            return Ok(None);
        };
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_file(&self, id: &str, bytes: &[u8]) -> RepositoryResult<bool> {
        let Some(path) = self.resolve(id) else {
            return Ok(false);
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        Ok(true)
    }

    async fn delete_file(&self, id: &str) -> RepositoryResult<bool> {
        let Some(path) = self.resolve(id) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
