//! Filesystem capability consumed by the batch orchestrator and the API.
//!
//! Every path handed to a [`FilesystemPort`] is a client path: it is cleaned
//! as a rooted path and resolved below the configured base directory, so
//! `..` segments can never reach outside it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::io::AsyncRead;

use crate::error::{Error, Result};
use crate::types::{FileEntry, FileType};
use crate::utils::{clean_path, resolve_below};

/// Readable upload body handed to [`FilesystemPort::save`]
pub type UploadReader = Box<dyn AsyncRead + Send + Unpin>;

/// Single-path filesystem operations.
///
/// Implementations report a missing source as [`Error::NotFound`], a
/// directory passed to `copy`/`move_file` as [`Error::NotRegularFile`] and
/// everything else as [`Error::Io`].
#[async_trait]
pub trait FilesystemPort: Send + Sync {
    /// List the entries of a directory
    async fn list(&self, root: &Path) -> Result<Vec<FileEntry>>;

    /// Create one directory (its parent must exist)
    async fn create_dir(&self, path: &Path) -> Result<()>;

    /// Copy a regular file, returning the number of bytes written
    async fn copy(&self, src: &Path, dst: &Path) -> Result<u64>;

    /// Move a regular file, returning its size
    async fn move_file(&self, src: &Path, dst: &Path) -> Result<u64>;

    /// Delete a file, or a directory with everything below it
    async fn delete(&self, path: &Path) -> Result<()>;

    /// Store `reader` as `dest_dir/name`, returning the number of bytes written
    async fn save(&self, reader: UploadReader, name: &str, dest_dir: &Path) -> Result<u64>;

    /// Absolute location of a client path
    fn resolve(&self, relative: &Path) -> PathBuf;
}

/// [`FilesystemPort`] backed by the local disk, rooted at a base directory
#[derive(Clone, Debug)]
pub struct LocalFilesystem {
    base: PathBuf,
}

impl LocalFilesystem {
    /// Create a filesystem rooted at `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Root directory
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Stat `src` and require a regular file
    async fn regular_file_len(&self, src: &Path, abs: &Path) -> Result<u64> {
        let metadata = tokio::fs::metadata(abs)
            .await
            .map_err(|e| Error::from_io(e, client_path(src)))?;
        if !metadata.is_file() {
            return Err(Error::NotRegularFile {
                path: client_path(src),
            });
        }
        Ok(metadata.len())
    }
}

#[async_trait]
impl FilesystemPort for LocalFilesystem {
    async fn list(&self, root: &Path) -> Result<Vec<FileEntry>> {
        let abs = self.resolve(root);
        let mut dir = tokio::fs::read_dir(&abs)
            .await
            .map_err(|e| Error::from_io(e, client_path(root)))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    // Entry vanished between read_dir and stat
                    tracing::debug!(path = ?entry.path(), error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            let updated_at = to_utc(metadata.modified().ok());
            let created_at = metadata
                .created()
                .ok()
                .map(|t| to_utc(Some(t)))
                .unwrap_or(updated_at);

            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: metadata.len(),
                file_type: if metadata.is_dir() {
                    FileType::Dir
                } else {
                    FileType::File
                },
                created_at,
                updated_at,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        let abs = self.resolve(path);
        tokio::fs::create_dir(&abs).await?;
        tracing::debug!(path = ?client_path(path), "Created directory");
        Ok(())
    }

    async fn copy(&self, src: &Path, dst: &Path) -> Result<u64> {
        let abs_src = self.resolve(src);
        let abs_dst = self.resolve(dst);
        self.regular_file_len(src, &abs_src).await?;
        if same_file(&abs_src, &abs_dst).await {
            return Err(Error::InvalidRequest(format!(
                "cannot copy '{}' onto itself",
                client_path(src).display()
            )));
        }

        let mut source = tokio::fs::File::open(&abs_src)
            .await
            .map_err(|e| Error::from_io(e, client_path(src)))?;
        let mut destination = tokio::fs::File::create(&abs_dst).await?;
        let written = tokio::io::copy(&mut source, &mut destination).await?;
        destination.sync_all().await?;

        Ok(written)
    }

    async fn move_file(&self, src: &Path, dst: &Path) -> Result<u64> {
        let abs_src = self.resolve(src);
        let abs_dst = self.resolve(dst);
        let size = self.regular_file_len(src, &abs_src).await?;

        match tokio::fs::rename(&abs_src, &abs_dst).await {
            Ok(()) => Ok(size),
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                // Different mount points: copy, then drop the source
                tokio::fs::copy(&abs_src, &abs_dst).await?;
                tokio::fs::remove_file(&abs_src).await?;
                Ok(size)
            }
            Err(e) => Err(Error::from_io(e, client_path(src))),
        }
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        let abs = self.resolve(path);
        if abs == self.base {
            return Err(Error::InvalidRequest(
                "refusing to delete the base directory".to_string(),
            ));
        }

        let metadata = tokio::fs::symlink_metadata(&abs)
            .await
            .map_err(|e| Error::from_io(e, client_path(path)))?;
        if metadata.is_dir() {
            tokio::fs::remove_dir_all(&abs).await?;
        } else {
            tokio::fs::remove_file(&abs).await?;
        }
        Ok(())
    }

    async fn save(&self, mut reader: UploadReader, name: &str, dest_dir: &Path) -> Result<u64> {
        let abs = self.resolve(dest_dir).join(name);
        let mut out = tokio::fs::File::create(&abs).await?;
        let written = tokio::io::copy(&mut reader, &mut out).await?;
        out.sync_all().await?;
        Ok(written)
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        resolve_below(&self.base, relative)
    }
}

/// Cleaned client path used in error values, so they never expose the base
fn client_path(path: &Path) -> PathBuf {
    clean_path(&path.to_string_lossy())
}

/// Whether both paths name the same existing file, following symlinks.
/// `File::create` on the destination would truncate the source otherwise.
async fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn to_utc(time: Option<SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::<Utc>::from).unwrap_or_default()
}
