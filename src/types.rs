//! Core types for filebrowser

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a task
///
/// Only the [`TaskRegistry`](crate::registry::TaskRegistry) hands these out, so two
/// tasks describing the same source and destination are still distinguishable.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a fresh random TaskId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    pub fn get(&self) -> Uuid {
        self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Kind of single-item operation a task tracks
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Copy a file to a destination folder
    Copy,
    /// Move (rename) a file to a destination folder
    Move,
    /// Delete a file or folder
    Delete,
    /// Store an uploaded stream in a folder
    Upload,
}

impl TaskKind {
    /// Verb used in task names ("Copy", "Move", ...)
    pub fn verb(&self) -> &'static str {
        match self {
            TaskKind::Copy => "Copy",
            TaskKind::Move => "Move",
            TaskKind::Delete => "Delete",
            TaskKind::Upload => "Upload",
        }
    }
}

/// Task status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TaskStatus {
    /// Operation dispatched and not yet finished
    #[serde(rename = "progress")]
    InProgress,
    /// Operation finished (successfully or not)
    #[serde(rename = "ended")]
    Ended,
}

/// Point-in-time view of a task, as sent to clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    /// Task identity
    pub id: TaskId,
    /// Operation kind
    pub kind: TaskKind,
    /// Human-readable description, e.g. "Copy /a.txt to /b/a.txt"
    pub name: String,
    /// Current status
    pub status: TaskStatus,
    /// When the operation was dispatched
    pub started_at: DateTime<Utc>,
    /// When the operation finished (None while in progress)
    pub ended_at: Option<DateTime<Utc>>,
    /// Failure message, if the operation failed
    pub error: Option<String>,
}

impl TaskInfo {
    /// Whether the task ended with an error
    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Ended && self.error.is_some()
    }
}

/// Entry type in a directory listing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// Regular file (or anything that is not a directory)
    File,
    /// Directory
    Dir,
}

/// One row of a directory listing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// File name (no directory part)
    pub name: String,
    /// Size in bytes as reported by the filesystem
    pub size: u64,
    /// File or directory
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// Creation time (falls back to modification time where unsupported)
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl FileEntry {
    /// Whether this entry is a directory
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Dir
    }
}
