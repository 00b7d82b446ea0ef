//! Shared test helpers: an observer that records task events, a scriptable
//! in-memory filesystem, and a ready-to-use `FileManager`.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fs::{FilesystemPort, UploadReader};
use crate::manager::FileManager;
use crate::registry::{TaskEvent, TaskObserver};
use crate::types::{FileEntry, FileType};

/// Observer that keeps every event it sees
#[derive(Default)]
pub(crate) struct RecordingObserver {
    events: Mutex<Vec<TaskEvent>>,
}

impl RecordingObserver {
    pub(crate) fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, predicate: impl Fn(&TaskEvent) -> bool) -> usize {
        self.events.lock().unwrap().iter().filter(|e| predicate(e)).count()
    }
}

impl TaskObserver for RecordingObserver {
    fn on_task_event(&self, event: &TaskEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// In-memory [`FilesystemPort`] with scripted failures, delays and a gate.
///
/// Every source path succeeds unless marked missing or as a directory. The
/// byte count reported for a path is the length of its file name.
#[derive(Default)]
pub(crate) struct FakeFilesystem {
    missing: HashSet<PathBuf>,
    directories: HashSet<PathBuf>,
    delays: HashMap<PathBuf, Duration>,
    gate: Option<Arc<Semaphore>>,
    running: AtomicUsize,
    peak: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeFilesystem {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_missing(mut self, path: &str) -> Self {
        self.missing.insert(PathBuf::from(path));
        self
    }

    pub(crate) fn with_directory(mut self, path: &str) -> Self {
        self.directories.insert(PathBuf::from(path));
        self
    }

    pub(crate) fn with_delay(mut self, path: &str, millis: u64) -> Self {
        self.delays
            .insert(PathBuf::from(path), Duration::from_millis(millis));
        self
    }

    /// Every operation waits for one permit of `gate` before finishing
    pub(crate) fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    async fn simulate(&self, call: String, subject: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delays.get(subject) {
            tokio::time::sleep(*delay).await;
        }

        self.running.fetch_sub(1, Ordering::SeqCst);
        if self.missing.contains(subject) {
            return Err(Error::NotFound {
                path: subject.to_path_buf(),
            });
        }
        Ok(())
    }

    fn name_len(path: &Path) -> u64 {
        path.file_name().map(|n| n.len() as u64).unwrap_or(0)
    }
}

#[async_trait]
impl FilesystemPort for FakeFilesystem {
    async fn list(&self, root: &Path) -> Result<Vec<FileEntry>> {
        self.simulate(format!("list {}", root.display()), root).await?;
        let now = Utc::now();
        Ok(vec![FileEntry {
            name: "fake.txt".to_string(),
            size: 8,
            file_type: FileType::File,
            created_at: now,
            updated_at: now,
        }])
    }

    async fn create_dir(&self, path: &Path) -> Result<()> {
        self.simulate(format!("mkdir {}", path.display()), path).await
    }

    async fn copy(&self, src: &Path, dst: &Path) -> Result<u64> {
        self.simulate(format!("copy {} -> {}", src.display(), dst.display()), src)
            .await?;
        if self.directories.contains(src) {
            return Err(Error::NotRegularFile {
                path: src.to_path_buf(),
            });
        }
        Ok(Self::name_len(src))
    }

    async fn move_file(&self, src: &Path, dst: &Path) -> Result<u64> {
        self.simulate(format!("move {} -> {}", src.display(), dst.display()), src)
            .await?;
        if self.directories.contains(src) {
            return Err(Error::NotRegularFile {
                path: src.to_path_buf(),
            });
        }
        Ok(Self::name_len(src))
    }

    async fn delete(&self, path: &Path) -> Result<()> {
        self.simulate(format!("delete {}", path.display()), path)
            .await
    }

    async fn save(&self, mut reader: UploadReader, name: &str, dest_dir: &Path) -> Result<u64> {
        let target = dest_dir.join(name);
        self.simulate(format!("save {}", target.display()), &target)
            .await?;
        let mut buf = Vec::new();
        let n = reader.read_to_end(&mut buf).await?;
        Ok(n as u64)
    }

    fn resolve(&self, relative: &Path) -> PathBuf {
        crate::utils::resolve_below(Path::new("/fake"), relative)
    }
}

/// Create a `FileManager` rooted in a fresh temp directory.
/// Returns the manager and the tempdir (which must be kept alive).
pub(crate) async fn create_test_manager() -> (FileManager, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.base_path = temp_dir.path().to_path_buf();
    config.operations.max_concurrent = 4;
    config.hub.subscriber_buffer = 64;

    let manager = FileManager::new(config).await.unwrap();
    (manager, temp_dir)
}
