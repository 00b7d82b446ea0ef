//! Top-level service object wiring configuration, filesystem, task registry,
//! broadcast hub and batch orchestrator together.
//!
//! - [`lifecycle`] - Shutdown coordination

mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;

use crate::batch::{BatchOrchestrator, UploadItem};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fs::{FilesystemPort, LocalFilesystem};
use crate::hub::{Hub, HubNotifier, Subscription};
use crate::registry::{TaskObserver, TaskRegistry};
use crate::types::{FileEntry, TaskInfo};
use crate::utils::{clean_path, join_path};

/// Main file manager instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct FileManager {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Filesystem every operation goes through
    pub(crate) fs: Arc<dyn FilesystemPort>,
    /// Live and recently finished tasks
    pub(crate) registry: Arc<TaskRegistry>,
    /// Event fan-out to connected clients
    pub(crate) hub: Hub,
    /// Batch dispatch and aggregation
    pub(crate) operations: Arc<BatchOrchestrator>,
}

impl FileManager {
    /// Create a new FileManager on the local disk
    ///
    /// This validates the configuration, creates the base directory if it
    /// is missing, and starts the broadcast hub. Must be called from inside
    /// a tokio runtime.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(&config.base_path)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create base directory '{}': {}",
                        config.base_path.display(),
                        e
                    ),
                ))
            })?;

        let fs = Arc::new(LocalFilesystem::new(config.base_path.clone()));
        tracing::info!(base_path = %config.base_path.display(), "File manager starting");
        Self::with_filesystem(config, fs)
    }

    /// Create a FileManager over any [`FilesystemPort`]
    pub fn with_filesystem(config: Config, fs: Arc<dyn FilesystemPort>) -> Result<Self> {
        Self::with_observers(config, fs, Vec::new())
    }

    /// Create a FileManager whose registry notifies `observers` in addition
    /// to the hub
    pub fn with_observers(
        config: Config,
        fs: Arc<dyn FilesystemPort>,
        observers: Vec<Arc<dyn TaskObserver>>,
    ) -> Result<Self> {
        config.validate()?;

        let hub = Hub::spawn(config.hub.subscriber_buffer);

        let mut all_observers: Vec<Arc<dyn TaskObserver>> =
            vec![Arc::new(HubNotifier::new(hub.clone()))];
        all_observers.extend(observers);
        let registry = Arc::new(TaskRegistry::with_observers(all_observers));

        let operations = Arc::new(BatchOrchestrator::new(
            Arc::clone(&fs),
            Arc::clone(&registry),
            config.operations.max_concurrent,
        ));

        Ok(Self {
            config: Arc::new(config),
            fs,
            registry,
            hub,
            operations,
        })
    }

    /// Register a new hub subscriber
    ///
    /// Every task transition is broadcast as a `"task added"` or
    /// `"task ended"` message carrying the task snapshot.
    pub fn subscribe(&self) -> Subscription {
        self.hub.register()
    }

    /// Broadcast hub handle
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Task registry
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Filesystem the manager operates on
    pub fn filesystem(&self) -> &Arc<dyn FilesystemPort> {
        &self.fs
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// List a directory
    pub async fn list(&self, path: &str) -> Result<Vec<FileEntry>> {
        self.fs.list(&clean_path(path)).await
    }

    /// Create `directory` inside `path`
    pub async fn create_dir(&self, path: &str, directory: &str) -> Result<()> {
        self.fs.create_dir(&join_path(path, directory)).await
    }

    /// Copy every `path/name` into `destination`
    pub async fn copy(
        &self,
        path: &str,
        filenames: &[String],
        destination: &str,
    ) -> Result<Vec<u64>> {
        self.operations
            .copy_batch(path, filenames, destination)
            .await
    }

    /// Move every `path/name` into `destination`
    pub async fn move_items(
        &self,
        path: &str,
        filenames: &[String],
        destination: &str,
    ) -> Result<Vec<u64>> {
        self.operations
            .move_batch(path, filenames, destination)
            .await
    }

    /// Delete every `path/name`
    pub async fn delete(&self, path: &str, filenames: &[String]) -> Result<Vec<()>> {
        self.operations.delete_batch(path, filenames).await
    }

    /// Store every upload in `destination`
    pub async fn upload(&self, uploads: Vec<UploadItem>, destination: &str) -> Result<Vec<u64>> {
        self.operations.upload_batch(uploads, destination).await
    }

    /// Absolute location of the file behind a client path
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.fs.resolve(&clean_path(path))
    }

    /// Every registered task; ended tasks are swept right after being read,
    /// so each finished task is reported once.
    pub async fn task_list(&self) -> Vec<TaskInfo> {
        self.registry.list_and_sweep().await
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server listens on the configured bind address
    /// (default: 0.0.0.0:8080).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let manager = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(manager, config).await })
    }
}
