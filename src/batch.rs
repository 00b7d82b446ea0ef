//! Concurrent batch operations: one tracked task per item, settled together.
//!
//! Every item of a batch is registered as a [`Task`], dispatched on its own
//! tokio task, and ended with its outcome. The caller gets one aggregated
//! result once every item has settled: the per-item values in input order,
//! or the first failure by completion order along with how many items
//! failed. A failing item never cancels its siblings, and dropping the
//! caller's future does not cancel items already dispatched.

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::fs::{FilesystemPort, UploadReader};
use crate::registry::TaskRegistry;
use crate::task::Task;
use crate::types::TaskKind;
use crate::utils::{join_path, sanitize_file_name};

/// One uploaded stream waiting to be stored
pub struct UploadItem {
    /// File name as sent by the client
    pub name: String,
    /// File contents
    pub reader: UploadReader,
}

impl UploadItem {
    /// Create an upload item
    pub fn new(name: impl Into<String>, reader: UploadReader) -> Self {
        Self {
            name: name.into(),
            reader,
        }
    }
}

impl std::fmt::Debug for UploadItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadItem")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Batch kinds that take a source and a destination
#[derive(Clone, Copy)]
enum Transfer {
    Copy,
    Move,
}

impl Transfer {
    fn kind(self) -> TaskKind {
        match self {
            Transfer::Copy => TaskKind::Copy,
            Transfer::Move => TaskKind::Move,
        }
    }
}

/// Decrements the in-flight count when an item settles or is dropped
struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A single item ready for dispatch
struct BatchItem<T> {
    label: String,
    task: Task,
    op: BoxFuture<'static, Result<T>>,
}

/// Runs copy, move, delete and upload batches against a [`FilesystemPort`]
pub struct BatchOrchestrator {
    fs: Arc<dyn FilesystemPort>,
    registry: Arc<TaskRegistry>,
    permits: Arc<Semaphore>,
    accepting: AtomicBool,
    in_flight: Arc<AtomicUsize>,
}

impl BatchOrchestrator {
    /// Create an orchestrator running at most `max_concurrent` items at once
    /// across all batches
    pub fn new(
        fs: Arc<dyn FilesystemPort>,
        registry: Arc<TaskRegistry>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            fs,
            registry,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            accepting: AtomicBool::new(true),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Registry the orchestrator records its tasks in
    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Filesystem the orchestrator operates on
    pub fn filesystem(&self) -> &Arc<dyn FilesystemPort> {
        &self.fs
    }

    /// Reject every batch started from now on with [`Error::ShuttingDown`].
    /// Items already dispatched keep running.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Whether new batches are accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Items dispatched by an accepted batch that have not ended yet.
    ///
    /// An item counts from the moment its batch is accepted, before its task
    /// is registered, so a caller that has seen [`stop_accepting`] take
    /// effect and then reads zero knows no further task events will follow.
    ///
    /// [`stop_accepting`]: BatchOrchestrator::stop_accepting
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Copy `path/name` to `destination/name` for every name.
    ///
    /// Returns the bytes copied per item, in input order.
    pub async fn copy_batch(
        &self,
        path: &str,
        filenames: &[String],
        destination: &str,
    ) -> Result<Vec<u64>> {
        self.transfer_batch(Transfer::Copy, path, filenames, destination)
            .await
    }

    /// Move `path/name` to `destination/name` for every name.
    ///
    /// Returns the size of each moved file, in input order.
    pub async fn move_batch(
        &self,
        path: &str,
        filenames: &[String],
        destination: &str,
    ) -> Result<Vec<u64>> {
        self.transfer_batch(Transfer::Move, path, filenames, destination)
            .await
    }

    async fn transfer_batch(
        &self,
        transfer: Transfer,
        path: &str,
        filenames: &[String],
        destination: &str,
    ) -> Result<Vec<u64>> {
        let items = filenames
            .iter()
            .map(|name| {
                let src = join_path(path, name);
                let dst = join_path(destination, name);
                let fs = Arc::clone(&self.fs);
                let (task, op): (Task, BoxFuture<'static, Result<u64>>) = match transfer {
                    Transfer::Copy => (
                        Task::copy(&src, &dst),
                        async move { fs.copy(&src, &dst).await }.boxed(),
                    ),
                    Transfer::Move => (
                        Task::move_file(&src, &dst),
                        async move { fs.move_file(&src, &dst).await }.boxed(),
                    ),
                };
                BatchItem {
                    label: name.clone(),
                    task,
                    op,
                }
            })
            .collect();

        self.run_batch(transfer.kind(), items).await
    }

    /// Delete `path/name` for every name; directories go with their contents
    pub async fn delete_batch(&self, path: &str, filenames: &[String]) -> Result<Vec<()>> {
        let items = filenames
            .iter()
            .map(|name| {
                let target = join_path(path, name);
                let fs = Arc::clone(&self.fs);
                BatchItem {
                    label: name.clone(),
                    task: Task::delete(&target),
                    op: async move { fs.delete(&target).await }.boxed(),
                }
            })
            .collect();

        self.run_batch(TaskKind::Delete, items).await
    }

    /// Store every upload in `destination`.
    ///
    /// Names are reduced to their final component; an item whose name has
    /// nothing usable left fails with [`Error::InvalidRequest`]. Returns the
    /// bytes written per item, in input order.
    pub async fn upload_batch(
        &self,
        uploads: Vec<UploadItem>,
        destination: &str,
    ) -> Result<Vec<u64>> {
        let dest_dir: PathBuf = join_path(destination, "");
        let items = uploads
            .into_iter()
            .map(|UploadItem { name, reader }| {
                let fs = Arc::clone(&self.fs);
                let dest = dest_dir.clone();
                let task = Task::upload(&name, &dest_dir);
                let op = match sanitize_file_name(&name) {
                    Some(file_name) => {
                        async move { fs.save(reader, &file_name, &dest).await }.boxed()
                    }
                    None => {
                        let message = format!("unusable file name '{name}'");
                        async move { Err(Error::InvalidRequest(message)) }.boxed()
                    }
                };
                BatchItem {
                    label: name,
                    task,
                    op,
                }
            })
            .collect();

        self.run_batch(TaskKind::Upload, items).await
    }

    /// Dispatch every item, wait for all of them, and aggregate.
    async fn run_batch<T>(&self, kind: TaskKind, items: Vec<BatchItem<T>>) -> Result<Vec<T>>
    where
        T: Send + 'static,
    {
        let total = items.len();

        // Count the items before checking the flag; shutdown stores the flag
        // before reading the count, so one of the two always sees the other.
        self.in_flight.fetch_add(total, Ordering::SeqCst);
        if !self.is_accepting() {
            self.in_flight.fetch_sub(total, Ordering::SeqCst);
            return Err(Error::ShuttingDown);
        }
        if total == 0 {
            return Ok(Vec::new());
        }
        tracing::debug!(kind = kind.verb(), total, "Dispatching batch");

        // Spawn everything before the first await so a dropped caller cannot
        // leave part of the batch undispatched.
        let mut labels = Vec::with_capacity(total);
        let mut pending = FuturesUnordered::new();
        for (index, item) in items.into_iter().enumerate() {
            labels.push(item.label);
            let guard = InFlight(Arc::clone(&self.in_flight));
            let handle = tokio::spawn(run_item(
                Arc::clone(&self.registry),
                Arc::clone(&self.permits),
                guard,
                item.task,
                item.op,
            ));
            pending.push(async move { (index, handle.await) });
        }

        let mut values: Vec<Option<T>> = (0..total).map(|_| None).collect();
        let mut first_failure: Option<(usize, Error)> = None;
        let mut failed = 0;

        while let Some((index, joined)) = pending.next().await {
            let outcome = joined
                .unwrap_or_else(|e| Err(Error::Other(format!("operation task failed: {e}"))));
            match outcome {
                Ok(value) => values[index] = Some(value),
                Err(e) => {
                    failed += 1;
                    if first_failure.is_none() {
                        first_failure = Some((index, e));
                    }
                }
            }
        }

        if let Some((index, source)) = first_failure {
            let item = labels.swap_remove(index);
            tracing::warn!(
                kind = kind.verb(),
                item = %item,
                error = %source,
                failed,
                total,
                "Batch finished with failures"
            );
            return Err(Error::Batch {
                item,
                source: Box::new(source),
                failed,
                total,
            });
        }

        tracing::info!(kind = kind.verb(), total, "Batch finished");
        values
            .into_iter()
            .collect::<Option<Vec<T>>>()
            .ok_or_else(|| Error::Other("batch item produced no result".to_string()))
    }
}

/// Register, wait for a slot, run, and end one item
async fn run_item<T>(
    registry: Arc<TaskRegistry>,
    permits: Arc<Semaphore>,
    _in_flight: InFlight,
    task: Task,
    op: BoxFuture<'static, Result<T>>,
) -> Result<T> {
    let id = registry.add(task).await;

    let outcome = async {
        let _permit = permits
            .acquire_owned()
            .await
            .map_err(|_| Error::ShuttingDown)?;
        AssertUnwindSafe(op)
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(Error::Other("operation panicked".to_string())))
    }
    .await;

    let message = outcome.as_ref().err().map(ToString::to_string);
    if let Err(e) = registry.end(id, message).await {
        tracing::warn!(task_id = %id, error = %e, "Failed to end task");
    }
    outcome
}
