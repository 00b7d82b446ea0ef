//! Task record and its `InProgress -> Ended` state machine.

use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;

use crate::types::{TaskId, TaskInfo, TaskKind, TaskStatus};

/// Callback invoked once, right after a task transitions to `Ended`
pub type CompletionHook = Box<dyn FnOnce(&Task) + Send>;

/// Returned when `end` is called on a task that already ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("task has already ended")]
pub struct AlreadyEnded;

/// One in-flight or completed single-item operation
pub struct Task {
    kind: TaskKind,
    name: String,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    status: TaskStatus,
    error: Option<String>,
    on_end: Option<CompletionHook>,
}

impl Task {
    /// Create an in-progress task started now
    pub fn new(kind: TaskKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            started_at: Utc::now(),
            ended_at: None,
            status: TaskStatus::InProgress,
            error: None,
            on_end: None,
        }
    }

    /// Task for copying `src` to `dst`
    pub fn copy(src: &Path, dst: &Path) -> Self {
        Self::transfer(TaskKind::Copy, src, dst)
    }

    /// Task for moving `src` to `dst`
    pub fn move_file(src: &Path, dst: &Path) -> Self {
        Self::transfer(TaskKind::Move, src, dst)
    }

    /// Task for deleting `path`
    pub fn delete(path: &Path) -> Self {
        Self::new(
            TaskKind::Delete,
            format!("{} {}", TaskKind::Delete.verb(), path.display()),
        )
    }

    /// Task for storing the upload `name` into `dest_dir`
    pub fn upload(name: &str, dest_dir: &Path) -> Self {
        Self::new(
            TaskKind::Upload,
            format!(
                "{} {} to {}",
                TaskKind::Upload.verb(),
                name,
                dest_dir.display()
            ),
        )
    }

    fn transfer(kind: TaskKind, src: &Path, dst: &Path) -> Self {
        Self::new(
            kind,
            format!("{} {} to {}", kind.verb(), src.display(), dst.display()),
        )
    }

    /// Attach a completion hook.
    ///
    /// A hook that was already attached still runs, before the new one.
    pub fn on_end(&mut self, hook: impl FnOnce(&Task) + Send + 'static) {
        let hook: CompletionHook = match self.on_end.take() {
            Some(previous) => Box::new(move |task: &Task| {
                previous(task);
                hook(task);
            }),
            None => Box::new(hook),
        };
        self.on_end = Some(hook);
    }

    /// Transition to `Ended`.
    ///
    /// `error` is `None` on success. The completion hook runs after every
    /// field is updated and never more than once.
    pub fn end(&mut self, error: Option<String>) -> std::result::Result<(), AlreadyEnded> {
        if self.status == TaskStatus::Ended {
            return Err(AlreadyEnded);
        }

        self.ended_at = Some(Utc::now());
        self.error = error;
        self.status = TaskStatus::Ended;

        if let Some(hook) = self.on_end.take() {
            hook(self);
        }
        Ok(())
    }

    /// Operation kind
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Human-readable description
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current status
    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Whether the task has ended
    pub fn is_ended(&self) -> bool {
        self.status == TaskStatus::Ended
    }

    /// Dispatch time
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Completion time, set iff the task has ended
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Terminal error message
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Snapshot of this task under the given identity
    pub fn info(&self, id: TaskId) -> TaskInfo {
        TaskInfo {
            id,
            kind: self.kind,
            name: self.name.clone(),
            status: self.status,
            started_at: self.started_at,
            ended_at: self.ended_at,
            error: self.error.clone(),
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("started_at", &self.started_at)
            .field("ended_at", &self.ended_at)
            .field("error", &self.error)
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn new_task_is_in_progress_without_end_time() {
        let task = Task::copy(&PathBuf::from("/a.txt"), &PathBuf::from("/b/a.txt"));

        assert_eq!(task.status(), TaskStatus::InProgress);
        assert!(task.ended_at().is_none());
        assert!(task.error().is_none());
        assert_eq!(task.kind(), TaskKind::Copy);
        assert_eq!(task.name(), "Copy /a.txt to /b/a.txt");
    }

    #[test]
    fn end_sets_status_time_and_error_together() {
        let mut task = Task::delete(&PathBuf::from("/old"));
        task.end(Some("permission denied".into())).unwrap();

        assert_eq!(task.status(), TaskStatus::Ended);
        assert!(task.ended_at().is_some());
        assert!(task.ended_at().unwrap() >= task.started_at());
        assert_eq!(task.error(), Some("permission denied"));
    }

    #[test]
    fn second_end_is_rejected_and_keeps_first_outcome() {
        let mut task = Task::move_file(&PathBuf::from("/a"), &PathBuf::from("/b/a"));
        task.end(None).unwrap();
        let first_end = task.ended_at();

        assert_eq!(task.end(Some("late".into())), Err(AlreadyEnded));
        assert_eq!(task.ended_at(), first_end);
        assert!(task.error().is_none());
    }

    #[test]
    fn hook_observes_fully_ended_task_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut task = Task::upload("photo.jpg", &PathBuf::from("/pictures"));

        let seen = calls.clone();
        task.on_end(move |t| {
            assert_eq!(t.status(), TaskStatus::Ended);
            assert!(t.ended_at().is_some());
            assert_eq!(t.error(), Some("disk full"));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        task.end(Some("disk full".into())).unwrap();
        let _ = task.end(None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn chained_hooks_run_in_attach_order() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut task = Task::new(TaskKind::Copy, "chained");

        let first = order.clone();
        task.on_end(move |_| first.lock().unwrap().push("first"));
        let second = order.clone();
        task.on_end(move |_| second.lock().unwrap().push("second"));

        task.end(None).unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn info_snapshot_carries_identity() {
        let id = TaskId::new();
        let mut task = Task::upload("notes.md", &PathBuf::from("/docs"));
        task.end(None).unwrap();

        let info = task.info(id);
        assert_eq!(info.id, id);
        assert_eq!(info.kind, TaskKind::Upload);
        assert_eq!(info.name, "Upload notes.md to /docs");
        assert_eq!(info.status, TaskStatus::Ended);
        assert!(!info.is_failed());
    }
}
