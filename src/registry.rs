//! Task registry: owns live tasks, assigns identities, and notifies observers
//! of lifecycle transitions.
//!
//! Observers are fixed when the registry is built and are invoked synchronously
//! from inside the registry call that caused the transition, so they must not
//! block. The registry has no knowledge of what observers do with events
//! (the hub forwards them to connected clients).

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::task::Task;
use crate::types::{TaskId, TaskInfo, TaskStatus};

/// Lifecycle transition reported to observers
#[derive(Clone, Debug, PartialEq)]
pub enum TaskEvent {
    /// Task registered
    Added {
        /// Assigned identity
        id: TaskId,
        /// Snapshot at registration time
        task: TaskInfo,
    },
    /// Task transitioned to `Ended`
    Ended {
        /// Task identity
        id: TaskId,
        /// Snapshot right after the transition
        task: TaskInfo,
    },
    /// Task removed from the registry
    Removed {
        /// Task identity
        id: TaskId,
        /// Snapshot at removal time
        task: TaskInfo,
    },
}

impl TaskEvent {
    /// Identity of the task the event is about
    pub fn id(&self) -> TaskId {
        match self {
            TaskEvent::Added { id, .. }
            | TaskEvent::Ended { id, .. }
            | TaskEvent::Removed { id, .. } => *id,
        }
    }

    /// Snapshot carried by the event
    pub fn task(&self) -> &TaskInfo {
        match self {
            TaskEvent::Added { task, .. }
            | TaskEvent::Ended { task, .. }
            | TaskEvent::Removed { task, .. } => task,
        }
    }
}

/// Receives task lifecycle events
pub trait TaskObserver: Send + Sync {
    /// Called synchronously at each transition
    fn on_task_event(&self, event: &TaskEvent);
}

type Observers = Arc<Vec<Arc<dyn TaskObserver>>>;

fn notify(observers: &Observers, event: TaskEvent) {
    for observer in observers.iter() {
        observer.on_task_event(&event);
    }
}

/// Registry of in-flight and recently completed tasks
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, Task>>,
    observers: Observers,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRegistry {
    /// Create an empty registry with no observers
    pub fn new() -> Self {
        Self::with_observers(Vec::new())
    }

    /// Create an empty registry notifying the given observers
    pub fn with_observers(observers: Vec<Arc<dyn TaskObserver>>) -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            observers: Arc::new(observers),
        }
    }

    /// Register a task and return its freshly assigned identity.
    ///
    /// Fires `Added`, and wires the task so that its later transition to
    /// `Ended` fires `Ended` with the same identity.
    pub async fn add(&self, mut task: Task) -> TaskId {
        let id = TaskId::new();

        let observers = Arc::clone(&self.observers);
        task.on_end(move |ended: &Task| {
            notify(
                &observers,
                TaskEvent::Ended {
                    id,
                    task: ended.info(id),
                },
            );
        });

        let snapshot = task.info(id);
        {
            let mut tasks = self.tasks.lock().await;
            tasks.insert(id, task);
            // Notify while holding the lock so no other caller can observe
            // (or end) the task before `Added` has been delivered.
            notify(&self.observers, TaskEvent::Added { id, task: snapshot });
        }

        tracing::debug!(task_id = %id, "Task registered");
        id
    }

    /// End the task with the given identity.
    ///
    /// `error` is `None` on success. Fails with `TaskNotFound` for unknown
    /// identities and `InvalidTransition` when the task already ended.
    pub async fn end(&self, id: TaskId, error: Option<String>) -> Result<TaskInfo> {
        let mut tasks = self.tasks.lock().await;
        let task = tasks.get_mut(&id).ok_or(Error::TaskNotFound { id })?;
        task.end(error).map_err(|_| Error::InvalidTransition { id })?;

        let info = task.info(id);
        tracing::debug!(
            task_id = %id,
            failed = info.error.is_some(),
            "Task ended"
        );
        Ok(info)
    }

    /// Look up a task; `None` if absent or already removed
    pub async fn get(&self, id: TaskId) -> Option<TaskInfo> {
        let tasks = self.tasks.lock().await;
        tasks.get(&id).map(|task| task.info(id))
    }

    /// Snapshot of every registered task, in unspecified order
    pub async fn all(&self) -> Vec<TaskInfo> {
        let tasks = self.tasks.lock().await;
        tasks.iter().map(|(id, task)| task.info(*id)).collect()
    }

    /// Number of registered tasks
    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Whether the registry holds no tasks
    pub async fn is_empty(&self) -> bool {
        self.tasks.lock().await.is_empty()
    }

    /// Number of tasks still in progress
    pub async fn in_progress(&self) -> usize {
        let tasks = self.tasks.lock().await;
        tasks.values().filter(|task| !task.is_ended()).count()
    }

    /// Remove a task; fires `Removed` only if it was present
    pub async fn remove(&self, id: TaskId) {
        let mut tasks = self.tasks.lock().await;
        if let Some(task) = tasks.remove(&id) {
            notify(
                &self.observers,
                TaskEvent::Removed {
                    id,
                    task: task.info(id),
                },
            );
        }
    }

    /// Snapshot every task and remove the ones that had already ended, under
    /// one lock acquisition.
    ///
    /// A task ending after the snapshot stays registered, so its `Ended`
    /// state shows up in a later listing before it is swept.
    pub async fn list_and_sweep(&self) -> Vec<TaskInfo> {
        let mut tasks = self.tasks.lock().await;
        let snapshot: Vec<TaskInfo> = tasks.iter().map(|(id, task)| task.info(*id)).collect();

        let mut removed = 0;
        for info in snapshot.iter().filter(|info| info.status == TaskStatus::Ended) {
            if let Some(task) = tasks.remove(&info.id) {
                removed += 1;
                notify(
                    &self.observers,
                    TaskEvent::Removed {
                        id: info.id,
                        task: task.info(info.id),
                    },
                );
            }
        }

        if removed > 0 {
            tracing::debug!(removed, "Swept ended tasks after listing");
        }
        snapshot
    }

    /// Remove every ended task, leaving in-progress tasks untouched.
    ///
    /// Returns the number of removed tasks.
    pub async fn clean_ended(&self) -> usize {
        self.remove_where(Task::is_ended).await
    }

    /// Remove every task. Returns the number of removed tasks.
    pub async fn clear(&self) -> usize {
        self.remove_where(|_| true).await
    }

    async fn remove_where(&self, predicate: impl Fn(&Task) -> bool) -> usize {
        let mut tasks = self.tasks.lock().await;
        let doomed: Vec<TaskId> = tasks
            .iter()
            .filter(|(_, task)| predicate(task))
            .map(|(id, _)| *id)
            .collect();

        for id in &doomed {
            if let Some(task) = tasks.remove(id) {
                notify(
                    &self.observers,
                    TaskEvent::Removed {
                        id: *id,
                        task: task.info(*id),
                    },
                );
            }
        }

        if !doomed.is_empty() {
            tracing::debug!(removed = doomed.len(), "Removed tasks from registry");
        }
        doomed.len()
    }
}
