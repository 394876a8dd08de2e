//! Registry of tracked tasks.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::FutureExt;

use super::task::{ProgressSender, StopSignal, Task, TaskStatus};

#[derive(Default)]
pub struct TaskManager {
    next_id: AtomicU64,
    tasks: Mutex<BTreeMap<u64, Arc<Task>>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, BTreeMap<u64, Arc<Task>>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a task in the `waiting` state.
    pub fn create<F, Fut>(&self, description: impl Into<String>, body: F) -> Arc<Task>
    where
        F: FnOnce(ProgressSender, StopSignal) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = Arc::new(Task::new(
            id.to_string(),
            description.into(),
            Box::new(move |progress, stop| body(progress, stop).boxed()),
        ));
        self.tasks().insert(id, Arc::clone(&task));
        task
    }

    /// Register and start a task.
    pub fn spawn<F, Fut>(&self, description: impl Into<String>, body: F) -> Arc<Task>
    where
        F: FnOnce(ProgressSender, StopSignal) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let task = self.create(description, body);
        task.start();
        tracing::info!(task = %task.id(), "Task started");
        task
    }

    pub fn get(&self, id: &str) -> Option<Arc<Task>> {
        let id: u64 = id.parse().ok()?;
        self.tasks().get(&id).cloned()
    }

    /// Status of every task, oldest first.
    pub fn list(&self) -> Vec<TaskStatus> {
        self.tasks().values().map(|t| t.status()).collect()
    }

    /// Stop a task that is still active, or forget one that is done.
    pub fn stop(&self, id: &str) -> Option<TaskStatus> {
        let task = self.get(id)?;
        if task.state().is_done() {
            self.delete(id);
        } else {
            task.stop();
        }
        Some(task.status())
    }

    pub fn delete(&self, id: &str) -> Option<Arc<Task>> {
        let id: u64 = id.parse().ok()?;
        self.tasks().remove(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskState;
    use serde_json::json;

    #[tokio::test]
    async fn test_progress_then_completed() {
        let manager = TaskManager::new();
        let task = manager.spawn("count", |progress, _stop| async move {
            progress.report(0.5, Some(json!({"step": 1}))).await;
            progress.report(1.0, Some(json!({"step": 2}))).await;
            Ok(())
        });

        task.finished().await;
        let status = task.status();
        assert_eq!(status.state, TaskState::Completed);
        assert_eq!(status.progress, 1.0);
        assert_eq!(status.data, Some(json!({"step": 2})));
        assert_eq!(manager.list().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_recorded() {
        let manager = TaskManager::new();
        let task = manager.spawn("fail", |_progress, _stop| async move { Err("disk full".to_string()) });

        task.finished().await;
        let status = task.status();
        assert_eq!(status.state, TaskState::Failed);
        assert_eq!(status.error.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn test_stopped_only_after_body_exits() {
        let manager = TaskManager::new();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let task = manager.spawn("slow", |_progress, mut stop| async move {
            stop.stopped().await;
            // Body is still busy cleaning up after the stop request.
            let _ = release_rx.await;
            Ok(())
        });

        assert_eq!(manager.stop(task.id()).unwrap().state, TaskState::Stopping);
        tokio::task::yield_now().await;
        assert_eq!(task.state(), TaskState::Stopping);

        release_tx.send(()).unwrap();
        task.finished().await;
        assert_eq!(task.state(), TaskState::Stopped);
    }

    #[tokio::test]
    async fn test_waiting_task_stops_immediately() {
        let manager = TaskManager::new();
        let task = manager.create("never", |_progress, _stop| async move { Ok(()) });
        assert_eq!(task.state(), TaskState::Waiting);

        task.stop();
        assert_eq!(task.state(), TaskState::Stopped);
        assert!(!task.start());
    }

    #[tokio::test]
    async fn test_stop_done_task_forgets_it() {
        let manager = TaskManager::new();
        let task = manager.spawn("quick", |_progress, _stop| async move { Ok(()) });
        task.finished().await;

        assert_eq!(manager.stop("0").unwrap().state, TaskState::Completed);
        assert!(manager.get("0").is_none());
        assert!(manager.stop("0").is_none());
        assert!(manager.get("not-a-number").is_none());
    }
}
