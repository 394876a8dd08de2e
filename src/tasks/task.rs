//! One tracked background operation.

use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::observability::metrics;

/// Progress updates buffered between the body and the tracker.
const PROGRESS_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Waiting,
    Running,
    Stopping,
    Completed,
    Failed,
    Stopped,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Waiting => "waiting",
            TaskState::Running => "running",
            TaskState::Stopping => "stopping",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Stopped => "stopped",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed | TaskState::Stopped)
    }
}

/// Point-in-time view of a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStatus {
    pub id: String,
    pub description: String,
    pub state: TaskState,
    pub progress: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One progress report from a task body.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Fraction done, 0.0 to 1.0.
    pub progress: f32,
    pub data: Option<Value>,
}

/// Sending half of the progress channel, handed to the task body.
///
/// The channel closes when the body drops it, which is how the tracker
/// learns the body is finished.
pub struct ProgressSender(mpsc::Sender<Progress>);

impl ProgressSender {
    pub async fn report(&self, progress: f32, data: Option<Value>) {
        // A closed channel means the tracker is gone; nothing left to tell.
        let _ = self.0.send(Progress { progress, data }).await;
    }
}

/// Cooperative cancellation, checked by the task body at safe points.
#[derive(Clone)]
pub struct StopSignal(watch::Receiver<bool>);

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&mut self) {
        while !*self.0.borrow_and_update() {
            if self.0.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// The work a task performs.
pub type TaskBody =
    Box<dyn FnOnce(ProgressSender, StopSignal) -> BoxFuture<'static, Result<(), String>> + Send>;

struct TaskInner {
    state: TaskState,
    progress: f32,
    data: Option<Value>,
    error: Option<String>,
    body: Option<TaskBody>,
}

pub struct Task {
    id: String,
    description: String,
    inner: Mutex<TaskInner>,
    stop_tx: watch::Sender<bool>,
    done_tx: watch::Sender<bool>,
}

impl Task {
    pub(crate) fn new(id: String, description: String, body: TaskBody) -> Self {
        Self {
            id,
            description,
            inner: Mutex::new(TaskInner {
                state: TaskState::Waiting,
                progress: 0.0,
                data: None,
                error: None,
                body: Some(body),
            }),
            stop_tx: watch::channel(false).0,
            done_tx: watch::channel(false).0,
        }
    }

    fn inner(&self) -> MutexGuard<'_, TaskInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> TaskState {
        self.inner().state
    }

    pub fn status(&self) -> TaskStatus {
        let inner = self.inner();
        TaskStatus {
            id: self.id.clone(),
            description: self.description.clone(),
            state: inner.state,
            progress: inner.progress,
            error: inner.error.clone(),
            data: inner.data.clone(),
        }
    }

    /// Run the body on its own tokio task. Returns false if already started.
    pub fn start(self: &Arc<Self>) -> bool {
        let body = {
            let mut inner = self.inner();
            if inner.state != TaskState::Waiting {
                return false;
            }
            let Some(body) = inner.body.take() else {
                return false;
            };
            inner.state = TaskState::Running;
            inner.progress = 0.0;
            inner.data = None;
            body
        };

        let task = Arc::clone(self);
        tokio::spawn(async move {
            let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER);
            let stop = StopSignal(task.stop_tx.subscribe());
            let handle = tokio::spawn(body(ProgressSender(tx), stop));

            while let Some(update) = rx.recv().await {
                let mut inner = task.inner();
                inner.progress = update.progress;
                inner.data = update.data;
            }

            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(format!("task aborted: {}", e)),
            };
            task.finish(result);
        });
        true
    }

    fn finish(&self, result: Result<(), String>) {
        let state = {
            let mut inner = self.inner();
            let next = match (inner.state, result) {
                (TaskState::Stopping, _) => TaskState::Stopped,
                (_, Ok(())) => TaskState::Completed,
                (_, Err(e)) => {
                    inner.error = Some(e);
                    TaskState::Failed
                }
            };
            inner.state = next;
            next
        };
        tracing::info!(task = %self.id, state = state.as_str(), "Task finished");
        metrics::record_task(state.as_str());
        self.done_tx.send_replace(true);
    }

    /// Ask the body to stop.
    ///
    /// A running task moves to `stopping` and only becomes `stopped` once its
    /// body has returned. A task that never started is stopped at once.
    pub fn stop(&self) {
        let mut inner = self.inner();
        match inner.state {
            TaskState::Waiting => {
                inner.state = TaskState::Stopped;
                inner.body = None;
                drop(inner);
                self.done_tx.send_replace(true);
            }
            TaskState::Running => {
                inner.state = TaskState::Stopping;
                drop(inner);
                self.stop_tx.send_replace(true);
            }
            _ => {}
        }
    }

    /// Resolves once the task has reached a final state.
    pub async fn finished(&self) {
        let mut done = self.done_tx.subscribe();
        while !*done.borrow_and_update() {
            if done.changed().await.is_err() {
                return;
            }
        }
    }
}
