use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::AbortHandle;

use domain::task::TaskId;
use tribunal_application::ports::outgoing::task_runner::{TaskFactory, TaskFuture, TaskRunnerPort};

/// Tokio-backed task runner. Handles are tracked so a pending task can
/// be cancelled by id; a one-shot task removes its own handle when it
/// fires, which makes a late cancel a no-op.
pub struct TokioTaskRunnerAdapter {
    next_id: AtomicU64,
    handles: Arc<DashMap<u64, AbortHandle>>,
}

impl TokioTaskRunnerAdapter {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handles: Arc::new(DashMap::new()),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for TokioTaskRunnerAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunnerPort for TokioTaskRunnerAdapter {
    fn run_later(&self, work: TaskFuture, delay: Duration) -> TaskId {
        let id = self.next_id();
        let handles = Arc::clone(&self.handles);
        let join = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            work.await;
            handles.remove(&id);
        });
        self.handles.insert(id, join.abort_handle());
        TaskId(id)
    }

    fn run_repeating(&self, work: TaskFactory, period: Duration) -> TaskId {
        let id = self.next_id();
        let join = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                work().await;
            }
        });
        self.handles.insert(id, join.abort_handle());
        TaskId(id)
    }

    fn cancel(&self, task: TaskId) {
        if let Some((_, handle)) = self.handles.remove(&task.0) {
            handle.abort();
        }
    }

    fn delay(&self, duration: Duration) -> TaskFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}
