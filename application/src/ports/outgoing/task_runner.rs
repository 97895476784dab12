use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use domain::task::TaskId;

pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
pub type TaskFactory = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// External scheduler abstraction. The core never spawns tasks itself;
/// expiration, banwave ticking and cleanup all run through this port.
pub trait TaskRunnerPort: Send + Sync {
    fn run_later(&self, work: TaskFuture, delay: Duration) -> TaskId;

    fn run_repeating(&self, work: TaskFactory, period: Duration) -> TaskId;

    /// Cancel a pending task. A no-op once the task has fired.
    fn cancel(&self, task: TaskId);

    /// Timer future for in-task pacing (the banwave inter-entry delay).
    fn delay(&self, duration: Duration) -> TaskFuture;
}

pub type DynTaskRunnerPort = Arc<dyn TaskRunnerPort>;
