use std::fmt;

/// Opaque cancellation token handed out by the task runner.
///
/// Held on punishment records so a manual revocation can cancel the
/// pending expiration task. Cancelling an already-fired task is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}
