//! Caller-side handle for one submitted task.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::scheduler::priority::TaskId;
use crate::scheduler::task::Command;

/// Handle returned by [`TaskScheduler::submit`](crate::TaskScheduler::submit).
///
/// Holds the task's own cancellation token and the typed result channel.
/// Dropping the handle detaches from the task without cancelling it.
pub struct TaskHandle<T> {
    pub(crate) id: TaskId,
    pub(crate) token: CancellationToken,
    pub(crate) done: oneshot::Receiver<Result<T, TaskError>>,
    pub(crate) commands: mpsc::WeakSender<Command>,
}

impl<T> TaskHandle<T> {
    /// The scheduler-assigned identifier.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Requests cancellation. Idempotent.
    ///
    /// The token is the authoritative signal: queued tasks are dropped at
    /// dispatch, running work observes it at its next checkpoint. The
    /// coordinator is additionally nudged for prompt queue cleanup when it
    /// is still reachable.
    pub fn cancel(&self) {
        self.token.cancel();
        if let Some(tx) = self.commands.upgrade() {
            let _ = tx.try_send(Command::Cancel(self.id));
        }
    }

    /// True once cancellation was requested (by this handle or group-wide).
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for the task's terminal result.
    ///
    /// Resolves [`TaskError::Canceled`] when the task was cancelled before
    /// producing a result, and [`TaskError::SchedulerClosed`] when the
    /// scheduler shut down underneath it.
    pub async fn join(self) -> Result<T, TaskError> {
        match self.done.await {
            Ok(result) => result,
            Err(_) if self.token.is_cancelled() => Err(TaskError::Canceled),
            Err(_) => Err(TaskError::SchedulerClosed),
        }
    }
}
