//! Internal task representation and coordinator commands.

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;
use crate::scheduler::priority::{Priority, TaskId};

/// Type-erased work closure.
///
/// The typed result travels to the caller through a oneshot captured inside
/// the closure; the erased `Result<(), TaskError>` returned here is what the
/// coordinator's bookkeeping sees.
pub(crate) type TaskWork =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), TaskError>> + Send>;

/// One submitted task, owned by the coordinator until dispatch.
pub(crate) struct ManagedTask {
    pub id: TaskId,
    pub priority: Priority,
    pub group: Option<String>,
    /// Child of the scheduler's root token; cancelling it never touches
    /// siblings.
    pub token: CancellationToken,
    pub work: TaskWork,
}

/// Commands accepted by the coordinator loop.
pub(crate) enum Command {
    Submit(ManagedTask),
    Cancel(TaskId),
    CancelGroup(String),
    CancelAll,
}

/// Worker-to-coordinator completion report.
pub(crate) struct Finished {
    pub id: TaskId,
    pub result: Result<(), TaskError>,
}
