//! # Scheduler core: submission API and the coordinator loop.
//!
//! [`TaskScheduler`] is the caller-facing half: it wraps work into a
//! type-erased [`ManagedTask`] and pushes commands into a bounded channel.
//! The [`Coordinator`] is a single spawned loop that owns every piece of
//! mutable scheduling state and therefore needs no locks:
//!
//! ```text
//!            commands (bounded mpsc)              done (unbounded mpsc)
//!  callers ────────────────────────► Coordinator ◄──────────────────── workers
//!                                        │
//!                                        ├─ arena:   TaskId → ManagedTask
//!                                        ├─ queues:  4 × VecDeque<TaskId> (FIFO)
//!                                        ├─ groups:  name → {TaskId}
//!                                        └─ running: TaskId → token/start
//! ```
//!
//! ## Dispatch rules
//! - Queues are scanned highest priority first; within a level, FIFO.
//! - At most `limit` workers run at once (`None` = unlimited).
//! - Queue entries are purged lazily: ids whose task already left the arena
//!   (cancelled) are skipped at pop time.
//! - A task found cancelled at dispatch never runs; it is reported cancelled
//!   without occupying a worker slot.
//!
//! ## Shutdown
//! Dropping the last [`TaskScheduler`] clone closes the command channel; the
//! coordinator cancels everything still queued or running and exits. Pending
//! handles resolve `Canceled`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{SchedulerError, TaskError};
use crate::events::{Bus, Event, EventKind};
use crate::metrics::MetricsCollector;
use crate::scheduler::handle::TaskHandle;
use crate::scheduler::priority::{Priority, TaskId};
use crate::scheduler::task::{Command, Finished, ManagedTask, TaskWork};

/// Priority-aware task scheduler with bounded concurrency.
///
/// Cheap to clone; all clones feed the same coordinator.
#[derive(Clone)]
pub struct TaskScheduler {
    commands: mpsc::Sender<Command>,
    root: CancellationToken,
}

impl TaskScheduler {
    /// Spawns the coordinator and returns the submission handle.
    pub fn new(config: &Config, metrics: Arc<MetricsCollector>, bus: Bus) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(config.submit_queue_capacity.max(1));
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let coordinator = Coordinator {
            limit: config.concurrency_limit(),
            arena: HashMap::new(),
            queues: Default::default(),
            groups: HashMap::new(),
            running: HashMap::new(),
            done_tx,
            metrics,
            bus,
        };
        tokio::spawn(coordinator.run(commands_rx, done_rx));

        Self {
            commands: commands_tx,
            root: CancellationToken::new(),
        }
    }

    /// Submits work at the given priority, optionally tagged with a group.
    ///
    /// The work receives its own cancellation token (a child of the
    /// scheduler's root) and must check it at natural yield points.
    /// Fails fast with [`SchedulerError::Full`] when the submission queue is
    /// at capacity and [`SchedulerError::Closed`] after shutdown.
    pub fn submit<T, F, Fut>(
        &self,
        priority: Priority,
        group: Option<&str>,
        work: F,
    ) -> Result<TaskHandle<T>, SchedulerError>
    where
        T: Send + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let id = TaskId::next();
        let token = self.root.child_token();
        let (done_tx, done_rx) = oneshot::channel();

        let wrapped: TaskWork = Box::new(move |token: CancellationToken| {
            Box::pin(async move {
                let result = work(token).await;
                let erased = result.as_ref().map(|_| ()).map_err(|e| e.clone());
                let _ = done_tx.send(result);
                erased
            })
        });

        let task = ManagedTask {
            id,
            priority,
            group: group.map(str::to_string),
            token: token.clone(),
            work: wrapped,
        };

        self.commands
            .try_send(Command::Submit(task))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => SchedulerError::Full,
                mpsc::error::TrySendError::Closed(_) => SchedulerError::Closed,
            })?;

        Ok(TaskHandle {
            id,
            token,
            done: done_rx,
            commands: self.commands.downgrade(),
        })
    }

    /// Cancels one task by id. Idempotent; unknown ids are ignored.
    ///
    /// Queued tasks are dropped without running; running work observes its
    /// token at the next checkpoint.
    pub fn cancel(&self, id: TaskId) -> Result<(), SchedulerError> {
        self.send_control(Command::Cancel(id))
    }

    /// Cancels every queued and running task tagged with `group`. Idempotent.
    pub fn cancel_group(&self, group: &str) -> Result<(), SchedulerError> {
        self.send_control(Command::CancelGroup(group.to_string()))
    }

    /// Cancels every queued and running task. Later submissions are
    /// unaffected. Idempotent.
    pub fn cancel_all(&self) -> Result<(), SchedulerError> {
        self.send_control(Command::CancelAll)
    }

    fn send_control(&self, cmd: Command) -> Result<(), SchedulerError> {
        self.commands.try_send(cmd).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SchedulerError::Full,
            mpsc::error::TrySendError::Closed(_) => SchedulerError::Closed,
        })
    }
}

struct RunningEntry {
    group: Option<String>,
    token: CancellationToken,
    started_at: Instant,
}

/// Single owner of all scheduling state.
struct Coordinator {
    limit: Option<usize>,
    arena: HashMap<TaskId, ManagedTask>,
    queues: [VecDeque<TaskId>; 4],
    groups: HashMap<String, HashSet<TaskId>>,
    running: HashMap<TaskId, RunningEntry>,
    done_tx: mpsc::UnboundedSender<Finished>,
    metrics: Arc<MetricsCollector>,
    bus: Bus,
}

impl Coordinator {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut done: mpsc::UnboundedReceiver<Finished>,
    ) {
        loop {
            select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                // Never closes: the coordinator keeps a sender for workers.
                Some(fin) = done.recv() => self.handle_finished(fin),
            }
            self.dispatch();
        }
        self.cancel_all();
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit(task) => {
                self.publish(EventKind::TaskSubmitted, task.id);
                if let Some(group) = &task.group {
                    self.groups.entry(group.clone()).or_default().insert(task.id);
                }
                self.queues[task.priority.index()].push_back(task.id);
                self.arena.insert(task.id, task);
            }
            Command::Cancel(id) => {
                if self.arena.contains_key(&id) {
                    self.cancel_queued(id);
                } else if let Some(entry) = self.running.get(&id) {
                    // Bookkeeping happens when the worker reports back.
                    entry.token.cancel();
                }
            }
            Command::CancelGroup(group) => {
                if let Some(ids) = self.groups.remove(&group) {
                    for id in ids {
                        if self.arena.contains_key(&id) {
                            self.cancel_queued(id);
                        } else if let Some(entry) = self.running.get(&id) {
                            entry.token.cancel();
                        }
                    }
                }
            }
            Command::CancelAll => self.cancel_all(),
        }
    }

    fn handle_finished(&mut self, fin: Finished) {
        let Some(entry) = self.running.remove(&fin.id) else {
            return;
        };
        let elapsed = entry.started_at.elapsed();
        self.purge_group(entry.group.as_deref(), fin.id);

        match fin.result {
            Ok(()) => {
                self.metrics.record_task_completed(elapsed);
                self.publish(EventKind::TaskCompleted, fin.id);
            }
            Err(TaskError::Canceled) => {
                self.metrics.record_task_cancelled();
                self.publish(EventKind::TaskCancelled, fin.id);
            }
            // Work that errored out after its token fired counts as cancelled.
            Err(_) if entry.token.is_cancelled() => {
                self.metrics.record_task_cancelled();
                self.publish(EventKind::TaskCancelled, fin.id);
            }
            Err(err) => {
                self.metrics.record_task_failed(elapsed);
                self.bus.publish(
                    Event::new(EventKind::TaskFailed)
                        .with_task(fin.id.to_string())
                        .with_reason(err.to_string()),
                );
            }
        }
    }

    /// Fills free worker slots from the highest non-empty queue.
    fn dispatch(&mut self) {
        loop {
            if let Some(limit) = self.limit {
                if self.running.len() >= limit {
                    return;
                }
            }
            let Some(id) = self.pop_next() else { return };
            // Stale queue entry: the task already left the arena.
            let Some(task) = self.arena.remove(&id) else {
                continue;
            };

            if task.token.is_cancelled() {
                self.purge_group(task.group.as_deref(), id);
                self.metrics.record_task_cancelled();
                self.publish(EventKind::TaskCancelled, id);
                continue;
            }

            self.publish(EventKind::TaskStarting, id);
            self.running.insert(
                id,
                RunningEntry {
                    group: task.group.clone(),
                    token: task.token.clone(),
                    started_at: Instant::now(),
                },
            );

            let fut = (task.work)(task.token);
            let done = self.done_tx.clone();
            tokio::spawn(async move {
                let result = fut.await;
                let _ = done.send(Finished { id, result });
            });
        }
    }

    fn pop_next(&mut self) -> Option<TaskId> {
        for p in Priority::DESCENDING {
            if let Some(id) = self.queues[p.index()].pop_front() {
                return Some(id);
            }
        }
        None
    }

    /// Drops one queued task and reports it cancelled.
    fn cancel_queued(&mut self, id: TaskId) {
        if let Some(task) = self.arena.remove(&id) {
            task.token.cancel();
            self.purge_group(task.group.as_deref(), id);
            self.metrics.record_task_cancelled();
            self.publish(EventKind::TaskCancelled, id);
        }
    }

    fn cancel_all(&mut self) {
        let queued: Vec<TaskId> = self.arena.keys().copied().collect();
        for id in queued {
            self.cancel_queued(id);
        }
        for entry in self.running.values() {
            entry.token.cancel();
        }
    }

    fn purge_group(&mut self, group: Option<&str>, id: TaskId) {
        if let Some(name) = group {
            if let Some(set) = self.groups.get_mut(name) {
                set.remove(&id);
                if set.is_empty() {
                    self.groups.remove(name);
                }
            }
        }
    }

    fn publish(&self, kind: EventKind, id: TaskId) {
        self.bus.publish(Event::new(kind).with_task(id.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn scheduler(max_concurrent: usize) -> (TaskScheduler, Arc<MetricsCollector>, Bus) {
        let config = Config {
            max_concurrent_tasks: max_concurrent,
            ..Config::default()
        };
        let metrics = Arc::new(MetricsCollector::new());
        let bus = Bus::new(64);
        let sched = TaskScheduler::new(&config, metrics.clone(), bus.clone());
        (sched, metrics, bus)
    }

    /// Lets the coordinator drain its command queue.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_returns_typed_result() {
        let (sched, metrics, _) = scheduler(4);
        let handle = sched
            .submit(Priority::Medium, None, |_| async { Ok(42u64) })
            .unwrap();
        assert_eq!(handle.join().await.unwrap(), 42);
        assert_eq!(metrics.snapshot().tasks.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_error_surfaces_and_counts_failed() {
        let (sched, metrics, _) = scheduler(4);
        let handle = sched
            .submit(Priority::Medium, None, |_| async {
                Err::<(), _>(TaskError::Failed {
                    error: "boom".into(),
                })
            })
            .unwrap();
        assert!(matches!(
            handle.join().await,
            Err(TaskError::Failed { .. })
        ));
        assert_eq!(metrics.snapshot().tasks.failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_priority_order_high_before_low() {
        let (sched, _, _) = scheduler(1);
        let order = Arc::new(Mutex::new(Vec::new()));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = sched
            .submit(Priority::Medium, None, move |_| async move {
                release_rx.await.ok();
                Ok(())
            })
            .unwrap();

        let mut handles = Vec::new();
        for (priority, label) in [
            (Priority::Low, "low"),
            (Priority::Medium, "medium"),
            (Priority::High, "high"),
            (Priority::Critical, "critical"),
        ] {
            let order = order.clone();
            handles.push(
                sched
                    .submit(priority, None, move |_| async move {
                        order.lock().unwrap().push(label);
                        Ok(())
                    })
                    .unwrap(),
            );
        }

        settle().await;
        release_tx.send(()).unwrap();
        blocker.join().await.unwrap();
        for h in handles {
            h.join().await.unwrap();
        }

        assert_eq!(
            *order.lock().unwrap(),
            vec!["critical", "high", "medium", "low"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_within_one_level() {
        let (sched, _, _) = scheduler(1);
        let order = Arc::new(Mutex::new(Vec::new()));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = sched
            .submit(Priority::High, None, move |_| async move {
                release_rx.await.ok();
                Ok(())
            })
            .unwrap();

        let mut handles = Vec::new();
        for label in ["a", "b", "c"] {
            let order = order.clone();
            handles.push(
                sched
                    .submit(Priority::Medium, None, move |_| async move {
                        order.lock().unwrap().push(label);
                        Ok(())
                    })
                    .unwrap(),
            );
        }

        settle().await;
        release_tx.send(()).unwrap();
        blocker.join().await.unwrap();
        for h in handles {
            h.join().await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_never_exceeds_limit() {
        let (sched, metrics, _) = scheduler(2);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let active = active.clone();
            let peak = peak.clone();
            handles.push(
                sched
                    .submit(Priority::Medium, None, move |_| async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .unwrap(),
            );
        }
        for h in handles {
            h.join().await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(metrics.snapshot().tasks.completed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_queued_task_never_runs() {
        let (sched, metrics, _) = scheduler(1);
        let ran = Arc::new(AtomicBool::new(false));
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = sched
            .submit(Priority::Medium, None, move |_| async move {
                release_rx.await.ok();
                Ok(())
            })
            .unwrap();

        let flag = ran.clone();
        let queued = sched
            .submit(Priority::Medium, None, move |_| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        settle().await;
        queued.cancel();
        release_tx.send(()).unwrap();
        blocker.join().await.unwrap();

        assert_eq!(queued.join().await, Err(TaskError::Canceled));
        assert!(!ran.load(Ordering::SeqCst), "cancelled task must not run");
        settle().await;
        assert_eq!(metrics.snapshot().tasks.cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_by_id_from_scheduler() {
        let (sched, _, _) = scheduler(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = sched
            .submit(Priority::High, None, move |_| async move {
                release_rx.await.ok();
                Ok(())
            })
            .unwrap();
        let queued = sched
            .submit(Priority::Medium, None, |_| async { Ok(()) })
            .unwrap();

        settle().await;
        sched.cancel(queued.id()).unwrap();
        sched.cancel(queued.id()).unwrap();
        release_tx.send(()).unwrap();
        blocker.join().await.unwrap();

        assert_eq!(queued.join().await, Err(TaskError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_running_task_is_cooperative() {
        let (sched, metrics, _) = scheduler(1);
        let handle = sched
            .submit(Priority::Medium, None, |token: CancellationToken| async move {
                token.cancelled().await;
                Err::<(), _>(TaskError::Canceled)
            })
            .unwrap();

        settle().await;
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(handle.join().await, Err(TaskError::Canceled));
        settle().await;
        assert_eq!(metrics.snapshot().tasks.cancelled, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_group_spares_other_groups() {
        let (sched, _, _) = scheduler(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = sched
            .submit(Priority::High, None, move |_| async move {
                release_rx.await.ok();
                Ok(())
            })
            .unwrap();

        let doomed = sched
            .submit(Priority::Medium, Some("session-1"), |_| async { Ok(1u32) })
            .unwrap();
        let spared = sched
            .submit(Priority::Medium, Some("session-2"), |_| async { Ok(2u32) })
            .unwrap();

        settle().await;
        sched.cancel_group("session-1").unwrap();
        release_tx.send(()).unwrap();
        blocker.join().await.unwrap();

        assert_eq!(doomed.join().await, Err(TaskError::Canceled));
        assert_eq!(spared.join().await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_group_hits_queued_and_running_members() {
        let (sched, metrics, _) = scheduler(1);

        let running = sched
            .submit(Priority::High, Some("g"), |token: CancellationToken| async move {
                token.cancelled().await;
                Err::<(), _>(TaskError::Canceled)
            })
            .unwrap();
        let queued_a = sched
            .submit(Priority::Medium, Some("g"), |_| async { Ok(()) })
            .unwrap();
        let queued_b = sched
            .submit(Priority::Medium, Some("g"), |_| async { Ok(()) })
            .unwrap();
        let other = sched
            .submit(Priority::Medium, Some("h"), |_| async { Ok(3u32) })
            .unwrap();

        settle().await;
        sched.cancel_group("g").unwrap();

        assert_eq!(running.join().await, Err(TaskError::Canceled));
        assert_eq!(queued_a.join().await, Err(TaskError::Canceled));
        assert_eq!(queued_b.join().await, Err(TaskError::Canceled));
        assert_eq!(other.join().await.unwrap(), 3);

        settle().await;
        let tasks = metrics.snapshot().tasks;
        assert_eq!(tasks.cancelled, 3);
        assert_eq!(tasks.completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_is_idempotent() {
        let (sched, _, _) = scheduler(1);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let blocker = sched
            .submit(Priority::High, None, move |token: CancellationToken| async move {
                select! {
                    _ = release_rx => Ok(()),
                    _ = token.cancelled() => Err(TaskError::Canceled),
                }
            })
            .unwrap();
        let queued = sched
            .submit(Priority::Low, None, |_| async { Ok(()) })
            .unwrap();

        settle().await;
        sched.cancel_all().unwrap();
        sched.cancel_all().unwrap();
        settle().await;
        drop(release_tx);

        assert_eq!(blocker.join().await, Err(TaskError::Canceled));
        assert_eq!(queued.join().await, Err(TaskError::Canceled));

        // The scheduler stays usable for new work.
        let next = sched
            .submit(Priority::Medium, None, |_| async { Ok(7u8) })
            .unwrap();
        assert_eq!(next.join().await.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_outstanding_work() {
        let (sched, _, _) = scheduler(1);
        let running = sched
            .submit(Priority::Medium, None, |token: CancellationToken| async move {
                token.cancelled().await;
                Err::<(), _>(TaskError::Canceled)
            })
            .unwrap();
        let queued = sched
            .submit(Priority::Medium, None, |_| async { Ok(()) })
            .unwrap();

        settle().await;
        drop(sched);

        assert_eq!(running.join().await, Err(TaskError::Canceled));
        assert_eq!(queued.join().await, Err(TaskError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle_events_published() {
        let (sched, _, bus) = scheduler(1);
        let mut rx = bus.subscribe();

        let handle = sched
            .submit(Priority::Medium, None, |_| async { Ok(()) })
            .unwrap();
        handle.join().await.unwrap();
        settle().await;

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskSubmitted,
                EventKind::TaskStarting,
                EventKind::TaskCompleted,
            ]
        );
    }
}
