//! # Per-endpoint and per-task metrics.
//!
//! [`MetricsCollector`] accumulates counts, latencies, and success rates per
//! logical endpoint, plus scheduler-side execution statistics. Counters only
//! grow; [`MetricsCollector::reset`] is the single explicit way to clear them.
//!
//! ## Rules
//! - One sample is recorded per network **attempt**, keyed by the logical
//!   endpoint name from the request spec.
//! - Task samples are recorded once per terminal state (completed / failed /
//!   cancelled).
//! - Reads return a detached [`MetricsSnapshot`]; callers never observe the
//!   collector's internals mid-update.
//!
//! State lives behind `std::sync::RwLock`: critical sections are a few loads
//! and stores, and samples arrive from both sync and async call sites.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

/// Accumulated statistics for one logical endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointStats {
    /// Total attempts recorded.
    pub count: u64,
    /// Attempts that ended in a 2xx response.
    pub success_count: u64,
    /// Attempts that ended in any failure.
    pub failure_count: u64,
    /// Sum of wall-clock latencies across all attempts.
    pub total_latency: Duration,
}

impl EndpointStats {
    /// Fraction of successful attempts, or `None` before the first sample.
    pub fn success_rate(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.success_count as f64 / self.count as f64)
    }

    /// Mean attempt latency, or `None` before the first sample.
    pub fn average_latency(&self) -> Option<Duration> {
        if self.count == 0 {
            return None;
        }
        Some(self.total_latency / self.count as u32)
    }
}

/// Accumulated statistics for scheduled tasks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskStats {
    /// Tasks that completed normally.
    pub completed: u64,
    /// Tasks whose work returned an error.
    pub failed: u64,
    /// Tasks cancelled before or during execution.
    pub cancelled: u64,
    /// Sum of execution times of tasks that actually ran.
    pub total_exec: Duration,
}

impl TaskStats {
    /// Running average of execution time over tasks that ran to a terminal
    /// state (completed or failed), or `None` if nothing ran yet.
    pub fn average_exec(&self) -> Option<Duration> {
        let ran = self.completed + self.failed;
        if ran == 0 {
            return None;
        }
        Some(self.total_exec / ran as u32)
    }
}

/// Read-only view of the collector's state at one instant.
#[derive(Clone, Debug, Default)]
pub struct MetricsSnapshot {
    /// Per-endpoint request statistics.
    pub endpoints: HashMap<String, EndpointStats>,
    /// Scheduler task statistics.
    pub tasks: TaskStats,
}

impl MetricsSnapshot {
    /// Convenience accessor for one endpoint's stats.
    pub fn endpoint(&self, name: &str) -> Option<&EndpointStats> {
        self.endpoints.get(name)
    }
}

/// Thread-safe metrics store shared by the executor and the scheduler.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    endpoints: RwLock<HashMap<String, EndpointStats>>,
    tasks: RwLock<TaskStats>,
}

impl MetricsCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one request attempt for `endpoint`.
    pub fn record_request(&self, endpoint: &str, success: bool, latency: Duration) {
        let mut map = self.endpoints.write().expect("metrics lock poisoned");
        let stats = map.entry(endpoint.to_string()).or_default();
        stats.count += 1;
        if success {
            stats.success_count += 1;
        } else {
            stats.failure_count += 1;
        }
        stats.total_latency += latency;
    }

    /// Records a task that completed normally after `exec` of execution.
    pub fn record_task_completed(&self, exec: Duration) {
        let mut t = self.tasks.write().expect("metrics lock poisoned");
        t.completed += 1;
        t.total_exec += exec;
    }

    /// Records a task whose work returned an error after `exec` of execution.
    pub fn record_task_failed(&self, exec: Duration) {
        let mut t = self.tasks.write().expect("metrics lock poisoned");
        t.failed += 1;
        t.total_exec += exec;
    }

    /// Records a task cancelled before or during execution.
    pub fn record_task_cancelled(&self) {
        let mut t = self.tasks.write().expect("metrics lock poisoned");
        t.cancelled += 1;
    }

    /// Returns a detached snapshot of everything recorded so far.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            endpoints: self.endpoints.read().expect("metrics lock poisoned").clone(),
            tasks: self.tasks.read().expect("metrics lock poisoned").clone(),
        }
    }

    /// Clears all accumulated state.
    pub fn reset(&self) {
        self.endpoints.write().expect("metrics lock poisoned").clear();
        *self.tasks.write().expect("metrics lock poisoned") = TaskStats::default();
    }
}
