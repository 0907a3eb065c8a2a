//! Task priorities and identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Scheduling priority. Higher levels always dispatch first; within one
/// level, tasks run in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Background work; runs when nothing else is waiting.
    Low = 0,
    /// Default priority.
    Medium = 1,
    /// Latency-sensitive work.
    High = 2,
    /// Preempts everything queued below it.
    Critical = 3,
}

impl Priority {
    /// All levels, highest first; the dispatch scan order.
    pub const DESCENDING: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// Dense index for per-level storage.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// Global counter backing [`TaskId::next`].
static TASK_SEQ: AtomicU64 = AtomicU64::new(0);

/// Opaque scheduler-assigned task identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates the next identifier.
    pub(crate) fn next() -> Self {
        TaskId(TASK_SEQ.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_descending_covers_all_levels() {
        let mut seen = [false; 4];
        for p in Priority::DESCENDING {
            seen[p.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(Priority::DESCENDING[0], Priority::Critical);
    }

    #[test]
    fn test_ids_are_unique() {
        let a = TaskId::next();
        let b = TaskId::next();
        assert_ne!(a, b);
    }
}
