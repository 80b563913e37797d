//! Task identity allocation and the holding area for failed tasks.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::task::{Task, TaskId};

/// Allocates task ids and holds failed tasks awaiting a user-initiated retry.
///
/// Ids are strictly increasing and never reused. The retry store gains an
/// entry when an attempt fails and loses it when the task either completes
/// or transitions back to active through a retry.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    next_id: AtomicU64,
    failed: Mutex<HashMap<TaskId, Task>>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next task id.
    pub fn alloc_id(&self) -> TaskId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Puts a failed task into the retry store.
    pub fn record_failure(&self, task: Task) {
        self.failed.lock().unwrap().insert(task.id(), task);
    }

    /// Removes and returns a failed task, if present.
    pub fn take_failed(&self, id: TaskId) -> Option<Task> {
        self.failed.lock().unwrap().remove(&id)
    }

    /// Drops a retry-store entry, if present.
    pub fn discard(&self, id: TaskId) {
        self.failed.lock().unwrap().remove(&id);
    }

    /// Ids and destination paths of all failed tasks, in id order.
    #[must_use]
    pub fn failed_tasks(&self) -> Vec<(TaskId, String)> {
        let mut entries: Vec<_> = self
            .failed
            .lock()
            .unwrap()
            .values()
            .map(|t| (t.id(), t.relative_path().to_string()))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries
    }

    /// Number of tasks waiting in the retry store.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failed.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::MemorySource;
    use std::sync::Arc;

    fn task(registry: &TaskRegistry, path: &str) -> Task {
        Task::new(
            registry.alloc_id(),
            path,
            Arc::new(MemorySource::new(vec![0u8; 16])),
        )
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let registry = TaskRegistry::new();
        let ids: Vec<_> = (0..10).map(|_| registry.alloc_id()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn retry_store_round_trip() {
        let registry = TaskRegistry::new();
        let t = task(&registry, "a.bin");
        let id = t.id();

        registry.record_failure(t);
        assert_eq!(registry.failed_count(), 1);
        assert_eq!(registry.failed_tasks(), vec![(id, "a.bin".to_string())]);

        let taken = registry.take_failed(id).unwrap();
        assert_eq!(taken.id(), id);
        assert_eq!(registry.failed_count(), 0);
        assert!(registry.take_failed(id).is_none());
    }

    #[test]
    fn discard_is_tolerant_of_absent_ids() {
        let registry = TaskRegistry::new();
        registry.discard(42);
        let t = task(&registry, "b.bin");
        let id = t.id();
        registry.record_failure(t);
        registry.discard(id);
        assert_eq!(registry.failed_count(), 0);
    }

    #[test]
    fn failed_tasks_sorted_by_id() {
        let registry = TaskRegistry::new();
        let a = task(&registry, "a");
        let b = task(&registry, "b");
        let (ida, idb) = (a.id(), b.id());
        // insertion order reversed
        registry.record_failure(b);
        registry.record_failure(a);
        let ids: Vec<_> = registry.failed_tasks().into_iter().map(|(i, _)| i).collect();
        assert_eq!(ids, vec![ida, idb]);
    }
}
