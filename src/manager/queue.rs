use crate::{job::JobCore, types::Priority};
use core::cmp::Ordering;
use std::{collections::BinaryHeap, sync::Arc};

/// Ready jobs ordered by priority, then by the order they became ready.
#[derive(Debug, Default)]
pub(super) struct ReadyQueue {
    heap: BinaryHeap<Queued>,
    next_seq: u64,
    /// Set by `Manager::stop`; workers exit once this is set and the heap is
    /// empty.
    pub(super) stopping: bool,
    /// Set once `Manager::stop` has joined the workers; nothing is queued
    /// after that.
    pub(super) closed: bool,
}

#[derive(Debug)]
struct Queued {
    priority: Priority,
    seq: u64,
    job: Arc<JobCore>,
}

impl ReadyQueue {
    pub(super) fn push(&mut self, job: Arc<JobCore>) {
        let seq = self.next_seq;
        self.next_seq = seq.checked_add(1).expect("ReadyQueue::push: [1]");
        self.heap.push(Queued {
            priority: job.priority(),
            seq,
            job,
        });
    }

    pub(super) fn pop(&mut self) -> Option<Arc<JobCore>> {
        self.heap.pop().map(|queued| queued.job)
    }

    pub(super) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub(super) fn clear(&mut self) -> Vec<Arc<JobCore>> {
        self.heap.drain().map(|queued| queued.job).collect()
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    /// Max-heap order: higher priority first, then lower sequence number.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::{config::ManagerConfig, manager::Manager};

    #[test]
    fn strict_priority_with_fifo_tie_break() {
        let manager = Manager::start(ManagerConfig::inline()).unwrap();
        let mut queue = ReadyQueue::default();
        let priorities = [
            Priority::Low,
            Priority::High,
            Priority::Normal,
            Priority::High,
            Priority::Low,
        ];
        let jobs: Vec<_> = priorities
            .into_iter()
            .map(|priority| manager.build_job().priority(priority).build(|| {}))
            .collect();
        for job in &jobs {
            queue.push(job.core().clone());
        }
        assert_eq!(queue.heap.len(), 5);

        let order: Vec<_> = core::iter::from_fn(|| queue.pop())
            .map(|job| job.id().get())
            .collect();
        assert_eq!(order, [2, 4, 3, 1, 5]);
        assert!(queue.is_empty());
    }
}
