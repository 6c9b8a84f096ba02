use crate::{
    signal::CompletionSignal,
    sync::{AtomicBool, AtomicU32, Mutex, Ordering, fence, lock},
};
use derive_more::Debug;
use std::sync::Arc;

/// Capability shared by every node of the dependency graph.
///
/// Jobs and groups embed a [`BaseEntry`] and decide what "ready" means for
/// them: a job goes to the manager's ready queue, a group is immediately done.
pub trait Entry: Send + Sync {
    /// Dependency bookkeeping of this node.
    fn base(&self) -> &BaseEntry;
    /// Called exactly once, by whichever thread released the last hold.
    fn on_ready(self: Arc<Self>);
}

/// Something a job or group can wait for.
///
/// Implemented by [`Job`](crate::job::Job), [`JobHandle`](crate::job::JobHandle),
/// [`Group`](crate::group::Group) and [`GroupHandle`](crate::group::GroupHandle).
pub trait Dependency: AsEntry {}

impl<T: AsEntry> Dependency for T {}

/// Sealing trait for [`Dependency`].
pub trait AsEntry {
    /// Shared reference to the graph node.
    fn as_entry(&self) -> Arc<dyn Entry>;
}

/// Dependency counter, completion signal and dependents list of a graph node.
///
/// The counter starts at one: the owner's hold. Every predecessor edge adds one
/// more, and every satisfied predecessor as well as the owner's release takes
/// one away. The decrement that takes the counter from one to zero makes the
/// node ready.
#[derive(Debug)]
pub struct BaseEntry {
    dependency_count: AtomicU32,
    scheduled: AtomicBool,
    executed: AtomicBool,
    signal: Option<CompletionSignal>,
    /// `None` once the node is done: late dependents are already satisfied.
    #[debug(skip)]
    dependents: Mutex<Option<Vec<Arc<dyn Entry>>>>,
}

impl BaseEntry {
    pub(crate) fn new(sync_signal: bool) -> Self {
        Self {
            dependency_count: AtomicU32::new(1),
            scheduled: AtomicBool::new(false),
            executed: AtomicBool::new(false),
            signal: sync_signal.then(CompletionSignal::new),
            dependents: Mutex::new(Some(Vec::new())),
        }
    }

    /// Add a hold. Only valid before the node has been scheduled.
    pub(crate) fn increment_dependency(&self) {
        debug_assert!(
            !self.scheduled.load(Ordering::Relaxed),
            "BaseEntry::increment_dependency: [1]"
        );
        self.dependency_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop a hold and report whether this call made the node ready.
    ///
    /// Exactly one caller observes the `1 -> 0` transition, however many
    /// threads race here. The decrement publishes the caller's writes (Release)
    /// and the winner synchronizes with all of them (Acquire fence).
    ///
    /// # Panics
    /// If the counter is already zero.
    #[must_use]
    pub(crate) fn decrement_dependency(&self) -> bool {
        let mut current = self.dependency_count.load(Ordering::Relaxed);
        loop {
            assert_ne!(current, 0, "BaseEntry::decrement_dependency: [1]");
            match self.dependency_count.compare_exchange_weak(
                current,
                current - 1,
                Ordering::Release,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        if current == 1 {
            fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }

    pub(crate) fn dependency_count(&self) -> u32 {
        self.dependency_count.load(Ordering::Relaxed)
    }

    /// Close the `Scheduled` gate.
    ///
    /// # Panics
    /// If the node was already scheduled.
    pub(crate) fn mark_scheduled(&self) {
        let was_scheduled = self.scheduled.swap(true, Ordering::Relaxed);
        assert!(!was_scheduled, "BaseEntry::mark_scheduled: [1]");
    }

    pub(crate) fn is_executed(&self) -> bool {
        self.executed.load(Ordering::Acquire)
    }

    pub(crate) fn signal(&self) -> Option<&CompletionSignal> {
        self.signal.as_ref()
    }

    /// Register `dependent` to be released when this node is done.
    ///
    /// If this node is already done the edge is satisfied and nothing is
    /// recorded.
    pub(crate) fn add_dependent(&self, dependent: Arc<dyn Entry>) {
        let mut dependents = lock(&self.dependents);
        if let Some(dependents) = dependents.as_mut() {
            dependent.base().increment_dependency();
            dependents.push(dependent);
        }
    }

    /// Finish this node: set `executed`, fire the signal, release dependents.
    ///
    /// Dependents that become ready here are handed to their own
    /// [`Entry::on_ready`] on the calling thread.
    pub(crate) fn mark_done(&self) {
        self.mark_executed();
        self.notify_done();
    }

    /// First half of [`mark_done`](Self::mark_done): publish `executed`.
    pub(crate) fn mark_executed(&self) {
        self.executed.store(true, Ordering::Release);
    }

    /// Second half of [`mark_done`](Self::mark_done): fire the signal and
    /// release dependents.
    pub(crate) fn notify_done(&self) {
        let dependents = lock(&self.dependents)
            .take()
            .expect("BaseEntry::notify_done: [1]");
        if let Some(signal) = &self.signal {
            signal.fire();
        }
        for dependent in dependents {
            release(dependent);
        }
    }
}

/// Drop one hold on `entry`, running its ready behavior if that was the last.
pub(crate) fn release(entry: Arc<dyn Entry>) {
    if entry.base().decrement_dependency() {
        entry.on_ready();
    }
}
