use crate::entry::{AsEntry, BaseEntry, Dependency, Entry, release};
use derive_more::Debug;
use std::sync::Arc;
#[cfg(not(feature = "loom"))]
use std::time::Duration;
use tracing::trace;

#[derive(Debug)]
struct GroupCore {
    base: BaseEntry,
}

impl Entry for GroupCore {
    fn on_ready(self: Arc<Self>) {
        trace!("group done");
        self.base.mark_scheduled();
        self.base.mark_done();
    }

    fn base(&self) -> &BaseEntry {
        &self.base
    }
}

/// A join point over several predecessors, with no body of its own.
///
/// Add members with [`add`](Self::add), let other jobs
/// [`depends_on`](crate::job::Job::depends_on) the group, then
/// [`seal`](Self::seal) it. Once sealed and every member is done, the group is
/// done: its dependents are released and its signal (if any) fires.
///
/// Groups are one-shot; a done group cannot be re-armed.
#[must_use = "a group is only done once it is sealed"]
#[derive(Debug)]
pub struct Group {
    core: Arc<GroupCore>,
}

impl Group {
    /// A group without a completion signal.
    pub fn new() -> Self {
        Self::with_sync_signal(false)
    }

    /// A group whose handle can be waited on.
    pub fn with_signal() -> Self {
        Self::with_sync_signal(true)
    }

    fn with_sync_signal(sync_signal: bool) -> Self {
        Self {
            core: Arc::new(GroupCore {
                base: BaseEntry::new(sync_signal),
            }),
        }
    }

    /// Make the group wait for `member`.
    ///
    /// # Panics
    /// If `member` is this group.
    pub fn add(&self, member: &impl Dependency) -> &Self {
        let member = member.as_entry();
        assert!(
            !core::ptr::addr_eq(Arc::as_ptr(&member), Arc::as_ptr(&self.core)),
            "Group added to itself"
        );
        member.base().add_dependent(self.core.clone());
        self
    }

    /// Number of members not done yet, plus one until the group is sealed.
    #[must_use]
    pub fn pending_members(&self) -> u32 {
        self.core.base.dependency_count()
    }

    /// Stop accepting members. The group is done as soon as every member is.
    pub fn seal(self) -> GroupHandle {
        let Self { core } = self;
        release(core.clone());
        GroupHandle { core }
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

impl AsEntry for Group {
    fn as_entry(&self) -> Arc<dyn Entry> {
        self.core.clone()
    }
}

/// View of a sealed group.
#[derive(Debug)]
pub struct GroupHandle {
    core: Arc<GroupCore>,
}

impl GroupHandle {
    /// Whether every member is done.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.core.base.is_executed()
    }

    /// Block until every member is done.
    ///
    /// # Panics
    /// If the group was created with [`Group::new`] rather than
    /// [`Group::with_signal`].
    pub fn wait(&self) {
        self.core
            .base
            .signal()
            .expect("group was created without a completion signal")
            .wait();
    }

    /// Block until every member is done or `timeout` elapsed. Returns whether
    /// the group is done.
    ///
    /// # Panics
    /// If the group was created without a completion signal.
    #[cfg(not(feature = "loom"))]
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.core
            .base
            .signal()
            .expect("group was created without a completion signal")
            .wait_timeout(timeout)
    }
}

impl AsEntry for GroupHandle {
    fn as_entry(&self) -> Arc<dyn Entry> {
        self.core.clone()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;

    #[test]
    fn empty_group_is_done_when_sealed() {
        let group = Group::with_signal();
        assert_eq!(group.pending_members(), 1);
        let handle = group.seal();
        assert!(handle.is_done());
        handle.wait();
    }

    #[test]
    fn nested_group_completes_outer() {
        let inner = Group::new();
        let outer = Group::with_signal();
        outer.add(&inner);
        assert_eq!(outer.pending_members(), 2);
        let outer = outer.seal();
        assert!(!outer.is_done());
        let inner = inner.seal();
        assert!(inner.is_done());
        assert!(outer.is_done());
    }
}
