pub use crate::entry::Dependency;
use crate::{
    entry::{AsEntry, BaseEntry, Entry, release},
    manager::{Manager, Shared},
    signal::CompletionSignal,
    sync::{AtomicBool, AtomicU8, Mutex, Ordering, lock},
    types::{JobId, JobOutcome, Priority},
    utils::panic_message,
};
use derive_more::Debug;
use std::{
    borrow::Cow,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Weak},
};
#[cfg(not(feature = "loom"))]
use std::time::Duration;
use tracing::{error, trace, warn};

/// Body of a job.
///
/// Implemented for every `FnOnce() + Send + 'static` closure. Implement it
/// directly for payload types that carry their own state.
pub trait Runnable: Send + 'static {
    /// Execute the payload. Called at most once, on a worker thread (or on
    /// the releasing thread when the manager runs inline).
    fn run(self: Box<Self>);
}

impl<F: FnOnce() + Send + 'static> Runnable for F {
    fn run(self: Box<Self>) {
        (*self)();
    }
}

/// Shared state of a job, referenced by its owner, its predecessors and the
/// ready queue.
#[derive(Debug)]
pub(crate) struct JobCore {
    id: JobId,
    name: Cow<'static, str>,
    priority: Priority,
    base: BaseEntry,
    detached: AtomicBool,
    outcome: AtomicU8,
    #[debug(skip)]
    body: Mutex<Option<Box<dyn Runnable>>>,
    #[debug(skip)]
    manager: Weak<Shared>,
}

impl JobCore {
    pub(crate) fn new(
        id: JobId,
        name: Cow<'static, str>,
        priority: Priority,
        sync_signal: bool,
        body: Box<dyn Runnable>,
        manager: Weak<Shared>,
    ) -> Self {
        Self {
            id,
            name,
            priority,
            base: BaseEntry::new(sync_signal),
            detached: AtomicBool::new(false),
            outcome: AtomicU8::new(JobOutcome::PENDING),
            body: Mutex::new(Some(body)),
            manager,
        }
    }

    pub(crate) fn id(&self) -> JobId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }

    fn outcome(&self) -> Option<JobOutcome> {
        JobOutcome::from_raw(self.outcome.load(Ordering::Acquire))
    }

    /// Run the body, then complete the job whatever the body did.
    pub(crate) fn run(self: Arc<Self>) {
        self.execute();
        self.complete();
    }

    /// Run the body, catching a panic, and record the outcome.
    pub(crate) fn execute(&self) {
        let body = lock(&self.body).take().expect("JobCore::execute: [1]");
        trace!(job = %self.id, name = %self.name, "running job");
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| body.run())) {
            Ok(()) => JobOutcome::Succeeded,
            Err(payload) => {
                error!(
                    job = %self.id,
                    name = %self.name,
                    panic = panic_message(&*payload),
                    "job panicked"
                );
                JobOutcome::Panicked
            }
        };
        self.outcome.store(outcome.to_raw(), Ordering::Release);
    }

    /// Mark the job executed, drop it from the manager's pending set, then
    /// wake waiters and release dependents.
    ///
    /// The caller's reference is dropped last: for a detached job this frees it.
    pub(crate) fn complete(self: Arc<Self>) {
        self.base.mark_executed();
        if let Some(manager) = self.manager.upgrade() {
            manager.unregister(self.id);
        }
        self.base.notify_done();
        if self.detached.load(Ordering::Acquire) {
            trace!(job = %self.id, "dropping detached job");
        }
    }
}

impl Entry for JobCore {
    fn base(&self) -> &BaseEntry {
        &self.base
    }

    fn on_ready(self: Arc<Self>) {
        match self.manager.upgrade() {
            Some(manager) => manager.schedule(self),
            None => warn!(
                job = %self.id,
                name = %self.name,
                "job became ready after its manager was dropped"
            ),
        }
    }
}

/// Configures a job before creating it. Obtained from
/// [`Manager::build_job`](Manager::build_job).
#[must_use]
#[derive(Debug)]
pub struct JobBuilder<'a> {
    #[debug(skip)]
    manager: &'a Manager,
    priority: Priority,
    name: Cow<'static, str>,
    sync_signal: bool,
}

impl<'a> JobBuilder<'a> {
    pub(crate) fn new(manager: &'a Manager) -> Self {
        Self {
            manager,
            priority: Priority::default(),
            name: Cow::Borrowed("unnamed job"),
            sync_signal: false,
        }
    }

    /// Dispatch priority. Defaults to [`Priority::Normal`].
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Label used in logs and abandonment reports.
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether the job carries a completion signal that
    /// [`JobHandle::wait`] can block on. Off by default.
    pub fn sync_signal(mut self, sync_signal: bool) -> Self {
        self.sync_signal = sync_signal;
        self
    }

    /// Create the job. It does not run until it is released or detached and
    /// all its predecessors are done.
    pub fn build(self, payload: impl Runnable) -> Job {
        let Self {
            manager,
            priority,
            name,
            sync_signal,
        } = self;
        manager.create_job(name, priority, sync_signal, Box::new(payload))
    }
}

/// A job whose dependencies are still being declared.
///
/// The owner holds one dependency on the job until it calls
/// [`release`](Self::release) or [`detach`](Self::detach). A job dropped
/// without either never runs and is reported as abandoned when the manager
/// stops.
#[must_use = "a job only runs once it is released or detached"]
#[derive(Debug)]
pub struct Job {
    core: Arc<JobCore>,
}

impl Job {
    pub(crate) fn new(core: Arc<JobCore>) -> Self {
        Self { core }
    }

    #[cfg(test)]
    pub(crate) fn core(&self) -> &Arc<JobCore> {
        &self.core
    }

    /// Identifier assigned by the manager.
    #[must_use]
    pub fn id(&self) -> JobId {
        self.core.id
    }

    /// Label given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Dispatch priority.
    #[must_use]
    pub fn priority(&self) -> Priority {
        self.core.priority
    }

    /// Number of holds still preventing this job from becoming ready: one per
    /// unfinished predecessor plus the owner's own hold.
    #[must_use]
    pub fn pending_dependencies(&self) -> u32 {
        self.core.base.dependency_count()
    }

    /// Make this job wait for `predecessor` to be done.
    ///
    /// A predecessor that is already done is a satisfied edge and adds
    /// nothing.
    ///
    /// # Panics
    /// If `predecessor` is this job.
    pub fn depends_on(&self, predecessor: &impl Dependency) -> &Self {
        let predecessor = predecessor.as_entry();
        assert!(
            !core::ptr::addr_eq(Arc::as_ptr(&predecessor), Arc::as_ptr(&self.core)),
            "Job {} depends on itself",
            self.core.id
        );
        predecessor.base().add_dependent(self.core.clone());
        self
    }

    /// Give up the owner's hold and keep a handle to observe completion.
    ///
    /// If every predecessor is already done the job is scheduled right away.
    /// With an inline manager it has run by the time this returns, also when
    /// called from inside another job's body. The exception is a release from a
    /// thread other than the one currently running the inline manager's queue:
    /// the job is left to that thread, so a job body waiting for it never
    /// returns.
    pub fn release(self) -> JobHandle {
        let Self { core } = self;
        release(core.clone());
        JobHandle { core }
    }

    /// Give up the owner's hold and let the manager free the job once it has
    /// run.
    pub fn detach(self) {
        let Self { core } = self;
        core.detached.store(true, Ordering::Release);
        release(core);
    }
}

impl AsEntry for Job {
    fn as_entry(&self) -> Arc<dyn Entry> {
        self.core.clone()
    }
}

/// Owner's view of a released job.
///
/// Dropping the handle turns the job into a detached one: the manager frees it
/// after execution.
#[derive(Debug)]
pub struct JobHandle {
    core: Arc<JobCore>,
}

impl JobHandle {
    /// Identifier assigned by the manager.
    #[must_use]
    pub fn id(&self) -> JobId {
        self.core.id
    }

    /// Label given at construction.
    #[must_use]
    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Whether the body has run (successfully or not) and dependents have been
    /// notified.
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.core.base.is_executed()
    }

    /// How the body finished, once it has.
    #[must_use]
    pub fn outcome(&self) -> Option<JobOutcome> {
        self.core.outcome()
    }

    /// Block until the job has executed.
    ///
    /// # Panics
    /// If the job was built without [`JobBuilder::sync_signal`].
    pub fn wait(&self) {
        self.signal().wait();
    }

    /// Block until the job has executed or `timeout` elapsed. Returns whether
    /// the job executed.
    ///
    /// # Panics
    /// If the job was built without [`JobBuilder::sync_signal`].
    #[cfg(not(feature = "loom"))]
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.signal().wait_timeout(timeout)
    }

    fn signal(&self) -> &CompletionSignal {
        self.core.base.signal().unwrap_or_else(|| {
            panic!(
                "Job {} ({}) was built without a completion signal",
                self.core.id, self.core.name
            )
        })
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        self.core.detached.store(true, Ordering::Release);
    }
}

impl AsEntry for JobHandle {
    fn as_entry(&self) -> Arc<dyn Entry> {
        self.core.clone()
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use crate::{config::ManagerConfig, manager::Manager};
    use std::sync::Arc;

    #[test]
    fn detached_job_is_freed_once_it_has_run() {
        let manager = Manager::start(ManagerConfig::default().worker_count(1)).unwrap();
        let job = manager.job(|| {});
        let core = Arc::downgrade(job.core());
        job.detach();
        manager.stop().unwrap();
        assert!(core.upgrade().is_none());
    }

    #[test]
    fn dropped_handle_frees_the_job_after_it_has_run() {
        let manager = Manager::start(ManagerConfig::inline()).unwrap();
        let held = manager.job(|| {});
        let job = manager.job(|| {});
        job.depends_on(&held);
        let core = Arc::downgrade(job.core());
        drop(job.release());
        assert!(core.upgrade().is_some());
        held.detach();
        assert!(core.upgrade().is_none());
        manager.stop().unwrap();
    }
}
