mod queue;
mod shutdown;
mod worker;

/// Errors returned by [`Manager::stop`].
pub use crate::manager::shutdown::{AbandonedJob, ShutdownError};
/// Error returned by [`Manager::start`] when the pool cannot be spawned.
pub use crate::manager::worker::StartError;
use crate::{
    config::ManagerConfig,
    entry::Entry,
    job::{Job, JobBuilder, JobCore, Runnable},
    manager::queue::ReadyQueue,
    sync::{
        AtomicU64, Condvar, JoinHandle, Mutex, Ordering, ThreadId, current_thread_id, lock, wait,
    },
    types::{HashMap, JobId, Priority},
};
use core::num::NonZeroU64;
use derive_more::Debug;
use std::{
    borrow::Cow,
    sync::{Arc, Weak},
};
use tracing::{info, trace, warn};

/// Owner of the worker pool and of the ready queue.
///
/// Jobs are created through the manager, wired together with
/// [`Job::depends_on`], and handed over with [`Job::release`] or
/// [`Job::detach`]. A job that becomes ready is queued under its priority and
/// picked up by the next idle worker.
///
/// With a worker count of zero the manager runs every ready job inline, on
/// the thread that made it ready.
///
/// Dropping the manager stops it.
#[derive(Debug)]
pub struct Manager {
    shared: Arc<Shared>,
    #[debug(skip)]
    workers: Mutex<Vec<JoinHandle<()>>>,
    /// Held for the whole of [`Manager::stop`].
    #[debug(skip)]
    stopping: Mutex<()>,
    worker_count: usize,
}

/// State reachable from workers and, weakly, from jobs.
#[derive(Debug)]
pub(crate) struct Shared {
    queue: Mutex<ReadyQueue>,
    work_available: Condvar,
    inline: bool,
    /// Inline mode only.
    drain: Mutex<InlineDrain>,
    next_job_id: AtomicU64,
    /// Jobs created but not executed yet.
    #[debug(skip)]
    pending: Mutex<HashMap<JobId, PendingJob>>,
}

/// Thread running the inline queue, and whether it is inside a job body.
#[derive(Debug, Default)]
struct InlineDrain {
    owner: Option<ThreadId>,
    in_body: bool,
}

struct PendingJob {
    name: Cow<'static, str>,
    priority: Priority,
    job: Weak<JobCore>,
}

impl Manager {
    /// Spawn the worker pool described by `config`.
    ///
    /// # Errors
    /// If a worker thread cannot be spawned. Workers spawned before the failure
    /// are stopped and joined first.
    pub fn start(config: ManagerConfig) -> Result<Self, StartError> {
        let (worker_count, thread_name, stack_size) = config.into_parts();
        let shared = Arc::new(Shared::new(worker_count == 0));
        let workers = worker::spawn_pool(&shared, worker_count, &thread_name, stack_size)?;
        info!(workers = worker_count, "job manager started");
        Ok(Self {
            shared,
            workers: Mutex::new(workers),
            stopping: Mutex::new(()),
            worker_count,
        })
    }

    /// Create a job with [`Priority::Normal`], no completion signal and the
    /// default name.
    pub fn job(&self, payload: impl Runnable) -> Job {
        self.build_job().build(payload)
    }

    /// Configure a job before creating it.
    pub fn build_job(&self) -> JobBuilder<'_> {
        JobBuilder::new(self)
    }

    /// Fire and forget: run `payload` with `priority` as soon as a worker is
    /// free. Nothing can depend on it and nobody can wait for it.
    pub fn submit(&self, priority: Priority, payload: impl Runnable) {
        self.build_job().priority(priority).build(payload).detach();
    }

    /// Number of worker threads; `0` in inline mode.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Whether ready jobs run inline.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.shared.inline
    }

    /// Number of jobs created through this manager that have not executed yet,
    /// including jobs never released.
    ///
    /// A job leaves the count after it is marked executed and before its
    /// completion signal fires.
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        lock(&self.shared.pending).len()
    }

    /// Whether [`stop`](Self::stop) has completed.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        lock(&self.shared.queue).closed
    }

    /// Stop the pool.
    ///
    /// Blocks until every job that is ready, or becomes ready while the pool
    /// drains, has run and all workers have exited. Jobs that become ready
    /// after this returns are dropped without running.
    ///
    /// Concurrent calls are serialized: a later caller blocks until the first
    /// one has joined the workers, then reports on the stopped manager.
    ///
    /// # Errors
    /// - [`ShutdownError::WorkerPanicked`] if a worker thread died.
    /// - [`ShutdownError::Abandoned`] if some jobs never executed because their
    ///   dependencies were never satisfied or they were never released.
    pub fn stop(&self) -> Result<(), ShutdownError> {
        let _stopping = lock(&self.stopping);
        self.shared.begin_stop();

        let workers = core::mem::take(&mut *lock(&self.workers));
        let panicked = workers
            .into_iter()
            .map(JoinHandle::join)
            .filter(Result::is_err)
            .count();

        let leftovers = {
            let mut queue = lock(&self.shared.queue);
            queue.closed = true;
            queue.clear()
        };
        if !leftovers.is_empty() {
            warn!(count = leftovers.len(), "dropping jobs queued after the workers exited");
        }
        drop(leftovers);

        if panicked != 0 {
            return Err(ShutdownError::WorkerPanicked { workers: panicked });
        }
        let abandoned = self.shared.abandoned();
        if abandoned.is_empty() {
            info!("job manager stopped");
            Ok(())
        } else {
            warn!(count = abandoned.len(), "job manager stopped with abandoned jobs");
            Err(ShutdownError::Abandoned { jobs: abandoned })
        }
    }

    pub(crate) fn create_job(
        &self,
        name: Cow<'static, str>,
        priority: Priority,
        sync_signal: bool,
        body: Box<dyn Runnable>,
    ) -> Job {
        let id = self.shared.next_job_id();
        let core = Arc::new(JobCore::new(
            id,
            name.clone(),
            priority,
            sync_signal,
            body,
            Arc::downgrade(&self.shared),
        ));
        lock(&self.shared.pending).insert(
            id,
            PendingJob {
                name,
                priority,
                job: Arc::downgrade(&core),
            },
        );
        trace!(job = %id, %priority, "job created");
        Job::new(core)
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        if self.is_stopped() {
            return;
        }
        if let Err(error) = self.stop() {
            warn!(%error, "job manager dropped");
        }
    }
}

impl Shared {
    fn new(inline: bool) -> Self {
        Self {
            queue: Mutex::new(ReadyQueue::default()),
            work_available: Condvar::new(),
            inline,
            drain: Mutex::new(InlineDrain::default()),
            next_job_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::default()),
        }
    }

    fn next_job_id(&self) -> JobId {
        let raw = self.next_job_id.fetch_add(1, Ordering::Relaxed);
        JobId(NonZeroU64::new(raw).expect("Shared::next_job_id: [1]"))
    }

    /// Queue a job whose dependencies are all satisfied.
    ///
    /// Callable from any thread, including workers releasing dependents.
    pub(crate) fn schedule(&self, job: Arc<JobCore>) {
        job.base().mark_scheduled();
        let mut queue = lock(&self.queue);
        if queue.closed {
            warn!(
                job = %job.id(),
                name = job.name(),
                "job became ready after the manager stopped"
            );
            return;
        }
        trace!(job = %job.id(), priority = %job.priority(), "job scheduled");
        queue.push(job);
        drop(queue);
        if self.inline {
            self.drain_inline();
        } else {
            self.work_available.notify_one();
        }
    }

    /// Let workers exit once the queue is drained.
    fn begin_stop(&self) {
        lock(&self.queue).stopping = true;
        self.work_available.notify_all();
    }

    /// Block until a job is ready, or return `None` once the manager is
    /// stopping and nothing is left to run.
    fn next_ready(&self) -> Option<Arc<JobCore>> {
        let mut queue = lock(&self.queue);
        loop {
            if let Some(job) = queue.pop() {
                return Some(job);
            }
            if queue.stopping {
                return None;
            }
            queue = wait(&self.work_available, queue);
        }
    }

    fn pop_ready(&self) -> Option<Arc<JobCore>> {
        lock(&self.queue).pop()
    }

    /// Inline mode: run queued jobs on this thread until the queue is empty.
    ///
    /// Jobs made ready by a completion on the running thread, or by another
    /// thread, are queued and picked up by the running loop, so priorities
    /// hold and dependency chains do not recurse. Jobs released from inside a
    /// body run before that body continues.
    fn drain_inline(&self) {
        {
            let mut drain = lock(&self.drain);
            let owner = drain.owner;
            match owner {
                None => drain.owner = Some(current_thread_id()),
                Some(owner) if drain.in_body && owner == current_thread_id() => {
                    drain.in_body = false;
                    drop(drain);
                    self.run_queued_inline();
                    lock(&self.drain).in_body = true;
                    return;
                }
                Some(_) => return,
            }
        }
        loop {
            self.run_queued_inline();
            let mut drain = lock(&self.drain);
            // Pushers queue before they look at `owner`: whatever was queued
            // by a caller that saw us as the owner is visible here.
            if lock(&self.queue).is_empty() {
                drain.owner = None;
                return;
            }
        }
    }

    fn run_queued_inline(&self) {
        while let Some(job) = self.pop_ready() {
            lock(&self.drain).in_body = true;
            job.execute();
            lock(&self.drain).in_body = false;
            job.complete();
        }
    }

    pub(crate) fn unregister(&self, id: JobId) {
        lock(&self.pending).remove(&id);
    }

    fn abandoned(&self) -> Vec<AbandonedJob> {
        let mut abandoned: Vec<_> = lock(&self.pending)
            .iter()
            .map(|(&id, pending)| AbandonedJob {
                id,
                name: pending.name.clone(),
                priority: pending.priority,
                pending_dependencies: pending
                    .job
                    .upgrade()
                    .map(|job| job.base().dependency_count()),
            })
            .collect();
        abandoned.sort_unstable_by_key(|job| job.id);
        abandoned
    }
}
