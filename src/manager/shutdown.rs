use crate::types::{JobId, Priority};
use std::borrow::Cow;
use thiserror::Error;

/// Error kind for [`Manager::stop`](crate::manager::Manager::stop).
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ShutdownError {
    /// Jobs that never executed: they were never released, or some
    /// predecessor never finished.
    #[error("{} job(s) abandoned with unresolved dependencies", .jobs.len())]
    Abandoned {
        /// Abandoned jobs, in creation order.
        jobs: Vec<AbandonedJob>,
    },
    /// Worker threads terminated by a panic outside any job body.
    #[error("{workers} worker thread(s) panicked")]
    WorkerPanicked {
        /// Number of workers that panicked.
        workers: usize,
    },
}

/// A job that was still waiting on dependencies when the manager stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbandonedJob {
    /// Identifier of the job.
    pub id: JobId,
    /// Name given at construction.
    pub name: Cow<'static, str>,
    /// Dispatch priority.
    pub priority: Priority,
    /// Holds left on the job (unfinished predecessors plus the owner's hold if
    /// it was never released), or `None` if nothing references the job any
    /// more.
    pub pending_dependencies: Option<u32>,
}
