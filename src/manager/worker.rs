use crate::{
    manager::Shared,
    sync::{JoinHandle, spawn_worker},
};
use std::{io, sync::Arc};
use thiserror::Error;
use tracing::{debug, debug_span, error};

/// Error kind for manager startup failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StartError {
    /// The operating system refused to create a worker thread.
    #[error("failed to spawn worker thread {index}")]
    SpawnWorker {
        /// Index of the worker that could not be spawned.
        index: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

/// Spawn `worker_count` workers named `{thread_name}-{index}`.
///
/// On failure, the workers spawned so far are told to stop and joined before
/// the error is returned.
pub(super) fn spawn_pool(
    shared: &Arc<Shared>,
    worker_count: usize,
    thread_name: &str,
    stack_size: Option<usize>,
) -> Result<Vec<JoinHandle<()>>, StartError> {
    let mut workers = Vec::with_capacity(worker_count);
    for index in 0..worker_count {
        let worker_shared = shared.clone();
        let spawned = spawn_worker(format!("{thread_name}-{index}"), stack_size, move || {
            dispatch_loop(&worker_shared, index);
        });
        match spawned {
            Ok(worker) => workers.push(worker),
            Err(source) => {
                error!(index, %source, "failed to spawn worker thread");
                shared.begin_stop();
                for worker in workers {
                    let _ = worker.join();
                }
                return Err(StartError::SpawnWorker { index, source });
            }
        }
    }
    Ok(workers)
}

/// Body of a worker thread: run ready jobs until the manager stops and the
/// queue is drained.
fn dispatch_loop(shared: &Shared, index: usize) {
    let _span = debug_span!("worker", index).entered();
    debug!("worker started");
    let mut executed = 0_u64;
    while let Some(job) = shared.next_ready() {
        job.run();
        executed += 1;
    }
    debug!(executed, "worker exiting");
}
