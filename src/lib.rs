//! Multi-threaded job scheduler with explicit dependencies between jobs.
//!
//! This crate runs units of work ("jobs") on a pool of worker threads while
//! honoring producer/consumer edges between them. It:
//! - Tracks dependencies with a per-job atomic counter: one hold per
//!   unfinished predecessor plus the owner's own hold. The decrement that
//!   drops the last hold makes the job ready, exactly once.
//! - Dispatches ready jobs in strict priority order, FIFO among equal
//!   priorities.
//! - Notifies dependents unconditionally once a job has run, even if its body
//!   panicked.
//! - Lets the owner keep a handle (poll or block on completion) or detach the
//!   job and let the manager free it after it runs.
//!
//! Key modules:
//! - `manager`: the worker pool, ready queue and shutdown reporting.
//! - `job`: building, wiring and releasing jobs, and observing them.
//! - `group`: join points over several predecessors.
//! - `config`: pool configuration, including the inline (zero-worker) mode.
//! - `types`: identifiers, priorities and outcomes.
//!
//! Quick start:
//! ```
//! use mtjd::{config::ManagerConfig, manager::Manager, types::Priority};
//! use std::sync::{Arc, Mutex};
//!
//! let manager = Manager::start(ManagerConfig::default().worker_count(2)).unwrap();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let (l1, l2) = (log.clone(), log.clone());
//! let load = manager.job(move || l1.lock().unwrap().push("load"));
//! let compile = manager
//!     .build_job()
//!     .priority(Priority::High)
//!     .sync_signal(true)
//!     .build(move || l2.lock().unwrap().push("compile"));
//! compile.depends_on(&load);
//!
//! let compile = compile.release();
//! load.detach();
//! compile.wait();
//!
//! assert!(compile.is_executed());
//! assert_eq!(*log.lock().unwrap(), ["load", "compile"]);
//! manager.stop().unwrap();
//! ```

/// Pool configuration.
///
/// Exposes `ManagerConfig`, whose `worker_count` of zero selects synchronous
/// inline execution.
pub mod config;
mod entry;
/// Join points over several jobs or groups.
pub mod group;
/// Jobs: construction, dependency wiring, release and completion handles.
///
/// Defines the `Runnable` payload trait, `JobBuilder`, the unreleased `Job`
/// and the owner's `JobHandle`.
pub mod job;
/// The worker pool and dispatch loop.
///
/// Owns the priority-ordered ready queue, spawns and joins workers, and
/// reports jobs abandoned at shutdown.
pub mod manager;
mod signal;
mod sync;
/// Identifiers, priorities and outcomes shared across the crate.
pub mod types;
mod utils;
