use std::{num::NonZeroUsize, thread};

/// Configuration of a [`Manager`](crate::manager::Manager).
///
/// ```
/// use mtjd::config::ManagerConfig;
///
/// let config = ManagerConfig::default()
///     .worker_count(4)
///     .thread_name("asset-compiler");
/// assert_eq!(config.workers(), 4);
/// assert!(ManagerConfig::inline().is_inline());
/// ```
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    worker_count: usize,
    thread_name: String,
    stack_size: Option<usize>,
}

impl ManagerConfig {
    /// No worker threads: jobs run synchronously on whichever thread makes
    /// them ready. Deterministic, which makes it the mode of choice for tests.
    pub fn inline() -> Self {
        Self::default().worker_count(0)
    }

    /// Number of worker threads. `0` selects inline execution.
    pub fn worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// Prefix of worker thread names; workers are named `{prefix}-{index}`.
    pub fn thread_name(mut self, thread_name: impl Into<String>) -> Self {
        self.thread_name = thread_name.into();
        self
    }

    /// Stack size of worker threads, in bytes. Platform default if unset.
    pub fn stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Configured number of worker threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.worker_count
    }

    /// Whether jobs run inline instead of on a pool.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.worker_count == 0
    }

    pub(crate) fn into_parts(self) -> (usize, String, Option<usize>) {
        let Self {
            worker_count,
            thread_name,
            stack_size,
        } = self;
        (worker_count, thread_name, stack_size)
    }
}

impl Default for ManagerConfig {
    /// One worker per available hardware thread.
    fn default() -> Self {
        Self {
            worker_count: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            thread_name: "mtjd".to_owned(),
            stack_size: None,
        }
    }
}
