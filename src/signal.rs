use crate::sync::{Condvar, Mutex, lock, wait};
#[cfg(not(feature = "loom"))]
use std::time::Duration;

/// One-shot completion signal.
///
/// Any number of threads may block in [`wait`](Self::wait); a single producer
/// fires it exactly once, after which every current and future waiter returns
/// immediately.
#[derive(Debug)]
pub(crate) struct CompletionSignal {
    fired: Mutex<bool>,
    condvar: Condvar,
}

impl CompletionSignal {
    pub(crate) fn new() -> Self {
        Self {
            fired: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    /// # Panics
    /// If the signal has already fired.
    pub(crate) fn fire(&self) {
        let mut fired = lock(&self.fired);
        assert!(!*fired, "CompletionSignal::fire: [1]");
        *fired = true;
        drop(fired);
        self.condvar.notify_all();
    }

    pub(crate) fn is_fired(&self) -> bool {
        *lock(&self.fired)
    }

    pub(crate) fn wait(&self) {
        let mut fired = lock(&self.fired);
        while !*fired {
            fired = wait(&self.condvar, fired);
        }
    }

    /// Returns `true` if the signal fired before `timeout` elapsed.
    #[cfg(not(feature = "loom"))]
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let fired = lock(&self.fired);
        let (fired, _) = self
            .condvar
            .wait_timeout_while(fired, timeout, |fired| !*fired)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *fired
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::{sync::Arc, thread};

    #[test]
    fn wakes_every_waiter() {
        let signal = Arc::new(CompletionSignal::new());
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                thread::spawn(move || signal.wait())
            })
            .collect();
        signal.fire();
        for waiter in waiters {
            waiter.join().unwrap();
        }
        assert!(signal.is_fired());
    }

    #[test]
    fn wait_after_fire_returns_immediately() {
        let signal = CompletionSignal::new();
        signal.fire();
        signal.wait();
        assert!(signal.wait_timeout(Duration::ZERO));
    }

    #[test]
    fn wait_timeout_expires_when_not_fired() {
        let signal = CompletionSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    #[should_panic(expected = "CompletionSignal::fire: [1]")]
    fn firing_twice_is_a_contract_violation() {
        let signal = CompletionSignal::new();
        signal.fire();
        signal.fire();
    }
}
