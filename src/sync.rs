#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::{
        sync::{
            Condvar, Mutex, MutexGuard,
            atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering, fence},
        },
        thread::{JoinHandle, ThreadId},
    };

    pub(crate) fn current_thread_id() -> ThreadId {
        loom::thread::current().id()
    }

    /// `loom` threads are anonymous and use the model's stack; the spawn itself
    /// cannot fail.
    pub(crate) fn spawn_worker(
        _name: String,
        _stack_size: Option<usize>,
        f: impl FnOnce() + Send + 'static,
    ) -> std::io::Result<JoinHandle<()>> {
        Ok(loom::thread::spawn(f))
    }
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use std::{
        sync::{
            Condvar, Mutex, MutexGuard,
            atomic::{AtomicBool, AtomicU8, AtomicU32, AtomicU64, Ordering, fence},
        },
        thread::{JoinHandle, ThreadId},
    };

    pub(crate) fn current_thread_id() -> ThreadId {
        std::thread::current().id()
    }

    pub(crate) fn spawn_worker(
        name: String,
        stack_size: Option<usize>,
        f: impl FnOnce() + Send + 'static,
    ) -> std::io::Result<JoinHandle<()>> {
        let mut builder = std::thread::Builder::new().name(name);
        if let Some(stack_size) = stack_size {
            builder = builder.stack_size(stack_size);
        }
        builder.spawn(f)
    }
}

pub(crate) use imp::*;

use std::sync::PoisonError;

/// Lock a mutex, ignoring poisoning.
///
/// Job payloads never run while one of the crate's locks is held, so a
/// poisoned lock can only come from a panic between two consistent states.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Block on `condvar`, ignoring poisoning (see [`lock`]).
#[inline]
pub(crate) fn wait<'a, T>(condvar: &Condvar, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
    condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
}
