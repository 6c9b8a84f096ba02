use core::num::NonZeroU64;
use derive_more::Display;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap as _HashMap;

/// Unique identifier of a job within its [`Manager`](crate::manager::Manager).
///
/// Identifiers are handed out in creation order, starting from 1.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("#{_0}")]
#[repr(transparent)]
pub struct JobId(pub(crate) NonZeroU64);

impl JobId {
    /// Raw numeric value of the identifier.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

/// Dispatch priority of a job.
///
/// Among ready jobs the highest priority always runs first; jobs of equal
/// priority run in the order they became ready.
#[derive(Debug, Display, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Background work.
    #[display("low")]
    Low,
    /// Regular work.
    #[default]
    #[display("normal")]
    Normal,
    /// Latency-sensitive work.
    #[display("high")]
    High,
}

/// How a job body finished.
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum JobOutcome {
    /// The body returned normally.
    #[display("succeeded")]
    Succeeded,
    /// The body panicked. Dependents were still notified.
    #[display("panicked")]
    Panicked,
}

impl JobOutcome {
    pub(crate) const PENDING: u8 = 0;

    pub(crate) fn to_raw(self) -> u8 {
        match self {
            Self::Succeeded => 1,
            Self::Panicked => 2,
        }
    }

    pub(crate) fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Succeeded),
            2 => Some(Self::Panicked),
            _ => None,
        }
    }
}

pub(crate) type HashMap<K, V> = _HashMap<K, V, FxBuildHasher>;
