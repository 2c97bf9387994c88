//! Fetch epochs: the staleness token behind every cancellation decision.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use uuid::Uuid;

/// Identity of one fetch attempt.
///
/// Epochs compare by sequence number only; the trace id exists to correlate
/// log lines emitted by the same attempt.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FetchEpoch {
    seq: u64,
    trace_id: Uuid,
}

impl FetchEpoch {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }
}

impl PartialEq for FetchEpoch {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for FetchEpoch {}

impl fmt::Display for FetchEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.seq)
    }
}

/// Monotonic epoch source owned by one session.
#[derive(Debug, Default)]
pub struct EpochClock {
    counter: AtomicU64,
}

impl EpochClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next epoch.
    pub fn advance(&self) -> FetchEpoch {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        FetchEpoch {
            seq,
            trace_id: Uuid::new_v4(),
        }
    }
}
