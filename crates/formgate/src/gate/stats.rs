//! Decision counters.

use std::sync::atomic::{AtomicU64, Ordering};

use formgate_common::MetricsSnapshot;

use super::evaluator::{Decision, RejectReason};

#[derive(Debug, Default)]
pub struct GateStats {
    accepted: AtomicU64,
    rejected_empty: AtomicU64,
    rejected_replay: AtomicU64,
    rejected_store: AtomicU64,
    rejected_transport: AtomicU64,
    rejected_malformed: AtomicU64,
    rejected_policy: AtomicU64,
}

impl GateStats {
    pub fn record(&self, decision: &Decision) {
        let counter = match decision {
            Decision::Accepted => &self.accepted,
            Decision::Rejected(reason) => match reason {
                RejectReason::EmptyToken => &self.rejected_empty,
                RejectReason::Replayed => &self.rejected_replay,
                RejectReason::StoreUnavailable => &self.rejected_store,
                RejectReason::Transport => &self.rejected_transport,
                RejectReason::MalformedResponse => &self.rejected_malformed,
                RejectReason::Unsuccessful
                | RejectReason::ActionMismatch
                | RejectReason::ScoreTooLow => &self.rejected_policy,
            },
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected_empty: self.rejected_empty.load(Ordering::Relaxed),
            rejected_replay: self.rejected_replay.load(Ordering::Relaxed),
            rejected_store: self.rejected_store.load(Ordering::Relaxed),
            rejected_transport: self.rejected_transport.load(Ordering::Relaxed),
            rejected_malformed: self.rejected_malformed.load(Ordering::Relaxed),
            rejected_policy: self.rejected_policy.load(Ordering::Relaxed),
        }
    }
}
