//! Remaining-call budget and the run-wide cancellation it drives.
//!
//! The server reports how many API calls are left after every response. The
//! transport feeds that number to [`CallBudget::record`]; once it falls to or
//! below the threshold the budget cancels the run's root token. The same token
//! is cancelled by an interrupt signal and at the end of a run, so every
//! dispatcher scope and every in-flight call observes one cancellation domain.

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

const UNKNOWN: u64 = u64::MAX;

/// Why a run was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The server reported `remaining` calls, at or below `threshold`.
    ThresholdReached { remaining: u64, threshold: u64 },
    /// SIGINT or SIGTERM was received.
    Interrupted,
    /// The run completed and released its resources.
    Finished,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::ThresholdReached {
                remaining,
                threshold,
            } => write!(
                f,
                "call threshold of {} reached, {} calls remaining",
                threshold, remaining
            ),
            CancelReason::Interrupted => write!(f, "run interrupted"),
            CancelReason::Finished => write!(f, "run already finished"),
        }
    }
}

/// Observable state of the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    Active,
    Cancelled(CancelReason),
}

/// Server-reported call budget shared by the transport, the dispatcher and the runtime.
#[derive(Debug)]
pub struct CallBudget {
    threshold: u64,
    remaining: AtomicU64,
    reason: OnceLock<CancelReason>,
    token: CancellationToken,
}

impl CallBudget {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold,
            remaining: AtomicU64::new(UNKNOWN),
            reason: OnceLock::new(),
            token: CancellationToken::new(),
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Root token of the run. Scopes derive child tokens from it.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Last remaining-call count reported by the server, if any.
    pub fn remaining(&self) -> Option<u64> {
        match self.remaining.load(Ordering::Acquire) {
            UNKNOWN => None,
            n => Some(n),
        }
    }

    /// Publish a remaining-call count read from a response header.
    ///
    /// Returns true if this report crossed the threshold and cancelled the run.
    /// Later reports still refresh the stored value but never cancel again.
    pub fn record(&self, remaining: u64) -> bool {
        self.remaining.store(remaining, Ordering::Release);
        if remaining > self.threshold {
            return false;
        }
        let tripped = self.trip(CancelReason::ThresholdReached {
            remaining,
            threshold: self.threshold,
        });
        if tripped {
            log::error!(
                "API call threshold reached, only {} calls remaining.",
                remaining
            );
        }
        tripped
    }

    /// Cancel the run because of an OS signal.
    pub fn interrupt(&self) -> bool {
        let tripped = self.trip(CancelReason::Interrupted);
        if tripped {
            log::warn!("Cancelling...");
        }
        tripped
    }

    /// Cancel the run as part of normal end-of-run cleanup.
    pub fn finish(&self) -> bool {
        self.trip(CancelReason::Finished)
    }

    /// Transition Active -> Cancelled. Only the first reason is kept.
    fn trip(&self, reason: CancelReason) -> bool {
        let first = self.reason.set(reason).is_ok();
        if first {
            self.token.cancel();
        }
        first
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.get().copied()
    }

    pub fn state(&self) -> BudgetState {
        match self.reason() {
            Some(reason) => BudgetState::Cancelled(reason),
            None => BudgetState::Active,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}
