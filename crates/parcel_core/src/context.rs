//! Per-call cancellation and deadline signals.
//!
//! # Responsibility
//! - Carry a caller-owned cancel flag and an optional deadline into every
//!   repository operation.
//!
//! # Invariants
//! - A `CancelToken` never resets once cancelled.
//! - Cancellation wins over deadline expiry when both apply.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-operation timeout used by callers without their own budget.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

/// Shareable cancel flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Reason an operation must stop early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

/// Cancellation and deadline signal passed to every repository call.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    deadline: Option<Instant>,
    token: CancelToken,
}

impl OpContext {
    /// Context without deadline and with a fresh, never-cancelled token.
    pub fn background() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        // Overflowing the clock means "no practical deadline".
        let deadline = Instant::now().checked_add(timeout);
        Self {
            deadline,
            token: CancelToken::new(),
        }
    }

    /// Context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            token: CancelToken::new(),
        }
    }

    /// Replaces the cancel flag with a caller-held token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.token = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.token
    }

    /// Returns why the operation must stop, or `None` when it may proceed.
    pub fn interrupt(&self) -> Option<Interrupt> {
        if self.token.is_cancelled() {
            return Some(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(Interrupt::DeadlineExceeded),
            _ => None,
        }
    }
}
