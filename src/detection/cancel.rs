//! Cooperative cancellation for long-running scans

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::types::{DetectionError, Result};

/// Shared cancellation flag with an optional deadline
///
/// Clones share the same flag, so a caller can keep one clone and hand the
/// other to a worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// Token that can be cancelled via [`cancel`](Self::cancel)
    pub fn new() -> Self {
        Self {
            flag: Some(Arc::new(AtomicBool::new(false))),
            deadline: None,
        }
    }

    /// Token that never fires
    pub fn none() -> Self {
        Self::default()
    }

    /// Token that fires once `timeout` has elapsed from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline(Instant::now() + timeout)
    }

    /// Attach a deadline
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Signal cancellation to every clone
    pub fn cancel(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Fail with `Cancelled` or `DeadlineExceeded` if the token has fired
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(DetectionError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(DetectionError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}
