use std::time::Duration;

use tokio::time::Instant;

/// Coalesces bursts of "something changed" into one recompute per window.
///
/// The first change after a flush opens a window; further changes inside it are
/// absorbed. When the window closes the owner recomputes once and calls
/// [`RecomputeScheduler::flushed`]. After the last change the owner recomputes
/// unconditionally, whatever the scheduler state.
#[derive(Debug, Clone)]
pub struct RecomputeScheduler {
    window: Duration,
    deadline: Option<Instant>,
}

impl RecomputeScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn mark_dirty(&mut self, now: Instant) {
        if self.deadline.is_none() {
            self.deadline = Some(now + self.window);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// When the open window closes, if one is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn flushed(&mut self) {
        self.deadline = None;
    }
}

/// Sleeps until `deadline`, or forever when there is none.
pub(crate) async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
