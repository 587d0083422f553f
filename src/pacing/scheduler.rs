use super::clock::ClockState;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Result of waiting for an emission deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The deadline was reached (possibly after sleeping).
    Ready,
    /// The deadline had already passed by the given amount; no wait happened.
    Late(Duration),
    /// Cancellation was signalled before or during the wait.
    Cancelled,
}

/// Turns recovered clock values into wall-clock deadlines and waits on them.
#[derive(Debug, Clone)]
pub struct Scheduler {
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Emission deadline for the clock's current value.
    pub fn deadline(&self, clock: &ClockState) -> Option<Instant> {
        clock.target()
    }

    /// Suspends until `deadline` or cancellation, whichever comes first.
    ///
    /// A deadline in the past returns immediately; late chunks are never
    /// dropped and later deadlines are not pulled forward.
    pub async fn wait_until(&self, deadline: Instant) -> WaitOutcome {
        if self.cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }

        let now = Instant::now();
        if now >= deadline {
            return WaitOutcome::Late(now - deadline);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => WaitOutcome::Cancelled,
            _ = sleep_until(deadline) => WaitOutcome::Ready,
        }
    }
}
