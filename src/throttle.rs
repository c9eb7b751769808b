//! Shared gatekeeper for the remote API quota

use std::{sync::Mutex, time::Duration};

use tokio::time::Instant;
use tracing::{debug, info};

/// Default length of a GitHub quota window
const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Gatekeeper for the shared remote call quota
///
/// One instance is shared by every wrapped service handle in the process,
/// since all of them draw from the same server-side budget. State starts
/// unknown and is refreshed from response metadata after each successful
/// call; a process restart resets it to unknown, which costs at most one
/// probe call against the server-side counter.
#[derive(Debug)]
pub struct ApiThrottle {
    state: Mutex<QuotaState>,
    window: Duration,
}

#[derive(Debug, Default)]
struct QuotaState {
    limit: Option<u32>,
    remaining: Option<u32>,
    refreshed_at: Option<Instant>,
}

impl ApiThrottle {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    /// Create a throttle for a custom quota window length
    pub fn with_window(window: Duration) -> Self {
        Self {
            state: Mutex::new(QuotaState::default()),
            window,
        }
    }

    /// Block until it is safe to issue another remote call
    ///
    /// With the quota exhausted this waits out the remainder of the current
    /// window, measured from the last quota observation. Unknown state
    /// imposes no wait. Local throttling is best-effort: two callers that
    /// both observe one remaining call may both proceed, the server stays
    /// the final arbiter.
    pub async fn call_wait(&self) {
        let wait = self.wait_duration();
        if !wait.is_zero() {
            info!(
                wait_ms = wait.as_millis() as u64,
                "API quota exhausted; waiting for next window"
            );
            tokio::time::sleep(wait).await;
        }
    }

    // The decision is a critical section: one lock guards the
    // (limit, remaining) pair so concurrent callers never see a torn read.
    fn wait_duration(&self) -> Duration {
        let state = self.state.lock().unwrap();
        match (state.remaining, state.refreshed_at) {
            (Some(0), Some(at)) => self.window.saturating_sub(at.elapsed()),
            _ => Duration::ZERO,
        }
    }

    /// Record the quota limit reported by the server; last write wins
    pub fn set_rate_limit(&self, limit: u32) {
        let mut state = self.state.lock().unwrap();
        state.limit = Some(limit);
        debug!(limit, "rate limit updated");
    }

    /// Record the remaining call count reported by the server; last write wins
    pub fn set_rate_limit_remaining(&self, remaining: u32) {
        let mut state = self.state.lock().unwrap();
        state.remaining = Some(remaining);
        state.refreshed_at = Some(Instant::now());
        debug!(remaining, "rate limit remaining updated");
    }

    /// Last observed quota limit, if any response has been seen
    pub fn rate_limit(&self) -> Option<u32> {
        self.state.lock().unwrap().limit
    }

    /// Last observed remaining call count, if any response has been seen
    pub fn rate_limit_remaining(&self) -> Option<u32> {
        self.state.lock().unwrap().remaining
    }
}

impl Default for ApiThrottle {
    fn default() -> Self {
        Self::new()
    }
}
