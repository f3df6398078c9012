//! Outbound rate limiter.
//!
//! Admits at most `max_per_window` requests per rolling window. Callers
//! over the cap queue FIFO on a fair async mutex and are admitted in
//! arrival order. The queue is unbounded; there is no backpressure signal
//! to callers.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Rolling-window rate limiter shared across all users and endpoints
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum admissions per rolling window
    max_per_window: usize,
    /// Window length
    window: Duration,
    /// Admission timestamps inside the current window
    admissions: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_per_window: usize, window: Duration) -> Self {
        Self {
            max_per_window,
            window,
            admissions: Mutex::new(VecDeque::with_capacity(max_per_window)),
        }
    }

    /// Wait until this caller may issue a request.
    ///
    /// The lock is held across the wait, so queued callers are admitted
    /// strictly in arrival order (the tokio mutex hands the lock to waiters
    /// FIFO). A caller that fails after admission does not affect anyone
    /// still queued.
    pub async fn acquire(&self) {
        let mut admissions = self.admissions.lock().await;

        loop {
            let now = Instant::now();

            // Drop admissions that have slid out of the window
            while let Some(&oldest) = admissions.front() {
                if now.duration_since(oldest) >= self.window {
                    admissions.pop_front();
                } else {
                    break;
                }
            }

            if admissions.len() < self.max_per_window {
                admissions.push_back(now);
                return;
            }

            // Window is full: wait for the oldest admission to expire
            let oldest = *admissions
                .front()
                .unwrap_or(&now);
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            tracing::debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
            sleep(wait).await;
        }
    }

    /// Admissions currently counted inside the window
    pub async fn current_window_count(&self) -> usize {
        let mut admissions = self.admissions.lock().await;
        let now = Instant::now();
        admissions.retain(|&t| now.duration_since(t) < self.window);
        admissions.len()
    }
}
