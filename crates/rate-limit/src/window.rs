//! Sliding window log for a single client.

use std::{collections::VecDeque, time::Duration};

use tokio::time::Instant;

/// Admission timestamps of one client, oldest first.
#[derive(Debug, Default)]
pub(crate) struct SlidingWindow {
    admissions: VecDeque<Instant>,
}

impl SlidingWindow {
    /// Prunes admissions that left the window ending at `now`, then admits and records `now` if
    /// fewer than `limit` admissions remain.
    ///
    /// On rejection returns the time until the oldest remaining admission leaves the window.
    pub(crate) fn try_admit(&mut self, now: Instant, limit: u32, duration: Duration) -> Result<(), Duration> {
        while let Some(&oldest) = self.admissions.front() {
            if now.saturating_duration_since(oldest) >= duration {
                self.admissions.pop_front();
            } else {
                break;
            }
        }

        if self.admissions.len() < limit as usize {
            self.admissions.push_back(now);
            return Ok(());
        }

        let retry_after = match self.admissions.front() {
            Some(&oldest) => duration.saturating_sub(now.saturating_duration_since(oldest)),
            None => Duration::ZERO,
        };

        Err(retry_after)
    }

    pub(crate) fn len(&self) -> usize {
        self.admissions.len()
    }
}
