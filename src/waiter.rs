//! Polls a change token until WAF reports it INSYNC.

use log::{info, warn};
use std::time::Duration;
use thiserror::Error;

use crate::types::ChangeTokenStatus;
use crate::waf::{WafApi, WafError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_retries: u32,
}

impl Default for WaitPolicy {
    /// 30s between checks, at most 15 retries.
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(30),
            max_interval: Duration::from_secs(30),
            max_retries: 15,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WaitError {
    #[error("Max retries ({max_retries}) reached, something must have gone wrong.")]
    Timeout {
        max_retries: u32,
        last_status: ChangeTokenStatus,
    },

    #[error(transparent)]
    Status(#[from] WafError),
}

/// Doubling, clamped to `max`.
pub fn next_interval(interval: Duration, max: Duration) -> Duration {
    interval.saturating_add(interval).min(max)
}

/// Returns the number of status checks it took to reach INSYNC.
pub async fn wait_for_sync<W: WafApi>(
    waf: &W,
    change_token: &str,
    policy: &WaitPolicy,
) -> Result<u32, WaitError> {
    let mut retry: u32 = 0;
    let mut interval = policy.initial_interval;
    loop {
        let status = waf.get_change_token_status(change_token).await?;
        if status.is_terminal() {
            return Ok(retry + 1);
        }
        if retry >= policy.max_retries {
            warn!(
                "Max retries ({}) reached for change token {}; current status: {}",
                policy.max_retries, change_token, status
            );
            return Err(WaitError::Timeout {
                max_retries: policy.max_retries,
                last_status: status,
            });
        }
        info!(
            "Not done, current status is: {}. Waiting {:?} before retrying.",
            status, interval
        );
        tokio::time::sleep(interval).await;
        retry += 1;
        interval = next_interval(interval, policy.max_interval);
    }
}
