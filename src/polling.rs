//! Polling policy for long-running remote operations, plus cancellation-aware
//! helpers used at every suspension point.

use std::future::Future;

use tokio::time::{Duration, sleep};
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;

/// How often to poll an operation handle and when to give up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` polls until the operation reports completion.
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Whether another poll may be issued after `attempts` polls already made.
    pub fn allows(&self, attempts: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempts < max,
            None => true,
        }
    }
}

/// Runs `future` unless `cancel` fires first.
pub async fn cancellable<F, T>(cancel: &CancellationToken, future: F) -> Result<T, GenerationError>
where
    F: Future<Output = Result<T, GenerationError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        result = future => result,
    }
}

/// Sleeps for `interval`, returning early with `Cancelled` if `cancel` fires.
pub async fn pause(cancel: &CancellationToken, interval: Duration) -> Result<(), GenerationError> {
    cancellable(cancel, async {
        sleep(interval).await;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_unbounded() {
        let policy = PollPolicy::default();
        assert_eq!(policy.interval, Duration::from_secs(5));
        assert!(policy.allows(0));
        assert!(policy.allows(u32::MAX - 1));
    }

    #[test]
    fn test_bounded_policy() {
        let policy = PollPolicy::new(Duration::from_millis(1), Some(3));
        assert!(policy.allows(0));
        assert!(policy.allows(2));
        assert!(!policy.allows(3));
    }

    #[test]
    fn test_zero_attempts_never_polls() {
        let policy = PollPolicy::new(Duration::from_millis(1), Some(0));
        assert!(!policy.allows(0));
    }

    #[tokio::test]
    async fn test_pause_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = pause(&cancel, Duration::from_secs(60)).await;
        assert!(matches!(result, Err(GenerationError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancellable_passes_result_through() {
        let cancel = CancellationToken::new();
        let result = cancellable(&cancel, async { Ok::<_, GenerationError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
