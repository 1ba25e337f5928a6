use crate::error::StageOutcome;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Uniform per-stage retry policy: up to `max_attempts` tries with a fixed
/// delay in between, applied by the coordinator around each stage.
///
/// Only `Failed` outcomes are retried; `Success` and `Empty` return
/// immediately (an empty input will not get less empty by trying again).
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub async fn run<T, F, Fut>(&self, stage: &str, mut op: F) -> StageOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StageOutcome<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                StageOutcome::Failed(e) if attempt < self.max_attempts => {
                    warn!(stage, attempt, error = %e, delay = ?self.delay, "Stage failed, retrying");
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                StageOutcome::Failed(e) => {
                    warn!(stage, attempts = attempt, error = %e, "Stage failed, retries exhausted");
                    return StageOutcome::Failed(e);
                }
                outcome => return outcome,
            }
        }
    }
}
