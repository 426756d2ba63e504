//! Exponential backoff for throttled provider calls

use crate::error::{CloudError, Result};
use crate::provider::RetryConfig;
use std::future::Future;
use tokio::time::sleep;

/// Run `call` until it succeeds, fails with a non-throttling error, or the
/// attempt budget is exhausted
///
/// Only `CloudError::Throttled` is retried. The error surfaced after the last
/// attempt carries the total number of attempts.
pub async fn with_backoff<T, F, Fut>(config: &RetryConfig, operation: &str, mut call: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 0..max_attempts {
        match call().await {
            Err(CloudError::Throttled { message, .. }) => {
                if attempt + 1 >= max_attempts {
                    return Err(CloudError::Throttled {
                        operation: operation.to_string(),
                        attempts: max_attempts,
                        message,
                    });
                }

                let delay = config.delay_for_attempt(attempt);
                tracing::warn!(
                    operation,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "throttled, backing off"
                );
                sleep(delay).await;
            }
            other => return other,
        }
    }

    // max_attempts >= 1 なのでループ内で必ず return する
    Err(CloudError::Throttled {
        operation: operation.to_string(),
        attempts: max_attempts,
        message: "retry budget exhausted".to_string(),
    })
}
