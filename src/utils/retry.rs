use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::AttendanceError;

/// Bounded retry for store writes. Only `TransientStoreError` is retried;
/// everything else is returned on the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Delay before the first retry, doubled for each following one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    fn delay(&self, retry: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << retry.saturating_sub(1).min(16))
    }
}

pub async fn retry_transient<T, F, Fut>(
    policy: RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, AttendanceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AttendanceError>>,
{
    let mut retry = 0;
    loop {
        match op().await {
            Err(e) if e.is_transient() && retry < policy.retries => {
                retry += 1;
                let delay = policy.delay(retry);
                warn!(error = %e, operation, retry, delay_ms = delay.as_millis() as u64, "Store write failed, retrying");
                actix_web::rt::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick() -> RetryPolicy {
        RetryPolicy {
            retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    #[actix_web::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = Cell::new(0);
        let result = retry_transient(quick(), "test", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(AttendanceError::TransientStoreError("down".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[actix_web::test]
    async fn gives_up_after_the_configured_retries() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient(quick(), "test", || {
            calls.set(calls.get() + 1);
            async { Err(AttendanceError::TransientStoreError("down".into())) }
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.get(), 3);
    }

    #[actix_web::test]
    async fn sequencing_errors_are_never_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = retry_transient(quick(), "test", || {
            calls.set(calls.get() + 1);
            async { Err(AttendanceError::not_found("event")) }
        })
        .await;

        assert_eq!(result.unwrap_err().code(), "not_found");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            retries: 3,
            backoff: Duration::from_millis(10),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(10));
        assert_eq!(policy.delay(2), Duration::from_millis(20));
        assert_eq!(policy.delay(3), Duration::from_millis(40));
    }
}
