//! Bounded retry.

use std::future::Future;

/// Why [`retry_bounded`] gave up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryFailure<E> {
    /// Attempts made, including the last one.
    pub attempts: u32,
    pub error: E,
}

/// Run `op` until it succeeds, fails with an error `is_retryable` rejects,
/// or `max_attempts` attempts have been made. Retries are immediate.
///
/// `op` receives the 1-based attempt number. A `max_attempts` of zero still
/// makes one attempt.
pub async fn retry_bounded<T, E, F, Fut, P>(
    max_attempts: u32,
    is_retryable: P,
    mut op: F,
) -> Result<T, RetryFailure<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && is_retryable(&error) => attempt += 1,
            Err(error) => {
                return Err(RetryFailure {
                    attempts: attempt,
                    error,
                })
            }
        }
    }
}
