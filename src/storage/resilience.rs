//! Transient-failure handling for storage calls.
//!
//! The facade gives every backend call exactly one retry on transient
//! failures (`BackendUnavailable`, `BackendTimeout`); every other error kind
//! passes through untouched.

use crate::Result;

/// Runs `call`, retrying once if it fails transiently.
///
/// # Errors
///
/// Returns the second failure unchanged if the retry also fails, or the
/// first failure if it was not transient.
pub fn retry_once<T>(operation: &str, call: impl Fn() -> Result<T>) -> Result<T> {
    match call() {
        Ok(value) => Ok(value),
        Err(err) if err.is_transient() => {
            tracing::warn!(operation, error = %err, "transient backend failure, retrying once");
            metrics::counter!("memorygraph_backend_retry_total").increment(1);
            call()
        },
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_success_passes_through() {
        let calls = AtomicU32::new(0);
        let result = retry_once("op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_failure_retried_once() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_once("op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::BackendUnavailable {
                operation: "op".to_string(),
                cause: "locked".to_string(),
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let result = retry_once("op", || {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(Error::BackendTimeout {
                    operation: "op".to_string(),
                })
            } else {
                Ok("recovered")
            }
        });
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_non_transient_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry_once("op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::NotFound("memory x".to_string()))
        });
        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
