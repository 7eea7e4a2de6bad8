//! Backend health probing.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::Result;
use crate::storage::MemoryOperations;

/// Result of a health probe.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Whether the probe completed in time and without error.
    pub healthy: bool,
    /// Backend name.
    pub backend: String,
    /// Probe latency.
    pub latency_ms: u64,
    /// Memory count, when the probe succeeded.
    pub memory_count: Option<u64>,
    /// Failure detail, when it did not.
    pub error: Option<String>,
}

/// Probes the backend: healthy iff a `count(nodes)` completes within the
/// deadline. The probe runs on its own thread so a wedged backend cannot
/// hang the caller past the timeout.
#[must_use]
pub fn check_health(backend: &Arc<dyn MemoryOperations>, timeout: Duration) -> HealthStatus {
    let name = backend.backend_name().to_string();
    let started = Instant::now();

    let (sender, receiver) = mpsc::channel::<Result<u64>>();
    let probe_backend = Arc::clone(backend);
    std::thread::spawn(move || {
        let _ = sender.send(probe_backend.count_memories());
    });

    let outcome = receiver.recv_timeout(timeout);
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    match outcome {
        Ok(Ok(count)) => HealthStatus {
            healthy: true,
            backend: name,
            latency_ms,
            memory_count: Some(count),
            error: None,
        },
        Ok(Err(err)) => HealthStatus {
            healthy: false,
            backend: name,
            latency_ms,
            memory_count: None,
            error: Some(err.to_string()),
        },
        Err(_) => HealthStatus {
            healthy: false,
            backend: name,
            latency_ms,
            memory_count: None,
            error: Some(format!("health probe timed out after {timeout:?}")),
        },
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::storage::SqliteBackend;

    #[test]
    fn test_healthy_backend() {
        let backend: Arc<dyn MemoryOperations> = Arc::new(SqliteBackend::in_memory().unwrap());
        let status = check_health(&backend, Duration::from_secs(5));
        assert!(status.healthy);
        assert_eq!(status.backend, "sqlite");
        assert_eq!(status.memory_count, Some(0));
        assert!(status.error.is_none());
    }
}
