//! Waiting for a mock server to report ready.

use crate::error::{CallError, Result};
use crate::server::MockServer;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How long to wait for readiness, and how often to probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for StartupPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Probe `server` at a fixed interval until it is ready or `policy.timeout`
/// elapses. On timeout the last probe failure is returned.
pub async fn wait_until_ready(server: &dyn MockServer, policy: StartupPolicy) -> Result<()> {
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let failure = match server.check_ready().await {
            Ok(()) => {
                debug!(attempts, "Mock server ready");
                return Ok(());
            }
            Err(failure) => failure,
        };

        warn!(error = %failure, attempts, "Starting mock server, readiness check failed");

        let waited = started.elapsed();
        if waited >= policy.timeout {
            return Err(CallError::LivenessTimeout {
                waited,
                last_failure: failure,
            });
        }
        tokio::time::sleep(policy.poll_interval.min(policy.timeout - waited)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubMapping;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` probes.
    struct SlowStart {
        failures: u32,
        probes: AtomicU32,
    }

    #[async_trait]
    impl MockServer for SlowStart {
        async fn register_stub(&self, _stub: StubMapping) {}

        async fn check_ready(&self) -> std::result::Result<(), String> {
            let probe = self.probes.fetch_add(1, Ordering::SeqCst);
            if probe < self.failures {
                Err(format!("connection refused (probe {probe})"))
            } else {
                Ok(())
            }
        }
    }

    fn policy(timeout_ms: u64) -> StartupPolicy {
        StartupPolicy {
            timeout: Duration::from_millis(timeout_ms),
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_ready_after_retries() {
        let server = SlowStart {
            failures: 3,
            probes: AtomicU32::new(0),
        };
        wait_until_ready(&server, policy(2_000)).await.unwrap();
        assert_eq!(server.probes.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_timeout_reports_last_failure() {
        let server = SlowStart {
            failures: u32::MAX,
            probes: AtomicU32::new(0),
        };
        let err = wait_until_ready(&server, policy(50)).await.unwrap_err();
        match err {
            CallError::LivenessTimeout {
                waited,
                last_failure,
            } => {
                assert!(waited >= Duration::from_millis(50));
                let probes = server.probes.load(Ordering::SeqCst);
                assert_eq!(
                    last_failure,
                    format!("connection refused (probe {})", probes - 1)
                );
            }
            other => panic!("Expected LivenessTimeout, got {other:?}"),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = StartupPolicy::default();
        assert_eq!(policy.timeout, Duration::from_secs(5));
        assert!(policy.poll_interval < policy.timeout);
    }
}
