//! Connection gate: wait until a store accepts connections.
//!
//! The gate probes a store, and on failure sleeps a fixed delay and probes
//! again. With the default settings there is no attempt bound, so a store
//! that never comes up blocks the run indefinitely; supervise the process
//! externally or set [`GateConfig::max_attempts`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::{MigrateError, Result};
use crate::events::{EventSink, PipelineEvent};

/// Retry settings for the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Sleep between failed attempts.
    pub retry_delay: Duration,
    /// Give up after this many attempts; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl From<&RetryConfig> for GateConfig {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            retry_delay: Duration::from_secs(cfg.delay_secs),
            max_attempts: cfg.max_attempts,
        }
    }
}

/// Blocking readiness check shared by both stores.
pub struct ConnectionGate {
    config: GateConfig,
    events: Arc<dyn EventSink>,
}

impl ConnectionGate {
    pub fn new(config: GateConfig, events: Arc<dyn EventSink>) -> Self {
        Self { config, events }
    }

    /// Probe `store` until it succeeds, returning the number of attempts made.
    ///
    /// `probe` must open a connection and release it. Every failure is
    /// reported as a `StoreUnavailable` event. Only a bounded gate can fail,
    /// with [`MigrateError::Connectivity`].
    pub async fn wait_until_ready<F, Fut>(&self, store: &str, mut probe: F) -> Result<u32>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match probe().await {
                Ok(()) => {
                    self.events.emit(&PipelineEvent::StoreReady {
                        store: store.to_string(),
                        attempts: attempt,
                    });
                    return Ok(attempt);
                }
                Err(e) => {
                    self.events.emit(&PipelineEvent::StoreUnavailable {
                        store: store.to_string(),
                        attempt,
                        error: e.to_string(),
                    });

                    if let Some(max) = self.config.max_attempts {
                        if attempt >= max {
                            return Err(MigrateError::Connectivity {
                                store: store.to_string(),
                                attempts: attempt,
                                message: e.to_string(),
                            });
                        }
                    }

                    tokio::time::sleep(self.config.retry_delay).await;
                }
            }
        }
    }
}
