//! Per-provider circuit breaker.
//!
//! A provider that keeps failing is skipped for a cooldown period instead of
//! being asked again on every keystroke-driven run. After the cooldown one
//! probe request is let through; its outcome closes or re-opens the circuit.
//!
//! ```text
//! ┌────────┐  N failures   ┌────────┐  cooldown   ┌──────────┐
//! │ Closed ├──────────────►│  Open  ├────────────►│ HalfOpen │
//! └───▲────┘               └───▲────┘             └────┬─────┘
//!     │        success         │       failure         │
//!     └────────────────────────┴───────────────────────┘
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::types::Provider;

/// Circuit state for a single provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Healthy; every run queries the provider.
    Closed,
    /// Tripped; the provider is skipped until the cooldown expires.
    Open,
    /// Cooldown expired; a single probe decides the next state.
    HalfOpen,
}

/// Circuit breaker tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the circuit.
    pub failure_threshold: u32,
    /// Seconds a tripped provider stays skipped.
    pub cooldown_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
struct ProviderHealth {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

/// Health snapshot for one provider, as reported by [`CircuitBreaker::health_report`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStatus {
    /// Provider this snapshot describes.
    pub provider: Provider,
    /// Current circuit state.
    pub state: CircuitState,
    /// Failures since the last success.
    pub consecutive_failures: u32,
}

/// Tracks provider health and decides whether a provider is queried.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    providers: HashMap<Provider, ProviderHealth>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            providers: HashMap::new(),
        }
    }

    /// Decide whether `provider` should be queried in the current run.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and
    /// admits exactly one attempt until it is recorded or released.
    pub fn should_attempt(&mut self, provider: Provider) -> bool {
        let cooldown = Duration::from_secs(self.config.cooldown_secs);
        let health = self.providers.entry(provider).or_default();

        match health.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let expired = health.opened_at.is_none_or(|t| t.elapsed() >= cooldown);
                if expired {
                    health.state = CircuitState::HalfOpen;
                    health.probe_in_flight = true;
                }
                expired
            }
            CircuitState::HalfOpen => {
                if health.probe_in_flight {
                    false
                } else {
                    health.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Record a successful fetch; closes the circuit.
    pub fn record_success(&mut self, provider: Provider) {
        let health = self.providers.entry(provider).or_default();
        *health = ProviderHealth::default();
    }

    /// Record a failed fetch; trips the circuit at the threshold or on a failed probe.
    pub fn record_failure(&mut self, provider: Provider) {
        let threshold = self.config.failure_threshold;
        let health = self.providers.entry(provider).or_default();
        health.consecutive_failures = health.consecutive_failures.saturating_add(1);
        health.probe_in_flight = false;

        if health.state == CircuitState::HalfOpen || health.consecutive_failures >= threshold {
            health.state = CircuitState::Open;
            health.opened_at = Some(Instant::now());
        }
    }

    /// Give back an admitted attempt that ended without an outcome.
    ///
    /// A half-open provider becomes eligible for a new attempt; other states
    /// are left alone.
    pub fn release(&mut self, provider: Provider) {
        if let Some(health) = self.providers.get_mut(&provider) {
            if health.state == CircuitState::HalfOpen {
                health.probe_in_flight = false;
            }
        }
    }

    /// Current state for `provider`; unseen providers are closed.
    pub fn status(&self, provider: Provider) -> CircuitState {
        self.providers
            .get(&provider)
            .map_or(CircuitState::Closed, |h| h.state)
    }

    /// Snapshot of every provider the breaker has seen, ordered by provider.
    pub fn health_report(&self) -> Vec<ProviderStatus> {
        let mut report: Vec<ProviderStatus> = self
            .providers
            .iter()
            .map(|(provider, health)| ProviderStatus {
                provider: *provider,
                state: health.state,
                consecutive_failures: health.consecutive_failures,
            })
            .collect();
        report.sort_by_key(|s| s.provider);
        report
    }

    /// Forget all tracked health.
    pub fn reset(&mut self) {
        self.providers.clear();
    }
}
