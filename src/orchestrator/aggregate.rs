//! Core pipeline: concurrent connector fan-out, dedup, score, rank.
//!
//! One [`Aggregator::run`] call is one run of the pipeline for an immutable
//! [`QueryContext`]. Connector failures are isolated: they are logged, fed to
//! the circuit breaker and otherwise treated as zero candidates.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::{CacheKey, ResultCache};
use crate::circuit_breaker::{CircuitBreaker, ProviderStatus};
use crate::config::{ScoringConfig, SearchConfig};
use crate::connector::ImageConnector;
use crate::connectors::build_connectors;
use crate::error::SearchError;
use crate::query::QueryContext;
use crate::types::{Provider, ScoredCandidate};

use super::dedup::deduplicate;
use super::scoring::score_candidates;

/// Runs the aggregate-dedup-score-rank pipeline over a fixed connector set.
pub struct Aggregator {
    connectors: Vec<Arc<dyn ImageConnector>>,
    scoring: ScoringConfig,
    timeout: Duration,
    cache: Option<ResultCache>,
    breaker: Mutex<CircuitBreaker>,
}

impl Aggregator {
    /// Create an aggregator over `connectors`, in registration order.
    pub fn new(connectors: Vec<Arc<dyn ImageConnector>>, config: &SearchConfig) -> Self {
        Self {
            connectors,
            scoring: config.scoring.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
            cache: ResultCache::new(config.cache_ttl_seconds),
            breaker: Mutex::new(CircuitBreaker::new(config.circuit_breaker.clone())),
        }
    }

    /// Validate `config` and build the standard connector set from it.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] for an invalid config or
    /// [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        config.validate()?;
        Ok(Self::new(build_connectors(config)?, config))
    }

    /// Providers of the registered connectors, in registration order.
    pub fn providers(&self) -> Vec<Provider> {
        self.connectors.iter().map(|c| c.provider()).collect()
    }

    /// Circuit breaker state of every provider seen so far.
    pub fn health_report(&self) -> Vec<ProviderStatus> {
        self.breaker().health_report()
    }

    /// Run the pipeline for `context`.
    ///
    /// # Pipeline
    ///
    /// 1. Select the registered connectors whose provider is enabled
    /// 2. Return a cached ranking if one is still fresh
    /// 3. Skip connectors whose circuit is open
    /// 4. Fan out with [`futures::future::join_all`], each call bounded by
    ///    [`tokio::time::timeout`]
    /// 5. Concatenate successful lists in registration order
    /// 6. Deduplicate by canonical key, first occurrence wins
    /// 7. Score, stable-sort descending, truncate to `context.limit`
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::AllConnectorsFailed`] only if at least one
    /// connector was queried and every queried connector failed. A
    /// successful empty answer counts as success, and a run whose
    /// connectors were all skipped by the breaker yields an empty list.
    pub async fn run(&self, context: &QueryContext) -> Result<Vec<ScoredCandidate>, SearchError> {
        let enabled: Vec<&Arc<dyn ImageConnector>> = self
            .connectors
            .iter()
            .filter(|c| context.providers.contains(&c.provider()))
            .collect();
        if enabled.is_empty() || context.is_empty() {
            tracing::debug!("no enabled connectors or empty query; nothing to search");
            return Ok(Vec::new());
        }

        let cache_key = CacheKey::for_context(context);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&cache_key).await {
                tracing::debug!(count = hit.len(), "result cache hit");
                return Ok(hit);
            }
        }

        let (attempted, skipped): (Vec<_>, Vec<_>) = {
            let mut breaker = self.breaker();
            enabled
                .into_iter()
                .partition(|c| breaker.should_attempt(c.provider()))
        };
        for connector in &skipped {
            tracing::debug!(provider = %connector.provider(), "circuit open; skipping connector");
        }
        if attempted.is_empty() {
            tracing::debug!("every enabled connector skipped by the breaker");
            return Ok(Vec::new());
        }
        let pending = PendingAttempts {
            breaker: &self.breaker,
            providers: attempted.iter().map(|c| c.provider()).collect(),
        };

        let query = context.search_text();
        tracing::trace!(query, connectors = attempted.len(), "fanning out");
        let futures: Vec<_> = attempted
            .iter()
            .map(|connector| async move {
                let provider = connector.provider();
                let outcome = match tokio::time::timeout(self.timeout, connector.fetch(query)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(SearchError::Timeout(format!(
                        "{provider} did not answer within {}s",
                        self.timeout.as_secs()
                    ))),
                };
                (provider, outcome)
            })
            .collect();
        let outcomes = futures::future::join_all(futures).await;

        let mut candidates = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut succeeded = 0usize;
        {
            let mut breaker = pending.settle();
            for (provider, outcome) in outcomes {
                match outcome {
                    Ok(list) => {
                        tracing::debug!(%provider, count = list.len(), "connector returned candidates");
                        breaker.record_success(provider);
                        succeeded += 1;
                        candidates.extend(list);
                    }
                    Err(err) => {
                        tracing::warn!(%provider, error = %err, "connector failed");
                        breaker.record_failure(provider);
                        errors.push(format!("{provider}: {err}"));
                    }
                }
            }
        }

        if succeeded == 0 {
            errors.extend(
                skipped
                    .iter()
                    .map(|c| format!("{}: circuit open", c.provider())),
            );
            return Err(SearchError::AllConnectorsFailed(errors.join("; ")));
        }

        let deduped = deduplicate(candidates);
        let mut ranked = score_candidates(deduped, context, &self.scoring);
        // `sort_by` is stable, so equal scores keep first-seen order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(context.limit);
        tracing::debug!(count = ranked.len(), "run ranked");

        if let Some(cache) = &self.cache {
            cache.insert(cache_key, ranked.clone()).await;
        }
        Ok(ranked)
    }

    fn breaker(&self) -> MutexGuard<'_, CircuitBreaker> {
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Attempts admitted by the breaker whose outcome is not recorded yet.
///
/// Dropping a run mid fan-out drops this too, and every admitted provider is
/// released so a half-open circuit can be tried again on the next run.
struct PendingAttempts<'a> {
    breaker: &'a Mutex<CircuitBreaker>,
    providers: Vec<Provider>,
}

impl<'a> PendingAttempts<'a> {
    /// Disarm and hand back the breaker for recording outcomes.
    fn settle(mut self) -> MutexGuard<'a, CircuitBreaker> {
        self.providers.clear();
        self.breaker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for PendingAttempts<'_> {
    fn drop(&mut self) {
        if self.providers.is_empty() {
            return;
        }
        let mut breaker = self.breaker.lock().unwrap_or_else(PoisonError::into_inner);
        for provider in self.providers.drain(..) {
            tracing::debug!(%provider, "run dropped before recording; releasing attempt");
            breaker.release(provider);
        }
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("providers", &self.providers())
            .field("timeout", &self.timeout)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::{CircuitBreakerConfig, CircuitState};
    use crate::types::Candidate;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockConnector {
        provider: Provider,
        outcome: Result<Vec<Candidate>, SearchError>,
        delay: Option<Duration>,
        calls: AtomicUsize,
    }

    impl MockConnector {
        fn ok(provider: Provider, candidates: Vec<Candidate>) -> Arc<Self> {
            Arc::new(Self {
                provider,
                outcome: Ok(candidates),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(provider: Provider, message: &str) -> Arc<Self> {
            Arc::new(Self {
                provider,
                outcome: Err(SearchError::Http(message.into())),
                delay: None,
                calls: AtomicUsize::new(0),
            })
        }

        fn slow(provider: Provider, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                provider,
                outcome: Ok(vec![candidate(provider, "slow", "slow")]),
                delay: Some(delay),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageConnector for MockConnector {
        async fn fetch(&self, _query: &str) -> Result<Vec<Candidate>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.outcome.clone()
        }

        fn provider(&self) -> Provider {
            self.provider
        }
    }

    fn candidate(provider: Provider, id: &str, title: &str) -> Candidate {
        let mut c = Candidate::new(provider, id);
        c.title = Some(title.into());
        c.image_url = Some(format!("https://img.example/{}/{id}.jpg", provider.tag()));
        c
    }

    fn config() -> SearchConfig {
        SearchConfig {
            cache_ttl_seconds: 0,
            timeout_seconds: 2,
            ..Default::default()
        }
    }

    fn context(query: &str, limit: usize) -> QueryContext {
        QueryContext::parse(query, Provider::all(), limit)
    }

    fn aggregator(connectors: Vec<Arc<dyn ImageConnector>>) -> Aggregator {
        Aggregator::new(connectors, &config())
    }

    #[tokio::test]
    async fn no_enabled_connectors_is_empty_ok() {
        let agg = aggregator(vec![MockConnector::failing(Provider::Pexels, "boom")]);
        let ctx = QueryContext::parse("paris", &[Provider::Unsplash], 12);
        assert!(agg.run(&ctx).await.expect("ok").is_empty());
    }

    #[tokio::test]
    async fn disabled_connectors_are_not_called() {
        let pexels = MockConnector::ok(Provider::Pexels, vec![]);
        let agg = aggregator(vec![pexels.clone()]);
        let ctx = QueryContext::parse("paris", &[Provider::Unsplash], 12);
        agg.run(&ctx).await.expect("ok");
        assert_eq!(pexels.calls(), 0);
    }

    #[tokio::test]
    async fn all_failures_are_reported_together() {
        let agg = aggregator(vec![
            MockConnector::failing(Provider::Unsplash, "401"),
            MockConnector::failing(Provider::Pexels, "500"),
        ]);
        let err = agg.run(&context("paris", 12)).await.unwrap_err();
        let SearchError::AllConnectorsFailed(message) = err else {
            panic!("expected AllConnectorsFailed");
        };
        assert!(message.contains("Unsplash"));
        assert!(message.contains("Pexels"));
    }

    #[tokio::test]
    async fn partial_failure_keeps_successful_results() {
        let agg = aggregator(vec![
            MockConnector::failing(Provider::Unsplash, "401"),
            MockConnector::ok(Provider::Pexels, vec![candidate(Provider::Pexels, "1", "paris")]),
        ]);
        let results = agg.run(&context("paris", 12)).await.expect("ok");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate.id, "pexels:1");
    }

    #[tokio::test]
    async fn failure_plus_empty_success_is_ok() {
        let agg = aggregator(vec![
            MockConnector::failing(Provider::Unsplash, "401"),
            MockConnector::ok(Provider::Pexels, vec![]),
        ]);
        assert!(agg.run(&context("paris", 12)).await.expect("ok").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_connector_times_out_without_blocking_others() {
        let slow = MockConnector::slow(Provider::Wikimedia, Duration::from_secs(60));
        let agg = aggregator(vec![
            slow.clone(),
            MockConnector::ok(Provider::Openverse, vec![candidate(Provider::Openverse, "1", "paris")]),
        ]);
        let results = agg.run(&context("paris", 12)).await.expect("ok");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate.source, Provider::Openverse);
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn lone_timeout_is_all_failed() {
        let agg = aggregator(vec![MockConnector::slow(
            Provider::Wikimedia,
            Duration::from_secs(60),
        )]);
        let err = agg.run(&context("paris", 12)).await.unwrap_err();
        assert!(err.to_string().contains("did not answer"));
    }

    #[tokio::test]
    async fn ties_keep_registration_order_and_limit_applies() {
        let same = |p: Provider, id: &str| candidate(p, id, "untitled");
        let agg = aggregator(vec![
            MockConnector::ok(Provider::Pexels, vec![same(Provider::Pexels, "a"), same(Provider::Pexels, "b")]),
            MockConnector::ok(Provider::Pexels, vec![same(Provider::Pexels, "c")]),
        ]);
        let results = agg.run(&context("zzz", 2)).await.expect("ok");
        let ids: Vec<&str> = results.iter().map(|r| r.candidate.id.as_str()).collect();
        assert_eq!(ids, vec!["pexels:a", "pexels:b"]);
    }

    #[tokio::test]
    async fn results_sorted_by_score_descending() {
        let agg = aggregator(vec![MockConnector::ok(
            Provider::Pixabay,
            vec![
                candidate(Provider::Pixabay, "1", "street market"),
                candidate(Provider::Pixabay, "2", "paris eiffel tower"),
                candidate(Provider::Pixabay, "3", "paris"),
            ],
        )]);
        let results = agg.run(&context("Paris, eiffel tower", 12)).await.expect("ok");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(results[0].candidate.id, "pixabay:2");
    }

    #[tokio::test]
    async fn duplicates_across_connectors_collapse() {
        let mut dup = candidate(Provider::Openverse, "x", "paris");
        dup.image_url = Some("https://img.example/pexels/1.jpg?utm_source=openverse".into());
        let agg = aggregator(vec![
            MockConnector::ok(Provider::Pexels, vec![candidate(Provider::Pexels, "1", "paris")]),
            MockConnector::ok(Provider::Openverse, vec![dup]),
        ]);
        let results = agg.run(&context("paris", 12)).await.expect("ok");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate.source, Provider::Pexels);
    }

    #[tokio::test]
    async fn cache_serves_repeat_queries() {
        let pexels = MockConnector::ok(Provider::Pexels, vec![candidate(Provider::Pexels, "1", "paris")]);
        let agg = Aggregator::new(
            vec![pexels.clone()],
            &SearchConfig {
                cache_ttl_seconds: 60,
                ..config()
            },
        );
        let first = agg.run(&context("Paris", 12)).await.expect("ok");
        let second = agg.run(&context("  paris ", 12)).await.expect("ok");
        assert_eq!(first, second);
        assert_eq!(pexels.calls(), 1);
    }

    #[tokio::test]
    async fn open_circuit_skips_connector() {
        let failing = MockConnector::failing(Provider::Unsplash, "503");
        let agg = Aggregator::new(
            vec![failing.clone()],
            &SearchConfig {
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: 1,
                    cooldown_secs: 600,
                },
                ..config()
            },
        );

        assert!(agg.run(&context("paris", 12)).await.is_err());
        let skipped = agg.run(&context("paris", 12)).await.expect("skips are not failures");
        assert!(skipped.is_empty());
        assert_eq!(failing.calls(), 1);
        assert_eq!(agg.health_report()[0].state, CircuitState::Open);
    }

    #[tokio::test]
    async fn skipped_and_failed_reports_both() {
        let tripped = MockConnector::failing(Provider::Unsplash, "503");
        let failing = MockConnector::failing(Provider::Pexels, "500");
        let agg = Aggregator::new(
            vec![tripped.clone(), failing.clone()],
            &SearchConfig {
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: 1,
                    cooldown_secs: 600,
                },
                ..config()
            },
        );
        agg.breaker().record_failure(Provider::Unsplash);

        let err = agg.run(&context("paris", 12)).await.unwrap_err();
        let SearchError::AllConnectorsFailed(message) = err else {
            panic!("expected AllConnectorsFailed");
        };
        assert!(message.contains("Pexels: "));
        assert!(message.contains("Unsplash: circuit open"));
        assert_eq!(tripped.calls(), 0);
        assert_eq!(failing.calls(), 1);
    }

    fn half_open_aggregator(connector: Arc<MockConnector>) -> Aggregator {
        let agg = Aggregator::new(
            vec![connector.clone()],
            &SearchConfig {
                circuit_breaker: CircuitBreakerConfig {
                    failure_threshold: 1,
                    cooldown_secs: 0,
                },
                ..config()
            },
        );
        agg.breaker().record_failure(connector.provider);
        agg
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_run_releases_half_open_attempt() {
        let slow = MockConnector::slow(Provider::Openverse, Duration::from_millis(500));
        let agg = half_open_aggregator(slow.clone());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), agg.run(&context("paris", 12))).await;
        assert!(abandoned.is_err(), "run should have been cut off");
        assert_eq!(slow.calls(), 1);

        tokio::time::sleep(Duration::from_secs(3600)).await;
        let results = agg.run(&context("paris", 12)).await.expect("retried");
        assert_eq!(results.len(), 1);
        assert_eq!(slow.calls(), 2);
        assert_eq!(agg.health_report()[0].state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_run_during_half_open_attempt_is_not_an_error() {
        let slow = MockConnector::slow(Provider::Openverse, Duration::from_millis(500));
        let agg = half_open_aggregator(slow.clone());

        let first_ctx = context("paris", 12);
        let second_ctx = context("paris, louvre", 12);
        let (first, second) = tokio::join!(agg.run(&first_ctx), agg.run(&second_ctx));
        assert_eq!(first.expect("attempted run").len(), 1);
        assert!(second.expect("overlapping run").is_empty());
        assert_eq!(slow.calls(), 1);
    }

    #[tokio::test]
    async fn empty_query_is_not_searched() {
        let pexels = MockConnector::ok(Provider::Pexels, vec![]);
        let agg = aggregator(vec![pexels.clone()]);
        assert!(agg.run(&context("   ", 12)).await.expect("ok").is_empty());
        assert_eq!(pexels.calls(), 0);
    }

    #[test]
    fn from_config_rejects_invalid_config() {
        let config = SearchConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(
            Aggregator::from_config(&config),
            Err(SearchError::Config(_))
        ));
    }
}
