//! # cityscope
//!
//! Concurrent multi-provider image search for city photography.
//!
//! A query such as `"Paris, eiffel tower"` is sent to several public image
//! APIs at once (Unsplash, Pexels, Pixabay, Openverse, Wikimedia Commons).
//! Their answers are normalised into a common [`Candidate`] shape, merged,
//! deduplicated by canonical URL, scored against the query and trimmed to the
//! top K.
//!
//! ## Design
//!
//! - One [`ImageConnector`] per provider, registered into a fixed list
//! - Connectors are queried concurrently; a failing or slow provider never
//!   blocks or fails the others
//! - Ranking is a weighted sum of keyword, city, resolution, license, source
//!   and exact-phrase signals, with weights in [`config::ScoringConfig`]
//! - [`QueryController`] assigns every input change a generation and only
//!   publishes the outcome of the newest run
//! - In-memory result cache with configurable TTL and a per-provider
//!   circuit breaker
//!
//! ## Security
//!
//! - API keys come from the environment or the config file and never appear
//!   in logs, `Debug` output or error messages
//! - Search queries are logged only at trace level

pub mod cache;
pub mod circuit_breaker;
pub mod config;
pub mod connector;
pub mod connectors;
pub mod controller;
pub mod error;
pub mod host;
pub mod http;
pub mod orchestrator;
pub mod query;
pub mod types;

pub use config::SearchConfig;
pub use connector::ImageConnector;
pub use controller::{QueryController, SearchState};
pub use error::{Result, SearchError};
pub use orchestrator::aggregate::Aggregator;
pub use query::QueryContext;
pub use types::{Candidate, License, Provider, ScoredCandidate};

/// Search every configured provider once and return the ranked top results.
///
/// Builds the connectors from `config`, runs a single pipeline pass for
/// `query` with `config.providers` and `config.max_results`, and returns
/// at most `config.max_results` candidates.
///
/// # Errors
///
/// Returns [`SearchError::Config`] for an invalid config and
/// [`SearchError::AllConnectorsFailed`] if every enabled provider fails.
/// Individual provider failures are logged and otherwise ignored.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> cityscope::Result<()> {
/// let config = cityscope::SearchConfig::default().with_env_keys();
/// let results = cityscope::search("Lisbon, tram", &config).await?;
/// for r in &results {
///     println!("{:.3} {:?}", r.score, r.candidate.title);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search(query: &str, config: &SearchConfig) -> Result<Vec<ScoredCandidate>> {
    let aggregator = Aggregator::from_config(config)?;
    let context = QueryContext::parse(query, &config.providers, config.max_results);
    aggregator.run(&context).await
}
