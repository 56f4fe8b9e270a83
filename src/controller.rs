//! Query controller: turns input events into runs and publishes their state.
//!
//! Every query or settings change bumps a generation counter and starts a run
//! on the tokio runtime. When a run finishes it publishes its outcome only if
//! its generation is still the current one, so a slow run for an old query
//! can never overwrite the results of a newer one.
//!
//! Renderers observe [`SearchState`] snapshots through a
//! [`tokio::sync::watch`] channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Serialize, Serializer};
use tokio::sync::watch;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::orchestrator::aggregate::Aggregator;
use crate::query::QueryContext;
use crate::types::{Provider, ScoredCandidate};

/// Published search state.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchState {
    /// No query entered.
    #[default]
    Idle,
    /// A run is in flight. `results` holds the previously settled list.
    Running {
        generation: u64,
        results: Vec<ScoredCandidate>,
    },
    /// The run for `generation` finished.
    ///
    /// When every connector failed, `error` is set and `results` keeps the
    /// list that was shown before the run.
    Settled {
        generation: u64,
        results: Vec<ScoredCandidate>,
        #[serde(serialize_with = "serialize_error")]
        error: Option<SearchError>,
    },
}

impl SearchState {
    /// Results a renderer should currently show.
    pub fn results(&self) -> &[ScoredCandidate] {
        match self {
            Self::Idle => &[],
            Self::Running { results, .. } | Self::Settled { results, .. } => results,
        }
    }

    /// Generation this state belongs to; `None` when idle.
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Idle => None,
            Self::Running { generation, .. } | Self::Settled { generation, .. } => {
                Some(*generation)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<SearchError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Mutable controller inputs. Guarded by a single mutex that is never held
/// across an `.await`.
#[derive(Debug)]
struct Inputs {
    generation: u64,
    query: String,
    providers: Vec<Provider>,
    limit: usize,
}

struct Inner {
    aggregator: Aggregator,
    inputs: Mutex<Inputs>,
    state_tx: watch::Sender<SearchState>,
}

/// Owns the current query, settings and published [`SearchState`].
///
/// Cheap to clone; clones share the same state. Event methods spawn runs
/// with [`tokio::spawn`] and must be called from within a tokio runtime.
#[derive(Clone)]
pub struct QueryController {
    inner: Arc<Inner>,
}

impl QueryController {
    /// Create a controller over `aggregator` with the initial settings.
    pub fn new(aggregator: Aggregator, providers: Vec<Provider>, limit: usize) -> Self {
        let (state_tx, _) = watch::channel(SearchState::Idle);
        Self {
            inner: Arc::new(Inner {
                aggregator,
                inputs: Mutex::new(Inputs {
                    generation: 0,
                    query: String::new(),
                    providers,
                    limit,
                }),
                state_tx,
            }),
        }
    }

    /// Build a controller with the standard connectors and the config's
    /// provider list and result limit.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if `config` is invalid, or
    /// [`SearchError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SearchError> {
        let aggregator = Aggregator::from_config(config)?;
        Ok(Self::new(
            aggregator,
            config.providers.clone(),
            config.max_results,
        ))
    }

    /// Handle new query text. Returns the generation it was assigned.
    ///
    /// Empty or whitespace-only text publishes [`SearchState::Idle`] and
    /// starts no run; the bumped generation still invalidates any run in
    /// flight.
    pub fn on_query_change(&self, text: &str) -> u64 {
        let mut inputs = self.inputs();
        inputs.generation += 1;
        inputs.query = text.trim().to_string();

        if inputs.query.is_empty() {
            tracing::debug!(generation = inputs.generation, "query cleared");
            self.inner.state_tx.send_replace(SearchState::Idle);
            return inputs.generation;
        }
        self.start_run(inputs)
    }

    /// Handle a change of enabled providers or result limit.
    ///
    /// With a non-empty query the query is re-run under a new generation.
    /// Returns the current generation.
    pub fn on_settings_change(&self, providers: Vec<Provider>, limit: usize) -> u64 {
        let mut inputs = self.inputs();
        inputs.providers = providers;
        inputs.limit = limit;
        tracing::debug!(providers = ?inputs.providers, limit, "settings changed");

        if inputs.query.is_empty() {
            return inputs.generation;
        }
        inputs.generation += 1;
        self.start_run(inputs)
    }

    /// Snapshot of the published state.
    pub fn state(&self) -> SearchState {
        self.inner.state_tx.borrow().clone()
    }

    /// Subscribe to published state changes.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state_tx.subscribe()
    }

    /// Generation of the newest publishable run.
    pub fn generation(&self) -> u64 {
        self.inputs().generation
    }

    /// Wait until no run is in flight and return the published state.
    pub async fn settled(&self) -> SearchState {
        let mut rx = self.subscribe();
        // The sender lives in `self.inner`, so the channel cannot close here.
        let state = match rx.wait_for(|state| !state.is_running()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    fn start_run(&self, inputs: MutexGuard<'_, Inputs>) -> u64 {
        let generation = inputs.generation;
        let context = QueryContext::parse(&inputs.query, &inputs.providers, inputs.limit);
        let previous = self.inner.state_tx.borrow().results().to_vec();
        self.inner.state_tx.send_replace(SearchState::Running {
            generation,
            results: previous,
        });
        drop(inputs);

        tracing::debug!(generation, "run started");
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.aggregator.run(&context).await;
            inner.publish(generation, outcome);
        });
        generation
    }

    fn inputs(&self) -> MutexGuard<'_, Inputs> {
        self.inner.inputs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Inner {
    fn publish(&self, generation: u64, outcome: Result<Vec<ScoredCandidate>, SearchError>) {
        let inputs = self.inputs.lock().unwrap_or_else(PoisonError::into_inner);
        if inputs.generation != generation {
            tracing::trace!(
                generation,
                current = inputs.generation,
                "dropping stale run outcome"
            );
            return;
        }

        let state = match outcome {
            Ok(results) => {
                tracing::debug!(generation, count = results.len(), "run settled");
                SearchState::Settled {
                    generation,
                    results,
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(generation, error = %err, "run failed");
                SearchState::Settled {
                    generation,
                    results: self.state_tx.borrow().results().to_vec(),
                    error: Some(err),
                }
            }
        };
        // Sent while `inputs` is held so publish order follows generation order.
        self.state_tx.send_replace(state);
    }
}

impl std::fmt::Debug for QueryController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryController")
            .field("inputs", &*self.inputs())
            .field("aggregator", &self.inner.aggregator)
            .finish()
    }
}
