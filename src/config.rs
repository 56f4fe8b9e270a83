//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls which providers are queried, timeouts, caching,
//! credentials, scoring weights and circuit-breaker behaviour. It can be
//! loaded from and saved to TOML; missing fields fall back to defaults.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::error::SearchError;
use crate::types::Provider;

/// Environment variable holding the Unsplash access key.
pub const UNSPLASH_KEY_ENV: &str = "UNSPLASH_ACCESS_KEY";
/// Environment variable holding the Pexels API key.
pub const PEXELS_KEY_ENV: &str = "PEXELS_API_KEY";
/// Environment variable holding the Pixabay API key.
pub const PIXABAY_KEY_ENV: &str = "PIXABAY_API_KEY";

/// Configuration for image search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Providers to query. Queried concurrently; results are merged.
    pub providers: Vec<Provider>,
    /// Number of results to return after deduplication and ranking (K).
    pub max_results: usize,
    /// Page size requested from each provider (clamped per provider).
    pub per_page: u32,
    /// Per-provider request timeout in seconds.
    pub timeout_seconds: u64,
    /// Whether to request safe-search filtering from providers that support it.
    pub safe_search: bool,
    /// How long to cache run results in seconds. Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
    /// Custom User-Agent string. If `None`, a crate-identifying agent is used.
    pub user_agent: Option<String>,
    /// Same-origin proxy that forwards Pexels searches with its own key.
    pub pexels_proxy_url: Option<String>,
    /// Provider credentials. Providers without a key return no results.
    pub api_keys: ApiKeys,
    /// Base URLs for each provider API.
    pub endpoints: Endpoints,
    /// Sub-score weights and normalisation constants.
    pub scoring: ScoringConfig,
    /// Per-provider circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            providers: Provider::all().to_vec(),
            max_results: 12,
            per_page: 20,
            timeout_seconds: 8,
            safe_search: true,
            cache_ttl_seconds: 600,
            user_agent: None,
            pexels_proxy_url: None,
            api_keys: ApiKeys::default(),
            endpoints: Endpoints::default(),
            scoring: ScoringConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// `max_results == 0` and an empty provider list are valid: both simply
    /// produce an empty result.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if !(1..=200).contains(&self.per_page) {
            return Err(SearchError::Config(
                "per_page must be between 1 and 200".into(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(SearchError::Config(
                "circuit_breaker.failure_threshold must be greater than 0".into(),
            ));
        }
        self.scoring.validate()
    }

    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, SearchError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SearchError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content).map_err(|e| SearchError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Config`] if the file cannot be written or the
    /// config cannot be serialised.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SearchError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SearchError::Config(format!("cannot create {}: {e}", parent.display())))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| SearchError::Config(e.to_string()))?;
        std::fs::write(path, content)
            .map_err(|e| SearchError::Config(format!("cannot write {}: {e}", path.display())))
    }

    /// Returns the default config file path: `~/.config/cityscope/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("cityscope").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("cityscope")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/cityscope-config/config.toml")
        }
    }

    /// Fill any missing API keys from the environment.
    pub fn with_env_keys(mut self) -> Self {
        let env = ApiKeys::from_env();
        self.api_keys = self.api_keys.without_blanks();
        self.api_keys.unsplash = self.api_keys.unsplash.or(env.unsplash);
        self.api_keys.pexels = self.api_keys.pexels.or(env.pexels);
        self.api_keys.pixabay = self.api_keys.pixabay.or(env.pixabay);
        self
    }
}

/// Provider credentials.
///
/// `Debug` output never includes the key material.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKeys {
    pub unsplash: Option<String>,
    pub pexels: Option<String>,
    pub pixabay: Option<String>,
}

impl ApiKeys {
    /// Read keys from [`UNSPLASH_KEY_ENV`], [`PEXELS_KEY_ENV`] and [`PIXABAY_KEY_ENV`].
    ///
    /// Unset or blank variables yield `None`.
    pub fn from_env() -> Self {
        Self {
            unsplash: env_key(UNSPLASH_KEY_ENV),
            pexels: env_key(PEXELS_KEY_ENV),
            pixabay: env_key(PIXABAY_KEY_ENV),
        }
    }

    /// Trim every key and drop the ones left empty.
    pub fn without_blanks(self) -> Self {
        Self {
            unsplash: self.unsplash.as_deref().and_then(usable_key),
            pexels: self.pexels.as_deref().and_then(usable_key),
            pixabay: self.pixabay.as_deref().and_then(usable_key),
        }
    }
}

/// A trimmed key, or `None` when nothing but whitespace is left.
pub(crate) fn usable_key(raw: &str) -> Option<String> {
    let key = raw.trim();
    (!key.is_empty()).then(|| key.to_string())
}

fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().as_deref().and_then(usable_key)
}

impl fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiKeys")
            .field("unsplash", &redact(&self.unsplash))
            .field("pexels", &redact(&self.pexels))
            .field("pixabay", &redact(&self.pixabay))
            .finish()
    }
}

/// Base URLs for each provider API. Overridable for testing and mirrors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub unsplash: String,
    pub pexels: String,
    pub pixabay: String,
    pub openverse: String,
    pub wikimedia: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            unsplash: "https://api.unsplash.com".into(),
            pexels: "https://api.pexels.com".into(),
            pixabay: "https://pixabay.com".into(),
            openverse: "https://api.openverse.org".into(),
            wikimedia: "https://commons.wikimedia.org".into(),
        }
    }
}

/// Weights of the scoring sub-signals plus the resolution reference.
///
/// The weights must be non-negative and sum to 1 so the final score stays
/// in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub keyword_weight: f64,
    pub city_weight: f64,
    pub resolution_weight: f64,
    pub license_weight: f64,
    pub source_weight: f64,
    pub phrase_weight: f64,
    /// Megapixels at which the resolution sub-score saturates.
    pub reference_megapixels: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keyword_weight: 0.35,
            city_weight: 0.22,
            resolution_weight: 0.18,
            license_weight: 0.17,
            source_weight: 0.06,
            phrase_weight: 0.02,
            reference_megapixels: 4.0,
        }
    }
}

impl ScoringConfig {
    /// Tolerance for the weight-sum check.
    const SUM_TOLERANCE: f64 = 1e-6;

    fn weights(&self) -> [f64; 6] {
        [
            self.keyword_weight,
            self.city_weight,
            self.resolution_weight,
            self.license_weight,
            self.source_weight,
            self.phrase_weight,
        ]
    }

    /// Checks that weights are finite, non-negative and sum to 1, and that
    /// the resolution reference is positive.
    pub fn validate(&self) -> Result<(), SearchError> {
        let weights = self.weights();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SearchError::Config(
                "scoring weights must be finite and non-negative".into(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(SearchError::Config(format!(
                "scoring weights must sum to 1, got {sum}"
            )));
        }
        if !(self.reference_megapixels.is_finite() && self.reference_megapixels > 0.0) {
            return Err(SearchError::Config(
                "scoring reference_megapixels must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
