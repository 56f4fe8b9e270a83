//! Core types for image candidates and provider identification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image search providers that cityscope can query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Unsplash: curated, high-resolution photography.
    Unsplash,
    /// Pexels: curated stock photography.
    Pexels,
    /// Pixabay: large community stock library.
    Pixabay,
    /// Openverse: openly licensed media aggregated from many collections.
    Openverse,
    /// Wikimedia Commons: free-licensed media repository.
    Wikimedia,
}

impl Provider {
    /// Returns the human-readable name of this provider.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unsplash => "Unsplash",
            Self::Pexels => "Pexels",
            Self::Pixabay => "Pixabay",
            Self::Openverse => "Openverse",
            Self::Wikimedia => "Wikimedia",
        }
    }

    /// Returns the short tag used to prefix candidate ids from this provider.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Unsplash => "unsplash",
            Self::Pexels => "pexels",
            Self::Pixabay => "pixabay",
            Self::Openverse => "openverse",
            Self::Wikimedia => "wikimedia",
        }
    }

    /// Returns the source prior in `[0, 1]` reflecting curated quality.
    ///
    /// The prior carries a small weight in the final score and never
    /// outweighs content relevance.
    pub fn prior(&self) -> f64 {
        match self {
            Self::Unsplash => 1.0,
            Self::Pexels => 0.9,
            Self::Wikimedia => 0.85,
            Self::Openverse => 0.8,
            Self::Pixabay => 0.7,
        }
    }

    /// Returns all available provider variants, in default registration order.
    pub fn all() -> &'static [Provider] {
        &[
            Self::Unsplash,
            Self::Pexels,
            Self::Pixabay,
            Self::Openverse,
            Self::Wikimedia,
        ]
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// License information attached to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Free-text license type, e.g. `"CC BY-SA 4.0"` or `"Unsplash License"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Link to the license text, when the provider exposes one.
    pub url: Option<String>,
}

impl License {
    /// Create a license with a type and optional URL.
    pub fn new(kind: impl Into<String>, url: Option<String>) -> Self {
        Self {
            kind: kind.into(),
            url,
        }
    }

    /// A license the provider did not describe.
    pub fn unknown() -> Self {
        Self::new("unknown", None)
    }
}

/// One image result, normalised from a provider response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Provider-tagged id (`"<tag>:<native id>"`), unique across providers.
    pub id: String,
    /// Which provider returned this candidate.
    pub source: Provider,
    pub title: Option<String>,
    /// Full-size image URL.
    pub image_url: Option<String>,
    /// Preview-size image URL.
    pub thumbnail_url: Option<String>,
    /// Provider landing page for the image.
    pub page_url: Option<String>,
    /// Pixel width, if known.
    pub width: Option<u32>,
    /// Pixel height, if known.
    pub height: Option<u32>,
    pub license: License,
    /// When the candidate was retrieved. Provenance only.
    pub fetched_at: DateTime<Utc>,
}

impl Candidate {
    /// Create an empty candidate for `source` with a provider-tagged id.
    ///
    /// Connectors fill in the remaining fields before returning it.
    pub fn new(source: Provider, native_id: impl fmt::Display) -> Self {
        Self {
            id: format!("{}:{native_id}", source.tag()),
            source,
            title: None,
            image_url: None,
            thumbnail_url: None,
            page_url: None,
            width: None,
            height: None,
            license: License::unknown(),
            fetched_at: Utc::now(),
        }
    }

    /// Returns `true` if the candidate carries a displayable image URL.
    ///
    /// Connectors drop candidates for which this is `false`.
    pub fn has_image(&self) -> bool {
        non_empty(self.image_url.as_deref()) || non_empty(self.thumbnail_url.as_deref())
    }

    /// Set pixel dimensions, discarding zero values.
    pub fn with_dimensions(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width.filter(|w| *w > 0);
        self.height = height.filter(|h| *h > 0);
        self
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// A candidate together with its relevance score (higher is better).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,
    /// Weighted relevance score in `[0, 1]` with default weights.
    pub score: f64,
}
