//! Query context: the immutable, tokenized snapshot of one search request.
//!
//! A query has the form `"<city>[, <keywords>]"`. Everything before the
//! first comma is the city; everything after it is free keywords.

use serde::{Deserialize, Serialize};

use crate::types::Provider;

/// Tokenized query snapshot used for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryContext {
    /// Trimmed query text as entered by the user.
    pub raw: String,
    /// Distinct lowercase tokens of the city part.
    pub city_terms: Vec<String>,
    /// Distinct lowercase tokens of the keyword part.
    pub keyword_terms: Vec<String>,
    /// Lowercased full query, used for the exact-phrase bonus.
    pub phrase: String,
    /// Providers enabled for this run.
    pub providers: Vec<Provider>,
    /// Maximum number of results to return (K).
    pub limit: usize,
}

impl QueryContext {
    /// Build a context from raw query text and the current settings.
    pub fn parse(raw: &str, providers: &[Provider], limit: usize) -> Self {
        let raw = raw.trim().to_string();
        let (city, keywords) = match raw.split_once(',') {
            Some((city, keywords)) => (city, keywords),
            None => (raw.as_str(), ""),
        };

        Self {
            city_terms: distinct_tokens(city),
            keyword_terms: distinct_tokens(keywords),
            phrase: raw.to_lowercase(),
            providers: providers.to_vec(),
            limit,
            raw,
        }
    }

    /// Returns `true` if there is no query text to search for.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The text sent to every connector.
    pub fn search_text(&self) -> &str {
        &self.raw
    }
}

/// Split text into lowercase alphanumeric tokens.
///
/// Any non-alphanumeric character is a token boundary, so
/// `"Saint-Étienne's"` yields `["saint", "étienne", "s"]`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn distinct_tokens(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in tokenize(text) {
        if !out.contains(&token) {
            out.push(token);
        }
    }
    out
}
