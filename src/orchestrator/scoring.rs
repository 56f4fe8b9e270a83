//! Weighted multi-signal relevance scoring.
//!
//! Each candidate is scored as a weighted sum of six independent sub-scores,
//! each bounded to `[0, 1]`:
//!
//! | Signal      | Default weight | Meaning                                         |
//! |-------------|----------------|-------------------------------------------------|
//! | keyword     | 0.35           | fraction of keyword tokens found in the text    |
//! | city        | 0.22           | fraction of city tokens found in the text       |
//! | resolution  | 0.18           | megapixels / reference megapixels, clamped      |
//! | license     | 0.17           | reusability rank of the license                 |
//! | source      | 0.06           | per-provider prior                              |
//! | phrase      | 0.02           | full query appears in the title                 |
//!
//! The "text" matched against is the title plus the provider name. Weights
//! come from [`ScoringConfig`]; with weights summing to 1 the final score is
//! also in `[0, 1]`.

use crate::config::ScoringConfig;
use crate::query::{tokenize, QueryContext};
use crate::types::{Candidate, License, ScoredCandidate};

/// Reusability class of a license, most to least permissive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseClass {
    /// CC0, public-domain mark, or public domain.
    PublicDomain,
    /// Attribution-only (CC BY).
    Attribution,
    /// Attribution plus share-alike (CC BY-SA).
    ShareAlike,
    /// Any non-commercial restriction (CC BY-NC*).
    NonCommercial,
    /// The provider gave no license information.
    Unknown,
    /// Anything else, including provider-specific licenses.
    Other,
}

impl LicenseClass {
    /// Classify a free-text license type.
    ///
    /// Restrictions dominate: `"CC BY-NC-SA"` is non-commercial, not share-alike.
    pub fn classify(kind: &str) -> Self {
        let tokens = tokenize(kind);
        let has = |t: &str| tokens.iter().any(|token| token == t);

        if tokens.is_empty() || (tokens.len() == 1 && has("unknown")) {
            Self::Unknown
        } else if has("cc0") || has("pdm") || has("publicdomain") || (has("public") && has("domain")) {
            Self::PublicDomain
        } else if has("nc") || has("noncommercial") || (has("non") && has("commercial")) {
            Self::NonCommercial
        } else if has("sa") || has("sharealike") || (has("share") && has("alike")) {
            Self::ShareAlike
        } else if has("by") || has("attribution") {
            Self::Attribution
        } else {
            Self::Other
        }
    }

    /// Sub-score for this class.
    pub fn score(self) -> f64 {
        match self {
            Self::PublicDomain => 1.0,
            Self::Attribution => 0.85,
            Self::ShareAlike => 0.7,
            Self::Other => 0.5,
            Self::NonCommercial => 0.4,
            Self::Unknown => 0.3,
        }
    }
}

/// The six independent sub-scores for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubScores {
    /// Share of keyword terms found in the title or provider name.
    pub keyword: f64,
    /// Share of city terms found in the title or provider name.
    pub city: f64,
    /// Megapixels relative to the reference, clamped to `[0, 1]`.
    pub resolution: f64,
    /// Openness of the license class.
    pub license: f64,
    /// Prior of the connector that supplied the candidate.
    pub source: f64,
    /// 1 when the title contains the whole query, else 0.
    pub phrase: f64,
}

impl SubScores {
    /// Compute every sub-score for `candidate` against `context`.
    pub fn compute(candidate: &Candidate, context: &QueryContext, config: &ScoringConfig) -> Self {
        let text_tokens = text_tokens(candidate);
        Self {
            keyword: term_match(&context.keyword_terms, &text_tokens),
            city: term_match(&context.city_terms, &text_tokens),
            resolution: resolution_score(candidate, config.reference_megapixels),
            license: license_score(&candidate.license),
            source: candidate.source.prior(),
            phrase: phrase_score(candidate, context),
        }
    }

    /// Weighted sum of the sub-scores.
    pub fn weighted(&self, config: &ScoringConfig) -> f64 {
        self.keyword * config.keyword_weight
            + self.city * config.city_weight
            + self.resolution * config.resolution_weight
            + self.license * config.license_weight
            + self.source * config.source_weight
            + self.phrase * config.phrase_weight
    }
}

/// Relevance score of `candidate` for `context`. Higher is better.
pub fn score(candidate: &Candidate, context: &QueryContext, config: &ScoringConfig) -> f64 {
    SubScores::compute(candidate, context, config).weighted(config)
}

/// Score every candidate, preserving input order.
pub fn score_candidates(
    candidates: Vec<Candidate>,
    context: &QueryContext,
    config: &ScoringConfig,
) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let score = score(&candidate, context, config);
            ScoredCandidate { candidate, score }
        })
        .collect()
}

/// Tokens of the title followed by the provider name.
fn text_tokens(candidate: &Candidate) -> Vec<String> {
    let mut tokens = candidate.title.as_deref().map(tokenize).unwrap_or_default();
    tokens.extend(tokenize(candidate.source.name()));
    tokens
}

/// Fraction of `terms` present as whole tokens in `text_tokens`.
///
/// Zero when `terms` is empty.
pub fn term_match(terms: &[String], text_tokens: &[String]) -> f64 {
    if terms.is_empty() {
        return 0.0;
    }
    let found = terms.iter().filter(|term| text_tokens.contains(term)).count();
    found as f64 / terms.len() as f64
}

/// Keyword sub-score: fraction of keyword terms found in title + provider name.
pub fn keyword_score(candidate: &Candidate, context: &QueryContext) -> f64 {
    term_match(&context.keyword_terms, &text_tokens(candidate))
}

/// City sub-score: fraction of city terms found in title + provider name.
pub fn city_score(candidate: &Candidate, context: &QueryContext) -> f64 {
    term_match(&context.city_terms, &text_tokens(candidate))
}

/// Megapixels normalised by `reference_megapixels`, clamped to `[0, 1]`.
///
/// Zero when either dimension is unknown.
pub fn resolution_score(candidate: &Candidate, reference_megapixels: f64) -> f64 {
    let (Some(width), Some(height)) = (candidate.width, candidate.height) else {
        return 0.0;
    };
    if reference_megapixels <= 0.0 {
        return 0.0;
    }
    let megapixels = f64::from(width) * f64::from(height) / 1_000_000.0;
    (megapixels / reference_megapixels).clamp(0.0, 1.0)
}

pub fn license_score(license: &License) -> f64 {
    LicenseClass::classify(&license.kind).score()
}

/// 1 if the lowercased query appears verbatim in the lowercased title.
pub fn phrase_score(candidate: &Candidate, context: &QueryContext) -> f64 {
    match candidate.title.as_deref() {
        Some(title) if !context.phrase.is_empty() && title.to_lowercase().contains(&context.phrase) => {
            1.0
        }
        _ => 0.0,
    }
}
