//! URL canonicalisation for cross-provider image deduplication.
//!
//! Two providers frequently return the same image under URLs that differ only
//! in tracking parameters, fragment or host capitalisation. Canonicalising
//! collapses those to one key.

use url::Url;

use crate::types::Candidate;

/// Tracking query parameters stripped during canonicalisation (matched
/// case-insensitively).
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
];

/// Canonicalise a URL into a dedup key.
///
/// 1. Scheme and host are lowercased and default ports dropped (done by
///    [`Url::parse`]).
/// 2. The fragment is removed.
/// 3. Tracking parameters are removed; the rest keep their order and are
///    re-encoded uniformly.
///
/// Input that does not parse as an absolute URL is returned unchanged.
/// The function is idempotent.
///
/// # Examples
///
/// ```
/// use cityscope::orchestrator::canonicalize::canonicalize;
///
/// let a = canonicalize("https://Images.Example.com/p.jpg?w=800&utm_source=app#top");
/// assert_eq!(a, "https://images.example.com/p.jpg?w=800");
/// assert_eq!(canonicalize(&a), a);
/// ```
pub fn canonicalize(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    parsed.set_fragment(None);

    if parsed.query().is_some() {
        let kept: Vec<(String, String)> = parsed
            .query_pairs()
            .filter(|(key, _)| !is_tracking_param(key))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if kept.is_empty() {
            parsed.set_query(None);
        } else {
            parsed.query_pairs_mut().clear().extend_pairs(kept);
        }
    }

    parsed.to_string()
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|tracked| tracked.eq_ignore_ascii_case(key))
}

/// Select and canonicalise the dedup key for a candidate.
///
/// Uses the first non-empty of `image_url`, `thumbnail_url`, `page_url`,
/// falling back to the provider-tagged `id`, so every candidate has a key.
pub fn dedup_key(candidate: &Candidate) -> String {
    [
        candidate.image_url.as_deref(),
        candidate.thumbnail_url.as_deref(),
        candidate.page_url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::trim)
    .find(|url| !url.is_empty())
    .map_or_else(|| candidate.id.clone(), canonicalize)
}
