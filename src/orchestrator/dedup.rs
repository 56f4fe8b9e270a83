//! Candidate deduplication by canonical key.
//!
//! Candidates are visited in concatenation order; the first occurrence of
//! each canonical key is kept and later ones are dropped, regardless of
//! which provider returned them. Output preserves input order.

use std::collections::HashSet;

use crate::types::Candidate;

use super::canonicalize::dedup_key;

/// Remove candidates whose canonical key was already seen.
pub fn deduplicate(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut seen: HashSet<String> = HashSet::with_capacity(candidates.len());
    let before = candidates.len();

    let kept: Vec<Candidate> = candidates
        .into_iter()
        .filter(|candidate| seen.insert(dedup_key(candidate)))
        .collect();

    tracing::debug!(before, after = kept.len(), "deduplicated candidates");
    kept
}
