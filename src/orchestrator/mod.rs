//! Search orchestrator: concurrent provider fan-out, dedup, scoring, ranking.
//!
//! [`aggregate::Aggregator`] queries every enabled connector concurrently,
//! merges their candidates in registration order, removes duplicates by
//! canonical URL, scores each survivor against the query and returns the
//! top K.

pub mod aggregate;
pub mod canonicalize;
pub mod dedup;
pub mod scoring;
