//! Publication feed engine.
//!
//! Fetches publications from a blog API through an ordered fallback chain,
//! merges them into one deduplicated, canonically ordered list, and pages the
//! result for display while discarding responses from superseded requests.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
