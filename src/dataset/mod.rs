//! Dataset hygiene tools.
//!
//! Batch utilities that run over a directory of captured images:
//! - `ImageValidator`: finds and removes files that fail an integrity check
//! - `Deduplicator`: finds and removes visually similar images
//!
//! Both support a dry-run mode that reports without deleting. Similarity
//! scoring sits behind the `SimilarityScorer` trait so the default perceptual
//! hash can be swapped for a heavier engine.

pub mod dedup;
pub mod validator;

pub use dedup::{DhashScorer, Deduplicator, PairScore, SimilarityScorer};
pub use validator::{CleanupResult, ImageValidator};
