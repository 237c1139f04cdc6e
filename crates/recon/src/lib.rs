//! `pricewise-recon`: listing normalization and cross-source price comparison.
//!
//! Pure engine crate: receives pre-loaded listings, returns matched and
//! compared results. CSV decoding lives in [`ingest`]; everything else is
//! in-memory. No CLI dependencies.

pub mod aggregate;
pub mod config;
pub mod differ;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod similarity;

pub use config::{ComparisonConfig, MatchConfig, RuleSet};
pub use engine::{compare, run};
pub use error::CompareError;
pub use model::{CanonicalListing, ComparisonReport, PipelineInput, RawListing};
pub use normalize::Normalizer;
