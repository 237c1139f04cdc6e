use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A listing as captured from one retail source. Every text field is free-form.
#[derive(Debug, Clone, PartialEq)]
pub struct RawListing {
    pub source_id: String,
    pub name: String,
    pub price: String,
    pub unit: String,
    pub size: String,
    pub category: String,
    pub brand: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub availability: bool,
    pub observed_at: DateTime<Utc>,
}

impl RawListing {
    /// Empty listing for `source_id`; callers fill in whatever fields they have.
    pub fn new(source_id: impl Into<String>, observed_at: DateTime<Utc>) -> Self {
        Self {
            source_id: source_id.into(),
            name: String::new(),
            price: String::new(),
            unit: String::new(),
            size: String::new(),
            category: String::new(),
            brand: String::new(),
            url: None,
            image_url: None,
            availability: true,
            observed_at,
        }
    }
}

/// Raw listings for one run: the reference source plus every competing source.
#[derive(Debug, Clone, Default)]
pub struct PipelineInput {
    pub reference: Vec<RawListing>,
    pub sources: BTreeMap<String, Vec<RawListing>>,
}

// ---------------------------------------------------------------------------
// Normalized
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalListing {
    pub source_id: String,
    pub raw_name: String,
    pub canonical_name: String,
    pub canonical_brand: String,
    pub canonical_category: String,
    pub canonical_unit: String,
    pub canonical_size: f64,
    pub price: f64,
    pub price_per_base_unit: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub availability: bool,
    pub observed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// A candidate listing plus the score components that ranked it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub listing: CanonicalListing,
    pub similarity_score: f64,
    pub name_similarity: f64,
    pub brand_similarity: f64,
    pub category_match: f64,
    pub exact_name: bool,
}

// ---------------------------------------------------------------------------
// Price comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    ReferenceCheaper,
    CandidateCheaper,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReferenceCheaper => write!(f, "reference_cheaper"),
            Self::CandidateCheaper => write!(f, "candidate_cheaper"),
        }
    }
}

/// Signed difference between two prices. `percentage_difference` is relative
/// to the candidate side and is 0 when the candidate price is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceDelta {
    pub reference: f64,
    pub candidate: f64,
    pub absolute_difference: f64,
    pub percentage_difference: f64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRecord {
    pub reference: CanonicalListing,
    pub candidate: MatchCandidate,
    pub price: PriceDelta,
    pub unit_price: PriceDelta,
    pub reference_cheaper: bool,
    pub similarity_score: f64,
    /// Best-first, includes the chosen candidate.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<MatchCandidate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoMatchRecord {
    pub reference: CanonicalListing,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Statistics + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonStatistics {
    pub total_matches: usize,
    pub reference_cheaper_count: usize,
    pub candidate_cheaper_count: usize,
    pub reference_cheaper_percentage: f64,
    pub average_percentage_difference: f64,
    pub median_percentage_difference: f64,
    /// Most negative percentage difference (largest reference-side discount).
    pub max_savings: f64,
    /// Most positive percentage difference.
    pub min_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStatistics {
    pub key: String,
    pub count: usize,
    pub mean_percentage_difference: f64,
    pub reference_cheaper_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub by_category: Vec<GroupStatistics>,
    pub by_source: Vec<GroupStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PricingAnalysis {
    pub average_percentage_difference: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub most_competitive_source: Option<String>,
    pub competitive_categories: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineSummary {
    pub reference_listings: usize,
    pub candidate_listings: usize,
    pub sources: Vec<String>,
    pub matched: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub summary: PipelineSummary,
    pub matches: Vec<ComparisonRecord>,
    pub no_matches: Vec<NoMatchRecord>,
    pub statistics: ComparisonStatistics,
    pub breakdown: Breakdown,
    pub analysis: PricingAnalysis,
}
