use std::cmp::Ordering;

use crate::config::MatchConfig;
use crate::model::{CanonicalListing, MatchCandidate};
use crate::similarity::Similarity;

/// Score one candidate against `reference`.
///
/// `overall = name*w_name + brand*w_brand + category*w_category`, plus the
/// exact-name bonus when the canonical names are identical. Brand similarity
/// is 0 when either brand is empty.
pub fn score_candidate(
    reference: &CanonicalListing,
    candidate: &CanonicalListing,
    cfg: &MatchConfig,
    similarity: &dyn Similarity,
) -> MatchCandidate {
    let name_similarity = similarity.ratio(&reference.canonical_name, &candidate.canonical_name);
    let brand_similarity =
        if reference.canonical_brand.is_empty() || candidate.canonical_brand.is_empty() {
            0.0
        } else {
            similarity.ratio(&reference.canonical_brand, &candidate.canonical_brand)
        };
    let category_match = if reference.canonical_category == candidate.canonical_category {
        100.0
    } else {
        0.0
    };

    let exact_name = reference.canonical_name == candidate.canonical_name;
    let mut similarity_score = name_similarity * cfg.weight_name
        + brand_similarity * cfg.weight_brand
        + category_match * cfg.weight_category;
    if exact_name {
        similarity_score += cfg.exact_match_bonus;
    }

    MatchCandidate {
        listing: candidate.clone(),
        similarity_score,
        name_similarity,
        brand_similarity,
        category_match,
        exact_name,
    }
}

/// All candidates scoring at or above `cfg.threshold`, best first.
///
/// Equal scores keep their input order.
pub fn find_matches(
    reference: &CanonicalListing,
    candidates: &[CanonicalListing],
    cfg: &MatchConfig,
    similarity: &dyn Similarity,
) -> Vec<MatchCandidate> {
    let mut matches: Vec<MatchCandidate> = candidates
        .iter()
        .map(|c| score_candidate(reference, c, cfg, similarity))
        .filter(|m| m.similarity_score >= cfg.threshold)
        .collect();

    // `sort_by` is stable.
    matches.sort_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
    });

    log::debug!(
        "'{}': {} of {} candidates at or above {}",
        reference.canonical_name,
        matches.len(),
        candidates.len(),
        cfg.threshold
    );
    matches
}
