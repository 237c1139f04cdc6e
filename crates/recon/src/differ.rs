use crate::model::{CanonicalListing, ComparisonRecord, MatchCandidate, PriceDelta, Verdict};

/// Signed delta of `reference` against `candidate`.
///
/// Negative means the reference side is cheaper. The percentage is relative
/// to the candidate and reported as 0 when the candidate price is not positive.
pub fn price_delta(reference: f64, candidate: f64) -> PriceDelta {
    let absolute_difference = reference - candidate;
    let percentage_difference = if candidate > 0.0 {
        absolute_difference / candidate * 100.0
    } else {
        0.0
    };
    let verdict = if absolute_difference < 0.0 {
        Verdict::ReferenceCheaper
    } else {
        Verdict::CandidateCheaper
    };

    PriceDelta {
        reference,
        candidate,
        absolute_difference,
        percentage_difference,
        verdict,
    }
}

/// Compare a reference listing with its chosen match. Nominal and per-unit
/// prices are compared independently and may disagree.
pub fn diff(reference: &CanonicalListing, candidate: &MatchCandidate) -> ComparisonRecord {
    let price = price_delta(reference.price, candidate.listing.price);
    let unit_price = price_delta(
        reference.price_per_base_unit,
        candidate.listing.price_per_base_unit,
    );

    ComparisonRecord {
        reference: reference.clone(),
        candidate: candidate.clone(),
        reference_cheaper: price.verdict == Verdict::ReferenceCheaper,
        similarity_score: candidate.similarity_score,
        price,
        unit_price,
        alternatives: Vec::new(),
    }
}
