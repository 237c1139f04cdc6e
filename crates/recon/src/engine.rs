use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::aggregate::{analyze, breakdown, summarize};
use crate::config::{ComparisonConfig, MatchConfig};
use crate::differ::diff;
use crate::error::CompareError;
use crate::matcher::find_matches;
use crate::model::{
    CanonicalListing, ComparisonRecord, ComparisonReport, NoMatchRecord, PipelineInput,
    PipelineSummary,
};
use crate::normalize::Normalizer;
use crate::similarity::Similarity;

pub const REASON_NO_CANDIDATES: &str = "no candidate listings available";
pub const REASON_BELOW_THRESHOLD: &str = "no candidate met the matching threshold";

enum Outcome {
    Matched(ComparisonRecord),
    Unmatched(NoMatchRecord),
}

/// Normalize every source, then match and compare. Competing sources are
/// searched as one pool, concatenated in source-id order.
pub fn run(config: &ComparisonConfig, input: &PipelineInput) -> Result<ComparisonReport, CompareError> {
    config.matching.validate()?;
    let normalizer = Normalizer::new(&config.rules)?;

    let reference = normalizer.normalize_batch(&input.reference);
    let mut candidates = Vec::new();
    for (source_id, raws) in &input.sources {
        let normalized = normalizer.normalize_batch(raws);
        log::debug!("source '{source_id}': {} candidate listings", normalized.len());
        candidates.extend(normalized);
    }

    let similarity = config.matching.similarity.build();
    let mut report = compare(&reference, &candidates, &config.matching, similarity.as_ref());
    report.summary.sources = input.sources.keys().cloned().collect();

    log::info!(
        "'{}': {} matched, {} unmatched across {} sources",
        config.name,
        report.summary.matched,
        report.summary.unmatched,
        report.summary.sources.len()
    );
    Ok(report)
}

/// Find the best candidate for each reference listing and roll the results up.
///
/// Reference listings are processed independently; with `cfg.parallel` they
/// are spread over the rayon pool. Output order always follows `reference`.
pub fn compare(
    reference: &[CanonicalListing],
    candidates: &[CanonicalListing],
    cfg: &MatchConfig,
    similarity: &dyn Similarity,
) -> ComparisonReport {
    log::debug!(
        "comparing {} reference listings with {} candidates",
        reference.len(),
        candidates.len()
    );

    let outcomes: Vec<Outcome> = if cfg.parallel {
        reference
            .par_iter()
            .map(|r| compare_one(r, candidates, cfg, similarity))
            .collect()
    } else {
        reference
            .iter()
            .map(|r| compare_one(r, candidates, cfg, similarity))
            .collect()
    };

    let mut matches = Vec::new();
    let mut no_matches = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Matched(record) => matches.push(record),
            Outcome::Unmatched(record) => no_matches.push(record),
        }
    }

    let sources: BTreeSet<&str> = candidates.iter().map(|c| c.source_id.as_str()).collect();

    ComparisonReport {
        summary: PipelineSummary {
            reference_listings: reference.len(),
            candidate_listings: candidates.len(),
            sources: sources.into_iter().map(str::to_string).collect(),
            matched: matches.len(),
            unmatched: no_matches.len(),
        },
        statistics: summarize(&matches),
        breakdown: breakdown(&matches),
        analysis: analyze(&matches),
        matches,
        no_matches,
    }
}

fn compare_one(
    reference: &CanonicalListing,
    candidates: &[CanonicalListing],
    cfg: &MatchConfig,
    similarity: &dyn Similarity,
) -> Outcome {
    let mut ranked = find_matches(reference, candidates, cfg, similarity);
    if ranked.is_empty() {
        let reason = if candidates.is_empty() {
            REASON_NO_CANDIDATES
        } else {
            REASON_BELOW_THRESHOLD
        };
        return Outcome::Unmatched(NoMatchRecord {
            reference: reference.clone(),
            reason: reason.to_string(),
        });
    }

    let mut record = diff(reference, &ranked[0]);
    ranked.truncate(cfg.alternatives);
    record.alternatives = ranked;
    Outcome::Matched(record)
}
