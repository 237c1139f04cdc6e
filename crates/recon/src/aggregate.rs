use std::collections::BTreeMap;

use crate::model::{
    Breakdown, ComparisonRecord, ComparisonStatistics, GroupStatistics, PricingAnalysis,
};

/// Descriptive statistics over the nominal percentage differences.
pub fn summarize(records: &[ComparisonRecord]) -> ComparisonStatistics {
    if records.is_empty() {
        return ComparisonStatistics::default();
    }

    let mut diffs: Vec<f64> = records.iter().map(|r| r.price.percentage_difference).collect();
    diffs.sort_by(|a, b| a.total_cmp(b));

    let total = records.len();
    let reference_cheaper_count = records.iter().filter(|r| r.reference_cheaper).count();

    ComparisonStatistics {
        total_matches: total,
        reference_cheaper_count,
        candidate_cheaper_count: total - reference_cheaper_count,
        reference_cheaper_percentage: reference_cheaper_count as f64 / total as f64 * 100.0,
        average_percentage_difference: mean(&diffs),
        // Lower-middle element for even counts.
        median_percentage_difference: diffs[(total - 1) / 2],
        max_savings: diffs[0],
        min_savings: diffs[total - 1],
    }
}

/// Per-category (reference side) and per-source (candidate side) rollups,
/// each in ascending key order.
pub fn breakdown(records: &[ComparisonRecord]) -> Breakdown {
    Breakdown {
        by_category: group_by(records, |r| r.reference.canonical_category.as_str()),
        by_source: group_by(records, |r| r.candidate.listing.source_id.as_str()),
    }
}

/// Competitiveness overview: which source the reference undercuts most and
/// how often it is cheaper per category.
pub fn analyze(records: &[ComparisonRecord]) -> PricingAnalysis {
    if records.is_empty() {
        return PricingAnalysis::default();
    }

    let diffs: Vec<f64> = records.iter().map(|r| r.price.percentage_difference).collect();

    let mut most_competitive: Option<&GroupStatistics> = None;
    let by_source = group_by(records, |r| r.candidate.listing.source_id.as_str());
    for group in &by_source {
        if most_competitive
            .map_or(true, |best| group.mean_percentage_difference < best.mean_percentage_difference)
        {
            most_competitive = Some(group);
        }
    }

    let competitive_categories = group_by(records, |r| r.reference.canonical_category.as_str())
        .into_iter()
        .map(|g| (g.key, g.reference_cheaper_count))
        .collect();

    PricingAnalysis {
        average_percentage_difference: mean(&diffs),
        most_competitive_source: most_competitive.map(|g| g.key.clone()),
        competitive_categories,
    }
}

fn group_by<'a, F>(records: &'a [ComparisonRecord], key: F) -> Vec<GroupStatistics>
where
    F: Fn(&'a ComparisonRecord) -> &'a str,
{
    let mut groups: BTreeMap<&str, (usize, f64, usize)> = BTreeMap::new();

    for record in records {
        let entry = groups.entry(key(record)).or_insert((0, 0.0, 0));
        entry.0 += 1;
        entry.1 += record.price.percentage_difference;
        if record.reference_cheaper {
            entry.2 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(key, (count, sum, cheaper))| GroupStatistics {
            key: key.to_string(),
            count,
            mean_percentage_difference: sum / count as f64,
            reference_cheaper_count: cheaper,
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}
