//! String similarity used by the matcher. Every implementation scores on a
//! 0–100 scale where identical strings score 100.

use crate::config::SimilarityKind;

/// Normalized string similarity in `[0, 100]`.
pub trait Similarity: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;
}

/// Indel (insert/delete only) ratio: `2 * LCS / (len_a + len_b) * 100`.
///
/// Lengths count Unicode scalar values. Two empty strings score 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndelRatio;

impl Similarity for IndelRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let total = a.len() + b.len();
        if total == 0 {
            return 100.0;
        }
        let lcs = longest_common_subsequence(&a, &b);
        (2 * lcs) as f64 / total as f64 * 100.0
    }
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    // Two-row DP; `b` is the inner dimension.
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// `1 - levenshtein / max_len`, scaled to 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenshteinRatio;

impl Similarity for LevenshteinRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        strsim::normalized_levenshtein(a, b) * 100.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JaroWinklerRatio;

impl Similarity for JaroWinklerRatio {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        strsim::jaro_winkler(a, b) * 100.0
    }
}

impl SimilarityKind {
    pub fn build(self) -> Box<dyn Similarity> {
        match self {
            Self::Indel => Box::new(IndelRatio),
            Self::Levenshtein => Box::new(LevenshteinRatio),
            Self::JaroWinkler => Box::new(JaroWinklerRatio),
        }
    }
}
