use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CompareError;
use crate::normalize::Normalizer;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A full comparison run: which sources to load, how to normalize them and
/// how to match them. The engine never reads the files named here.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonConfig {
    pub name: String,
    pub reference: SourceConfig,
    pub sources: BTreeMap<String, SourceConfig>,
    #[serde(default)]
    pub rules: RuleSet,
    #[serde(default)]
    pub matching: MatchConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Source id of the reference listings. Competing sources are keyed by
    /// their table name instead.
    #[serde(default)]
    pub id: Option<String>,
    pub file: String,
    #[serde(default)]
    pub columns: ColumnMapping,
}

/// CSV header name for each raw listing field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub name: String,
    pub price: String,
    pub unit: String,
    pub size: String,
    pub category: String,
    pub brand: String,
    pub url: String,
    pub image_url: String,
    pub availability: String,
    pub observed_at: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            name: "name".into(),
            price: "price".into(),
            unit: "unit".into(),
            size: "size".into(),
            category: "category".into(),
            brand: "brand".into(),
            url: "url".into(),
            image_url: "image_url".into(),
            availability: "availability".into(),
            observed_at: "observed_at".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization rules
// ---------------------------------------------------------------------------

/// Mapping tables and ordered pattern lists used by the normalizer.
/// Every table may be empty.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// Applied in order to the lower-cased name.
    pub name_cleaners: Vec<NameCleaner>,
    /// Canonical brand -> known spellings.
    pub brand_aliases: BTreeMap<String, Vec<String>>,
    /// Raw category -> canonical category. Single level.
    pub category_mappings: BTreeMap<String, String>,
    /// Raw unit -> canonical unit.
    pub unit_aliases: BTreeMap<String, String>,
    /// First matching pattern wins.
    pub size_patterns: Vec<SizePattern>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NameCleaner {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SizePattern {
    /// Regex whose first capture group is the numeric size.
    pub pattern: String,
    /// Conversion applies only when this tag occurs in the lower-cased unit.
    #[serde(default)]
    pub unit_type: String,
    #[serde(default = "default_conversion")]
    pub conversion: f64,
}

fn default_conversion() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityKind {
    #[default]
    Indel,
    Levenshtein,
    JaroWinkler,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub threshold: f64,
    pub weight_name: f64,
    pub weight_brand: f64,
    pub weight_category: f64,
    pub exact_match_bonus: f64,
    /// How many ranked candidates to keep on each comparison record.
    pub alternatives: usize,
    pub similarity: SimilarityKind,
    pub parallel: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: 80.0,
            weight_name: 0.7,
            weight_brand: 0.2,
            weight_category: 0.1,
            exact_match_bonus: 10.0,
            alternatives: 3,
            similarity: SimilarityKind::Indel,
            parallel: true,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), CompareError> {
        let fields = [
            ("threshold", self.threshold),
            ("weight_name", self.weight_name),
            ("weight_brand", self.weight_brand),
            ("weight_category", self.weight_category),
            ("exact_match_bonus", self.exact_match_bonus),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(CompareError::ConfigValidation(format!(
                    "matching.{field} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ComparisonConfig {
    pub fn from_toml(input: &str) -> Result<Self, CompareError> {
        let config: ComparisonConfig =
            toml::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Source id used for the reference listings.
    pub fn reference_id(&self) -> &str {
        self.reference.id.as_deref().unwrap_or("reference")
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        if self.sources.is_empty() {
            return Err(CompareError::ConfigValidation(
                "at least one competing source is required".into(),
            ));
        }

        let reference_id = self.reference_id();
        if reference_id.trim().is_empty() {
            return Err(CompareError::ConfigValidation(
                "reference.id must not be empty".into(),
            ));
        }
        if self.sources.contains_key(reference_id) {
            return Err(CompareError::ConfigValidation(format!(
                "source '{reference_id}' is both the reference and a competing source"
            )));
        }

        for (source_id, source) in &self.sources {
            if source.id.as_deref().is_some_and(|id| id != source_id.as_str()) {
                return Err(CompareError::ConfigValidation(format!(
                    "sources.{source_id}: id must match the table name or be omitted"
                )));
            }
        }

        self.matching.validate()?;
        Normalizer::new(&self.rules)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
