//! Raw listing -> canonical listing.
//!
//! Normalization never fails on data: every unparseable field falls back to a
//! fixed default. The only error is a rule set whose patterns don't compile,
//! which surfaces once from [`Normalizer::new`].

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use crate::config::RuleSet;
use crate::error::CompareError;
use crate::ingest::{first_number, parse_price};
use crate::model::{CanonicalListing, RawListing};

pub const DEFAULT_CATEGORY: &str = "general";
pub const DEFAULT_UNIT: &str = "each";
pub const DEFAULT_SIZE: f64 = 1.0;

struct CompiledSizePattern {
    re: Regex,
    unit_type: String,
    conversion: f64,
}

/// A [`RuleSet`] compiled for repeated use.
pub struct Normalizer {
    cleaners: Vec<(Regex, String)>,
    brand_lookup: HashMap<String, String>,
    categories: HashMap<String, String>,
    units: HashMap<String, String>,
    sizes: Vec<CompiledSizePattern>,
}

impl Normalizer {
    pub fn new(rules: &RuleSet) -> Result<Self, CompareError> {
        let cleaners = rules
            .name_cleaners
            .iter()
            .map(|c| {
                RegexBuilder::new(&c.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (re, c.replacement.clone()))
                    .map_err(|e| invalid("name_cleaners", &c.pattern, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut sizes = Vec::with_capacity(rules.size_patterns.len());
        for p in &rules.size_patterns {
            if !p.conversion.is_finite() || p.conversion <= 0.0 {
                return Err(CompareError::ConfigValidation(format!(
                    "size pattern '{}': conversion must be a positive number, got {}",
                    p.pattern, p.conversion
                )));
            }
            let re = Regex::new(&p.pattern).map_err(|e| invalid("size_patterns", &p.pattern, e))?;
            sizes.push(CompiledSizePattern {
                re,
                unit_type: p.unit_type.to_lowercase(),
                conversion: p.conversion,
            });
        }

        // Aliases are listed per canonical brand; invert once. When a spelling
        // is claimed by two brands the first in key order keeps it.
        let mut brand_lookup = HashMap::new();
        for (canonical, aliases) in &rules.brand_aliases {
            for alias in aliases {
                brand_lookup
                    .entry(alias.trim().to_lowercase())
                    .or_insert_with(|| canonical.clone());
            }
        }

        Ok(Self {
            cleaners,
            brand_lookup,
            categories: lowercase_keys(&rules.category_mappings),
            units: lowercase_keys(&rules.unit_aliases),
            sizes,
        })
    }

    pub fn normalize(&self, raw: &RawListing) -> CanonicalListing {
        let canonical_name = self.normalize_name(&raw.name);
        let canonical_brand = self.normalize_brand(&raw.brand);
        let canonical_category = self.normalize_category(&raw.category);
        let (canonical_unit, canonical_size) = self.normalize_unit_and_size(&raw.unit, &raw.size);
        let price = parse_price(&raw.price);

        CanonicalListing {
            source_id: raw.source_id.clone(),
            raw_name: raw.name.clone(),
            canonical_name,
            canonical_brand,
            canonical_category,
            canonical_unit,
            canonical_size,
            price,
            price_per_base_unit: price_per_base_unit(price, canonical_size),
            url: raw.url.clone(),
            image_url: raw.image_url.clone(),
            availability: raw.availability,
            observed_at: raw.observed_at,
        }
    }

    /// Normalize every listing independently, preserving order and count.
    pub fn normalize_batch(&self, raws: &[RawListing]) -> Vec<CanonicalListing> {
        let out: Vec<CanonicalListing> = raws.iter().map(|r| self.normalize(r)).collect();
        log::debug!("normalized {} listings", out.len());
        out
    }

    pub fn normalize_name(&self, name: &str) -> String {
        let mut name = name.trim().to_lowercase();
        for (re, replacement) in &self.cleaners {
            name = re.replace_all(&name, replacement.as_str()).into_owned();
        }
        collapse_whitespace(&name)
    }

    pub fn normalize_brand(&self, brand: &str) -> String {
        let brand = brand.trim().to_lowercase();
        if brand.is_empty() {
            return brand;
        }
        match self.brand_lookup.get(&brand) {
            Some(canonical) => canonical.clone(),
            None => brand,
        }
    }

    pub fn normalize_category(&self, category: &str) -> String {
        let category = category.trim().to_lowercase();
        if category.is_empty() {
            return DEFAULT_CATEGORY.to_string();
        }
        match self.categories.get(&category) {
            Some(mapped) => mapped.clone(),
            None => category,
        }
    }

    /// Returns `(canonical_unit, canonical_size)`.
    pub fn normalize_unit_and_size(&self, unit: &str, size: &str) -> (String, f64) {
        let unit = match unit.trim() {
            "" => DEFAULT_UNIT.to_string(),
            u => u.to_lowercase(),
        };
        let size = match size.trim() {
            "" => "1",
            s => s,
        };

        let canonical_unit = self.units.get(&unit).cloned().unwrap_or_else(|| unit.clone());
        (canonical_unit, self.extract_size(size, &unit))
    }

    /// Numeric size of `size`, converted by the first matching size pattern
    /// whose unit-type tag occurs in `unit`.
    pub fn extract_size(&self, size: &str, unit: &str) -> f64 {
        let size = size.to_lowercase().replace(',', "");
        let unit = unit.to_lowercase();

        for p in &self.sizes {
            let Some(caps) = p.re.captures(&size) else {
                continue;
            };
            let Some(value) = caps
                .get(1)
                .and_then(|m| m.as_str().trim().parse::<f64>().ok())
                .filter(|v| v.is_finite())
            else {
                continue;
            };
            if !p.unit_type.is_empty() && unit.contains(&p.unit_type) {
                return value * p.conversion;
            }
            return value;
        }

        first_number(&size).unwrap_or(DEFAULT_SIZE)
    }
}

/// Compile `rules` and normalize one listing.
pub fn normalize(raw: &RawListing, rules: &RuleSet) -> Result<CanonicalListing, CompareError> {
    Ok(Normalizer::new(rules)?.normalize(raw))
}

/// Compile `rules` once and normalize a batch.
pub fn normalize_batch(
    raws: &[RawListing],
    rules: &RuleSet,
) -> Result<Vec<CanonicalListing>, CompareError> {
    Ok(Normalizer::new(rules)?.normalize_batch(raws))
}

/// Price divided by size; 0.0 whenever either side is non-positive or the
/// quotient is not finite.
pub fn price_per_base_unit(price: f64, size: f64) -> f64 {
    if !(price > 0.0) || !(size > 0.0) {
        return 0.0;
    }
    let per_unit = price / size;
    if per_unit.is_finite() {
        per_unit
    } else {
        0.0
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn lowercase_keys(map: &std::collections::BTreeMap<String, String>) -> HashMap<String, String> {
    map.iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v.clone()))
        .collect()
}

fn invalid(field: &'static str, pattern: &str, e: regex::Error) -> CompareError {
    CompareError::InvalidPattern {
        field,
        pattern: pattern.to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NameCleaner, SizePattern};
    use chrono::Utc;

    fn sample_rules() -> RuleSet {
        RuleSet {
            name_cleaners: vec![
                NameCleaner {
                    pattern: r"\b(fresh|organic|premium)\b".into(),
                    replacement: String::new(),
                },
                NameCleaner {
                    pattern: r"\s+".into(),
                    replacement: " ".into(),
                },
            ],
            brand_aliases: [
                ("farm2bag".to_string(), vec!["farm2bag".into(), "farm 2 bag".into(), "farm2bag fresh".into()]),
                ("amul".to_string(), vec!["amul".into(), "Amul Dairy".into()]),
            ]
            .into_iter()
            .collect(),
            category_mappings: [
                ("vegetables", "vegetables"),
                ("fresh vegetables", "vegetables"),
                ("fruits", "fruits"),
                ("dairy products", "dairy"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            unit_aliases: [
                ("kilogram", "kg"),
                ("grams", "g"),
                ("litre", "liter"),
                ("pieces", "piece"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
            size_patterns: vec![
                SizePattern {
                    pattern: r"(\d+(?:\.\d+)?)\s*g(?:rams?)?".into(),
                    unit_type: "weight".into(),
                    conversion: 0.001,
                },
                SizePattern {
                    pattern: r"(\d+(?:\.\d+)?)\s*kg".into(),
                    unit_type: "weight".into(),
                    conversion: 1.0,
                },
                SizePattern {
                    pattern: r"(\d+)\s*(?:piece|pcs?)".into(),
                    unit_type: "count".into(),
                    conversion: 1.0,
                },
            ],
        }
    }

    fn normalizer() -> Normalizer {
        Normalizer::new(&sample_rules()).unwrap()
    }

    fn raw(name: &str, price: &str, unit: &str, size: &str) -> RawListing {
        let mut r = RawListing::new("farm2bag", Utc::now());
        r.name = name.into();
        r.price = price.into();
        r.unit = unit.into();
        r.size = size.into();
        r
    }

    #[test]
    fn name_cleaning() {
        let n = normalizer();
        assert_eq!(n.normalize_name("Fresh Organic Premium Tomatoes"), "tomatoes");
        assert_eq!(n.normalize_name("Red   Onions    Fresh"), "red onions");
        assert_eq!(n.normalize_name("BASMATI RICE"), "basmati rice");
        assert_eq!(n.normalize_name(""), "");
        // Word boundaries: "refreshing" is left alone
        assert_eq!(n.normalize_name("Refreshing Lemonade"), "refreshing lemonade");
    }

    #[test]
    fn cleaners_apply_in_order() {
        let rules = RuleSet {
            name_cleaners: vec![
                NameCleaner { pattern: "a".into(), replacement: "b".into() },
                NameCleaner { pattern: "b".into(), replacement: "c".into() },
            ],
            ..RuleSet::default()
        };
        let n = Normalizer::new(&rules).unwrap();
        assert_eq!(n.normalize_name("A"), "c");

        let reversed = RuleSet {
            name_cleaners: rules.name_cleaners.iter().rev().cloned().collect(),
            ..RuleSet::default()
        };
        let n = Normalizer::new(&reversed).unwrap();
        assert_eq!(n.normalize_name("A"), "b");
    }

    #[test]
    fn brand_aliases() {
        let n = normalizer();
        assert_eq!(n.normalize_brand("farm2bag"), "farm2bag");
        assert_eq!(n.normalize_brand("Farm 2 Bag"), "farm2bag");
        assert_eq!(n.normalize_brand("AMUL DAIRY"), "amul");
        assert_eq!(n.normalize_brand("Unknown Brand"), "unknown brand");
        assert_eq!(n.normalize_brand("  "), "");
    }

    #[test]
    fn categories() {
        let n = normalizer();
        assert_eq!(n.normalize_category("vegetables"), "vegetables");
        assert_eq!(n.normalize_category("Fresh Vegetables"), "vegetables");
        assert_eq!(n.normalize_category("FRUITS"), "fruits");
        assert_eq!(n.normalize_category("unknown"), "unknown");
        assert_eq!(n.normalize_category(""), DEFAULT_CATEGORY);
    }

    #[test]
    fn category_mapping_is_single_level() {
        let rules = RuleSet {
            category_mappings: [("veg", "greens"), ("greens", "produce")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..RuleSet::default()
        };
        let n = Normalizer::new(&rules).unwrap();
        assert_eq!(n.normalize_category("veg"), "greens");
    }

    #[test]
    fn units_and_sizes() {
        let n = normalizer();
        assert_eq!(n.normalize_unit_and_size("kilogram", "2"), ("kg".to_string(), 2.0));
        assert_eq!(n.normalize_unit_and_size("litre", "1.5"), ("liter".to_string(), 1.5));
        assert_eq!(n.normalize_unit_and_size("pieces", "6"), ("piece".to_string(), 6.0));
        assert_eq!(n.normalize_unit_and_size("", ""), (DEFAULT_UNIT.to_string(), 1.0));
    }

    #[test]
    fn size_conversion_requires_unit_tag() {
        let n = normalizer();
        assert_eq!(n.extract_size("500g", "weight"), 0.5);
        assert_eq!(n.extract_size("2kg", "weight"), 2.0);
        assert_eq!(n.extract_size("6 pieces", "count"), 6.0);
        // Pattern matches but the unit has no "weight" tag: raw value
        assert_eq!(n.extract_size("500g", "kg"), 500.0);
    }

    #[test]
    fn size_first_pattern_wins() {
        let n = normalizer();
        // The gram pattern needs "g" right after the digits, so "1kg" falls through to kg.
        assert_eq!(n.extract_size("1kg", "weight"), 1.0);
        // "250 grams" hits the first pattern
        assert_eq!(n.extract_size("250 grams", "weight"), 0.25);
    }

    #[test]
    fn size_fallbacks() {
        let n = normalizer();
        assert_eq!(n.extract_size("pack of 12", "each"), 12.0);
        assert_eq!(n.extract_size("1,000 ml", "ml"), 1000.0);
        assert_eq!(n.extract_size("family pack", "each"), 1.0);
    }

    #[test]
    fn unparseable_capture_falls_through() {
        let rules = RuleSet {
            size_patterns: vec![
                SizePattern { pattern: r"(x+)".into(), unit_type: String::new(), conversion: 1.0 },
                SizePattern { pattern: r"no-capture".into(), unit_type: String::new(), conversion: 1.0 },
                SizePattern { pattern: r"(\d+)\s*l".into(), unit_type: "liter".into(), conversion: 1.0 },
            ],
            ..RuleSet::default()
        };
        let n = Normalizer::new(&rules).unwrap();
        assert_eq!(n.extract_size("xx 2 l", "liter"), 2.0);
        assert_eq!(n.extract_size("no-capture 7", "each"), 7.0);
    }

    #[test]
    fn full_listing() {
        let n = normalizer();
        let mut r = raw("Organic Tomatoes", "₹90.00", "weight", "500g");
        r.brand = "Farm 2 Bag".into();
        r.category = "Fresh Vegetables".into();
        let c = n.normalize(&r);
        assert_eq!(c.canonical_name, "tomatoes");
        assert_eq!(c.canonical_brand, "farm2bag");
        assert_eq!(c.canonical_category, "vegetables");
        assert_eq!(c.canonical_unit, "weight");
        assert_eq!(c.canonical_size, 0.5);
        assert_eq!(c.price, 90.0);
        assert_eq!(c.price_per_base_unit, 180.0);
        assert_eq!(c.raw_name, "Organic Tomatoes");
        assert_eq!(c.source_id, "farm2bag");
    }

    #[test]
    fn malformed_fields_use_defaults() {
        let n = normalizer();
        let c = n.normalize(&raw("", "n/a", "", ""));
        assert_eq!(c.canonical_name, "");
        assert_eq!(c.canonical_category, DEFAULT_CATEGORY);
        assert_eq!(c.canonical_unit, DEFAULT_UNIT);
        assert_eq!(c.canonical_size, 1.0);
        assert_eq!(c.price, 0.0);
        assert_eq!(c.price_per_base_unit, 0.0);
    }

    #[test]
    fn zero_size_guards_per_unit_price() {
        let n = normalizer();
        let c = n.normalize(&raw("Milk", "30", "litre", "0"));
        assert_eq!(c.canonical_size, 0.0);
        assert_eq!(c.price_per_base_unit, 0.0);
    }

    #[test]
    fn per_unit_guards() {
        assert_eq!(price_per_base_unit(10.0, 4.0), 2.5);
        assert_eq!(price_per_base_unit(0.0, 4.0), 0.0);
        assert_eq!(price_per_base_unit(10.0, 0.0), 0.0);
        assert_eq!(price_per_base_unit(f64::MAX, 1e-300), 0.0);
        assert_eq!(price_per_base_unit(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn empty_rule_set_still_normalizes() {
        let n = Normalizer::new(&RuleSet::default()).unwrap();
        let c = n.normalize(&raw("  Fresh  Milk ", "$2.50", "Litre", "2 L"));
        assert_eq!(c.canonical_name, "fresh milk");
        assert_eq!(c.canonical_unit, "litre");
        assert_eq!(c.canonical_size, 2.0);
        assert_eq!(c.price_per_base_unit, 1.25);
    }

    #[test]
    fn batch_preserves_order_and_count() {
        let n = normalizer();
        let raws = vec![raw("B", "2", "", ""), raw("", "", "", ""), raw("A", "1", "", "")];
        let out = n.normalize_batch(&raws);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].canonical_name, "b");
        assert_eq!(out[1].canonical_name, "");
        assert_eq!(out[2].canonical_name, "a");
    }

    #[test]
    fn invalid_patterns_rejected() {
        let rules = RuleSet {
            size_patterns: vec![SizePattern {
                pattern: "([0-9]".into(),
                unit_type: String::new(),
                conversion: 1.0,
            }],
            ..RuleSet::default()
        };
        assert!(matches!(
            Normalizer::new(&rules),
            Err(CompareError::InvalidPattern { field: "size_patterns", .. })
        ));

        let rules = RuleSet {
            size_patterns: vec![SizePattern {
                pattern: r"(\d+)".into(),
                unit_type: String::new(),
                conversion: 0.0,
            }],
            ..RuleSet::default()
        };
        assert!(matches!(Normalizer::new(&rules), Err(CompareError::ConfigValidation(_))));
    }

    #[test]
    fn free_functions_compile_rules() {
        let c = normalize(&raw("Premium Ghee", "500", "", ""), &sample_rules()).unwrap();
        assert_eq!(c.canonical_name, "ghee");
        let batch = normalize_batch(&[raw("X", "", "", "")], &RuleSet::default()).unwrap();
        assert_eq!(batch.len(), 1);
    }
}
