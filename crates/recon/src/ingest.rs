//! Raw listing ingestion helpers: the shared free-text price parser and a CSV
//! loader that maps source columns onto [`RawListing`] fields.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;

use crate::config::ColumnMapping;
use crate::error::CompareError;
use crate::model::RawListing;

const CURRENCY_SYMBOLS: [char; 4] = ['₹', '$', '€', '£'];

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+\.?[0-9]*").expect("static number pattern"))
}

/// First decimal-or-integer substring of `text`, if any.
pub(crate) fn first_number(text: &str) -> Option<f64> {
    number_re()
        .find(text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse a free-text price ("₹1,299.00", "$ 45", "Rs. 30/kg") into a
/// non-negative amount. Anything without a digit is 0.0.
pub fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',')
        .collect();
    match first_number(cleaned.trim()) {
        Some(value) => value,
        None => {
            if !text.trim().is_empty() {
                log::warn!("no numeric value in price '{text}', using 0.0");
            }
            0.0
        }
    }
}

/// Parse an availability flag. Unrecognized text counts as available.
pub fn parse_availability(text: &str) -> bool {
    !matches!(
        text.trim().to_lowercase().as_str(),
        "false" | "no" | "n" | "0" | "out of stock" | "unavailable" | "sold out"
    )
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_observed_at(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Load CSV text into raw listings for `source_id`.
///
/// Only the name column is required. Missing optional columns produce empty
/// strings, `availability = true` and `observed_at_default`.
pub fn load_csv_listings(
    source_id: &str,
    csv_data: &str,
    columns: &ColumnMapping,
    observed_at_default: DateTime<Utc>,
) -> Result<Vec<RawListing>, CompareError> {
    let csv_err = |e: csv::Error| CompareError::Csv {
        source: source_id.into(),
        message: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| headers.iter().position(|h| h == name);

    let name_idx = idx(&columns.name).ok_or_else(|| CompareError::MissingColumn {
        source: source_id.into(),
        column: columns.name.clone(),
    })?;
    let price_idx = idx(&columns.price);
    let unit_idx = idx(&columns.unit);
    let size_idx = idx(&columns.size);
    let category_idx = idx(&columns.category);
    let brand_idx = idx(&columns.brand);
    let url_idx = idx(&columns.url);
    let image_idx = idx(&columns.image_url);
    let availability_idx = idx(&columns.availability);
    let observed_idx = idx(&columns.observed_at);

    let mut listings = Vec::new();

    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let field = |i: Option<usize>| -> String {
            i.and_then(|i| record.get(i)).unwrap_or("").to_string()
        };
        let optional = |i: Option<usize>| -> Option<String> {
            i.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let mut listing = RawListing::new(source_id, observed_at_default);
        listing.name = field(Some(name_idx));
        listing.price = field(price_idx);
        listing.unit = field(unit_idx);
        listing.size = field(size_idx);
        listing.category = field(category_idx);
        listing.brand = field(brand_idx);
        listing.url = optional(url_idx);
        listing.image_url = optional(image_idx);
        listing.availability = optional(availability_idx)
            .map(|v| parse_availability(&v))
            .unwrap_or(true);
        listing.observed_at = optional(observed_idx)
            .and_then(|v| parse_observed_at(&v))
            .unwrap_or(observed_at_default);

        listings.push(listing);
    }

    log::debug!("source '{source_id}': loaded {} raw listings", listings.len());
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn default_ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn price_with_symbols_and_separators() {
        assert_eq!(parse_price("₹1,299.50"), 1299.5);
        assert_eq!(parse_price("$ 45"), 45.0);
        assert_eq!(parse_price("€3.20"), 3.2);
        assert_eq!(parse_price("Rs. 30 / kg"), 30.0);
        assert_eq!(parse_price("12."), 12.0);
    }

    #[test]
    fn price_without_digits_is_zero() {
        assert_eq!(parse_price(""), 0.0);
        assert_eq!(parse_price("call for price"), 0.0);
        assert_eq!(parse_price("₹"), 0.0);
    }

    #[test]
    fn price_ignores_sign() {
        // The leading '-' is not part of the numeric pattern.
        assert_eq!(parse_price("-5.00"), 5.0);
    }

    #[test]
    fn availability_flags() {
        assert!(parse_availability("true"));
        assert!(parse_availability("In Stock"));
        assert!(parse_availability("whatever"));
        assert!(!parse_availability("Out of Stock"));
        assert!(!parse_availability("0"));
        assert!(!parse_availability(" NO "));
    }

    #[test]
    fn observed_at_formats() {
        let ts = parse_observed_at("2026-03-02T08:30:00+05:30").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 3, 2, 3, 0, 0).unwrap());
        let day = parse_observed_at("2026-03-02").unwrap();
        assert_eq!(day, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
        assert!(parse_observed_at("yesterday").is_none());
    }

    #[test]
    fn load_csv_basic() {
        let csv = "\
name,price,unit,size,category,brand,url,availability,observed_at
Organic Tomatoes,₹45.00,kg,1,Vegetables,Farm2bag,https://f2b.example/tom,true,2026-03-02
Basmati Rice,\"1,150\",kg,5kg,Grains,India Gate,,no,
";
        let rows = load_csv_listings("farm2bag", csv, &ColumnMapping::default(), default_ts()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].source_id, "farm2bag");
        assert_eq!(rows[0].name, "Organic Tomatoes");
        assert_eq!(rows[0].price, "₹45.00");
        assert_eq!(rows[0].url.as_deref(), Some("https://f2b.example/tom"));
        assert!(rows[0].availability);
        assert_eq!(rows[0].observed_at, Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());

        assert_eq!(rows[1].price, "1,150");
        assert_eq!(rows[1].url, None);
        assert!(!rows[1].availability);
        assert_eq!(rows[1].observed_at, default_ts());
    }

    #[test]
    fn load_csv_only_name_required() {
        let csv = "name\nBread\n";
        let rows = load_csv_listings("s", csv, &ColumnMapping::default(), default_ts()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].price, "");
        assert_eq!(rows[0].unit, "");
        assert!(rows[0].availability);
    }

    #[test]
    fn load_csv_missing_name_column() {
        let csv = "title,price\nBread,20\n";
        let err = load_csv_listings("bigbasket", csv, &ColumnMapping::default(), default_ts())
            .unwrap_err();
        assert!(matches!(err, CompareError::MissingColumn { ref column, .. } if column == "name"));
        assert!(err.to_string().contains("bigbasket"));
    }

    #[test]
    fn load_csv_with_column_mapping() {
        let csv = "title,mrp\nBread,₹28\n";
        let columns = ColumnMapping {
            name: "title".into(),
            price: "mrp".into(),
            ..ColumnMapping::default()
        };
        let rows = load_csv_listings("jiomart", csv, &columns, default_ts()).unwrap();
        assert_eq!(rows[0].name, "Bread");
        assert_eq!(parse_price(&rows[0].price), 28.0);
    }

    #[test]
    fn load_csv_ragged_row_is_an_error() {
        let csv = "name,price\nBread,20,extra\n";
        let err = load_csv_listings("s", csv, &ColumnMapping::default(), default_ts()).unwrap_err();
        assert!(matches!(err, CompareError::Csv { .. }));
    }
}
