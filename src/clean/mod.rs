//! Schema cleaning of crawled listings
//!
//! Raw records carry price and area as source-formatted text ("₹ 45.5 L",
//! "1,204 sq.ft."). Cleaning parses those into numerics, derives price per
//! square foot, and splits the input into accepted rows and rejected rows.
//! Nothing is dropped silently: every rejected row keeps its index, its
//! detail URL when known, and a typed reason, and the whole reject set is
//! written next to the clean dataset.

use crate::dataset::{self, DatasetResult};
use crate::listing::ListingRecord;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// One accepted cleaned row, ready for model fitting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    /// Asking price in lakhs of rupees (1 lakh = 100,000)
    pub price_lakhs: f64,
    pub area_sqft: f64,
    pub locality: String,
    pub bedrooms: Option<u32>,
    pub price_per_sqft: f64,
}

/// Why a raw row was rejected by cleaning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("missing price")]
    MissingPrice,
    #[error("unparseable price {0:?}")]
    UnparseablePrice(String),
    #[error("missing area")]
    MissingArea,
    #[error("unparseable area {0:?}")]
    UnparseableArea(String),
    #[error("non-positive area")]
    NonPositiveArea,
    #[error("missing locality")]
    MissingLocality,
}

impl RejectReason {
    /// Short stable label for the per-reason summary.
    pub fn label(&self) -> &'static str {
        match self {
            Self::MissingPrice => "missing-price",
            Self::UnparseablePrice(_) => "unparseable-price",
            Self::MissingArea => "missing-area",
            Self::UnparseableArea(_) => "unparseable-area",
            Self::NonPositiveArea => "non-positive-area",
            Self::MissingLocality => "missing-locality",
        }
    }
}

// Rejects go to CSV with the reason rendered as text
impl Serialize for RejectReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One rejected raw row with its evidence.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    /// Zero-based index of the row in the raw dataset
    pub row: usize,
    pub detail_url: Option<String>,
    pub reason: RejectReason,
}

/// Counts from one cleaning run.
#[derive(Debug)]
pub struct CleanSummary {
    pub accepted: usize,
    pub rejected: usize,
}

/// Parses a source-formatted price into lakhs of rupees.
///
/// Accepts the formats the site uses: a number followed by a lakh unit
/// ("₹ 45.5 L", "85 Lac") or a crore unit ("1.2 Cr" = 120 lakhs), with
/// optional currency sign and digit-group commas. Ranges keep their lower
/// bound ("₹ 45 - 60 L" = 45). A bare number carries no unit and is not
/// guessed at.
pub fn parse_price_lakhs(text: &str) -> Option<f64> {
    let cleaned = text.replace('₹', " ").replace(',', "").replace('-', " ");

    let mut value: Option<f64> = None;
    let mut multiplier: Option<f64> = None;
    for token in cleaned.split_whitespace() {
        let (number, suffix) = split_number_suffix(token);
        if value.is_none() {
            if let Ok(parsed) = number.parse::<f64>() {
                value = Some(parsed);
            }
        }
        if multiplier.is_none() {
            multiplier = price_unit_multiplier(suffix);
        }
    }

    Some(value? * multiplier?)
}

/// Parses a source-formatted area into square feet.
///
/// Accepts "1,204 sq.ft." style text and bare numbers. A value in any
/// other unit ("140 sq.yrd", "2 acres") is rejected rather than misread
/// as square feet.
pub fn parse_area_sqft(text: &str) -> Option<f64> {
    let cleaned = text.replace(',', "");

    let mut value: Option<f64> = None;
    let mut unit = String::new();
    for token in cleaned.split_whitespace() {
        let (number, suffix) = split_number_suffix(token);
        if value.is_none() {
            if let Ok(parsed) = number.parse::<f64>() {
                value = Some(parsed);
            }
        }
        unit.extend(suffix.chars().filter(char::is_ascii_alphabetic).flat_map(char::to_lowercase));
    }

    let value = value?;
    match unit.as_str() {
        "" | "sqft" | "sqfeet" | "squarefeet" => Some(value),
        _ => None,
    }
}

/// Splits a glued token like "45.5L" into its numeric and alphabetic parts.
fn split_number_suffix(token: &str) -> (&str, &str) {
    match token.find(|c: char| c.is_ascii_alphabetic()) {
        Some(idx) => (&token[..idx], &token[idx..]),
        None => (token, ""),
    }
}

fn price_unit_multiplier(suffix: &str) -> Option<f64> {
    let unit: String = suffix
        .chars()
        .filter(char::is_ascii_alphabetic)
        .flat_map(char::to_lowercase)
        .collect();
    match unit.as_str() {
        "l" | "lac" | "lacs" | "lakh" | "lakhs" => Some(1.0),
        "cr" | "crore" | "crores" => Some(100.0),
        _ => None,
    }
}

/// Cleans one raw record, or explains why it cannot be used.
fn clean_record(record: &ListingRecord) -> Result<CleanRecord, RejectReason> {
    let price_text = record.price.as_deref().ok_or(RejectReason::MissingPrice)?;
    let price_lakhs = parse_price_lakhs(price_text)
        .ok_or_else(|| RejectReason::UnparseablePrice(price_text.to_string()))?;

    let area_text = record.area.as_deref().ok_or(RejectReason::MissingArea)?;
    let area_sqft = parse_area_sqft(area_text)
        .ok_or_else(|| RejectReason::UnparseableArea(area_text.to_string()))?;
    if area_sqft <= 0.0 {
        return Err(RejectReason::NonPositiveArea);
    }

    let locality = record
        .locality
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(RejectReason::MissingLocality)?;

    Ok(CleanRecord {
        price_lakhs,
        area_sqft,
        locality: locality.to_string(),
        bedrooms: record.bedrooms,
        // price is in lakhs, so scale back to rupees for the ratio
        price_per_sqft: price_lakhs * 1e5 / area_sqft,
    })
}

/// Partitions raw records into accepted and rejected rows.
///
/// Every input row lands in exactly one of the two outputs; both keep the
/// input order.
pub fn partition(records: &[ListingRecord]) -> (Vec<CleanRecord>, Vec<RejectedRow>) {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for (row, record) in records.iter().enumerate() {
        match clean_record(record) {
            Ok(clean) => accepted.push(clean),
            Err(reason) => rejected.push(RejectedRow {
                row,
                detail_url: record.detail_url.clone(),
                reason,
            }),
        }
    }

    (accepted, rejected)
}

/// Path of the rejects file written next to the clean dataset.
pub fn rejects_path(clean_path: &Path) -> PathBuf {
    clean_path.with_extension("rejects.csv")
}

/// Runs the cleaning stage: reads the raw dataset, partitions it, and
/// writes the clean dataset plus its rejects file.
///
/// # Arguments
///
/// * `raw_path` - Crawled raw dataset (CSV of `ListingRecord` rows)
/// * `clean_path` - Destination for accepted rows; rejects land next to it
pub fn run(raw_path: &Path, clean_path: &Path) -> DatasetResult<CleanSummary> {
    let raw: Vec<ListingRecord> = dataset::read_csv(raw_path)?;
    let (accepted, rejected) = partition(&raw);

    dataset::write_csv(clean_path, &accepted)?;
    dataset::write_csv(&rejects_path(clean_path), &rejected)?;

    let mut by_reason: BTreeMap<&'static str, usize> = BTreeMap::new();
    for reject in &rejected {
        *by_reason.entry(reject.reason.label()).or_default() += 1;
    }
    for (label, count) in &by_reason {
        warn!(reason = label, count, "rows rejected");
    }
    info!(
        accepted = accepted.len(),
        rejected = rejected.len(),
        "cleaning finished"
    );

    Ok(CleanSummary {
        accepted: accepted.len(),
        rejected: rejected.len(),
    })
}
