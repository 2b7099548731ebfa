//! Canonical listing records and source-item normalization
//!
//! Both extraction strategies produce the same loosely-shaped JSON items.
//! This module maps those items into the canonical [`ListingRecord`] shape,
//! keeping absent source fields as explicit `None` values rather than
//! substituting sentinels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One listing item as it appears in the source payloads.
///
/// Every field is optional; unknown keys are ignored. The site has shipped
/// numeric prices and stringly-typed bedroom counts at different times, so
/// the shape-sensitive fields deserialize leniently instead of failing the
/// whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawListing {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "lenient_string")]
    pub price: Option<String>,

    /// The source calls the area field "size"
    #[serde(default, rename = "size", deserialize_with = "lenient_string")]
    pub area: Option<String>,

    #[serde(default)]
    pub locality: Option<String>,

    /// Bedroom count, "2 BHK" style
    #[serde(default, deserialize_with = "lenient_u32")]
    pub bhk: Option<u32>,

    #[serde(default)]
    pub url: Option<String>,
}

/// One crawled property listing in canonical form.
///
/// Constructed once during normalization and immutable afterwards. When
/// present, `detail_url` is always absolute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub title: Option<String>,
    /// Source-formatted price text, e.g. "₹ 45.5 L"; not guaranteed numeric
    pub price: Option<String>,
    /// Source-formatted area text, e.g. "1,204 sq.ft."
    pub area: Option<String>,
    pub locality: Option<String>,
    pub bedrooms: Option<u32>,
    pub detail_url: Option<String>,
    /// Assigned at normalization time; the source carries no reliable timestamp
    pub scraped_at: DateTime<Utc>,
}

/// Rewrites a source URL field into absolute form.
///
/// Site-relative paths (leading `/`) are prefixed with the configured origin;
/// anything else non-empty passes through verbatim. Absent or empty fields
/// stay missing.
pub fn normalize_detail_url(raw: Option<&str>, origin: &str) -> Option<String> {
    match raw {
        None => None,
        Some("") => None,
        Some(path) if path.starts_with('/') => Some(format!("{}{}", origin, path)),
        Some(absolute) => Some(absolute.to_string()),
    }
}

/// Maps one source item into a [`ListingRecord`] stamped with the current
/// UTC time.
pub fn normalize_item(item: RawListing, origin: &str) -> ListingRecord {
    ListingRecord {
        title: item.title,
        price: item.price,
        area: item.area,
        locality: item.locality,
        bedrooms: item.bhk,
        detail_url: normalize_detail_url(item.url.as_deref(), origin),
        scraped_at: Utc::now(),
    }
}

/// Maps a page worth of source items, preserving item order.
pub fn normalize(items: Vec<RawListing>, origin: &str) -> Vec<ListingRecord> {
    items
        .into_iter()
        .map(|item| normalize_item(item, origin))
        .collect()
}

/// Accepts a JSON string or number, yielding its text form.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }))
}

/// Accepts a JSON number or numeric string; anything else becomes `None`.
fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}
