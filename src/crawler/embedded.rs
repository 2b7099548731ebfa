//! Extraction of listings from the embedded first-page state payload
//!
//! The first search page inlines its render state as a JavaScript
//! assignment inside a `<script>` tag. This module locates that script,
//! slices out the JSON object on the right of the assignment, and walks a
//! fixed key path down to the listing array.

use crate::crawler::ExtractError;
use crate::listing::RawListing;
use scraper::{Html, Selector};
use serde_json::Value;

/// Marker identifying the script tag that carries the page state.
pub const EMBEDDED_STATE_MARKER: &str = "__PRELOADED_STATE__";

/// Key path from the payload root down to the listing array.
pub const EMBEDDED_LISTINGS_PATH: [&str; 3] = ["searchCity", "searchCityData", "listings"];

/// Extracts the page-1 listing items from an HTML document.
///
/// # Arguments
///
/// * `html` - The full HTML body of the first search page
///
/// # Returns
///
/// * `Ok(Vec<RawListing>)` - The embedded listing items, in page order
/// * `Err(ExtractError::EmbeddedPayloadNotFound)` - No script carries the
///   state assignment
/// * `Err(ExtractError::MalformedPayload)` - The payload parses but lacks
///   a key on the expected path
/// * `Err(ExtractError::Json)` - The payload is not valid JSON
pub fn extract_embedded_listings(html: &str) -> Result<Vec<RawListing>, ExtractError> {
    let payload = find_state_payload(html).ok_or(ExtractError::EmbeddedPayloadNotFound)?;
    let state: Value = serde_json::from_str(&payload)?;

    let mut node = &state;
    for key in EMBEDDED_LISTINGS_PATH {
        node = node.get(key).ok_or(ExtractError::MalformedPayload { key })?;
    }

    Ok(serde_json::from_value(node.clone())?)
}

/// Finds the script carrying the state assignment and returns the JSON
/// text on the right-hand side.
///
/// A script that mentions the marker but contains no assignment after it
/// is skipped, so stray references in analytics snippets do not shadow the
/// real payload.
fn find_state_payload(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script_selector = Selector::parse("script").ok()?;

    for element in document.select(&script_selector) {
        let text: String = element.text().collect();
        let Some(marker_idx) = text.find(EMBEDDED_STATE_MARKER) else {
            continue;
        };

        let after_marker = &text[marker_idx + EMBEDDED_STATE_MARKER.len()..];
        if let Some((_, tail)) = after_marker.split_once('=') {
            return Some(tail.trim().trim_end_matches(';').trim_end().to_string());
        }
    }

    None
}
