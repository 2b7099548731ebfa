//! Discovery of the pagination API endpoint and page URL templating
//!
//! Page 1 of the search embeds the URL of the JSON API that serves pages
//! 2 and up. This module scans the HTML for that endpoint, normalizes it
//! into a template with the page parameter removed, and stamps out
//! concrete page URLs on demand.

use crate::crawler::ExtractError;
use url::Url;

/// JSON key whose value carries the API endpoint URL.
pub const ENDPOINT_KEY: &str = "\"apiEndpoint\"";

/// Substring that distinguishes the listing-search endpoint from the
/// site's other embedded endpoints.
pub const ENDPOINT_SIGNATURE: &str = "propertySearchListingJSON";

const PAGE_PARAM: &str = "page";

/// A pagination endpoint with its page parameter held open.
///
/// Built once from the discovered endpoint URL; [`page_url`] then yields
/// concrete URLs carrying exactly one `page` parameter each, no matter
/// what page number the discovered URL happened to mention.
///
/// [`page_url`]: ApiEndpointTemplate::page_url
#[derive(Debug, Clone)]
pub struct ApiEndpointTemplate {
    base: Url,
}

impl ApiEndpointTemplate {
    /// Builds a template from a discovered endpoint value.
    ///
    /// Site-relative values (leading `/`) are joined against `origin`.
    /// Any `page` parameter already present is stripped; all other query
    /// parameters survive in order.
    pub fn new(raw: &str, origin: &str) -> Result<Self, ExtractError> {
        let absolute = if raw.starts_with('/') {
            format!("{origin}{raw}")
        } else {
            raw.to_string()
        };

        let mut base = Url::parse(&absolute).map_err(|source| ExtractError::BadEndpointUrl {
            raw: raw.to_string(),
            source,
        })?;

        let kept: Vec<(String, String)> = base
            .query_pairs()
            .filter(|(key, _)| key != PAGE_PARAM)
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();

        base.query_pairs_mut().clear().extend_pairs(&kept);
        if kept.is_empty() {
            base.set_query(None);
        }

        Ok(Self { base })
    }

    /// URL for one concrete API page.
    pub fn page_url(&self, page: u32) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair(PAGE_PARAM, &page.to_string());
        url
    }
}

/// Locates the listing-search API endpoint in the page-1 HTML.
///
/// Scans for `"apiEndpoint"` keys and accepts the first one whose quoted
/// value mentions the listing-search signature.
///
/// # Arguments
///
/// * `html` - The full HTML body of the first search page
/// * `origin` - Site origin for joining site-relative endpoint values
///
/// # Returns
///
/// * `Ok(ApiEndpointTemplate)` - Template ready to stamp out page URLs
/// * `Err(ExtractError::EndpointNotResolved)` - No matching endpoint in
///   the document
/// * `Err(ExtractError::BadEndpointUrl)` - The discovered value is not a
///   parseable URL
pub fn discover_api_endpoint(
    html: &str,
    origin: &str,
) -> Result<ApiEndpointTemplate, ExtractError> {
    let raw = find_endpoint_value(html).ok_or(ExtractError::EndpointNotResolved)?;
    ApiEndpointTemplate::new(&raw, origin)
}

fn find_endpoint_value(html: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(found) = html[search_from..].find(ENDPOINT_KEY) {
        let key_end = search_from + found + ENDPOINT_KEY.len();

        if let Some(value) = quoted_value_after(&html[key_end..]) {
            if value.contains(ENDPOINT_SIGNATURE) {
                return Some(value);
            }
        }

        search_from = key_end;
    }
    None
}

/// Reads the `: "value"` following an endpoint key, tolerating whitespace
/// around the colon.
fn quoted_value_after(rest: &str) -> Option<String> {
    let rest = rest.trim_start().strip_prefix(':')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let end = rest.find('"')?;
    Some(rest[..end].to_string())
}
