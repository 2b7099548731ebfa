//! Crawler module for listing-site ingestion
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry, backoff, and politeness pauses
//! - Extraction of page-1 listings from the embedded state payload
//! - Discovery of the pagination API endpoint
//! - The page-walk that stitches both sources into one dataset

mod embedded;
mod endpoint;
mod fetcher;
mod orchestrator;

pub use embedded::{extract_embedded_listings, EMBEDDED_LISTINGS_PATH, EMBEDDED_STATE_MARKER};
pub use endpoint::{discover_api_endpoint, ApiEndpointTemplate, ENDPOINT_KEY, ENDPOINT_SIGNATURE};
pub use fetcher::{build_http_client, Fetcher};
pub use orchestrator::{CrawlReport, Crawler};

use thiserror::Error;

/// Errors from fetching a single URL
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request never produced a response (DNS, connect, timeout, body read)
    #[error("request for {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Errors from extracting listings or the API endpoint out of page-1 HTML
#[derive(Error, Debug)]
pub enum ExtractError {
    /// No script in the document carries the embedded state assignment
    #[error("embedded state payload not found in page HTML")]
    EmbeddedPayloadNotFound,

    /// The payload parsed as JSON but a key on the listing path is absent
    #[error("embedded state payload is missing the \"{key}\" key")]
    MalformedPayload { key: &'static str },

    /// No API endpoint with the listing-search signature in the document
    #[error("pagination API endpoint not present in page HTML")]
    EndpointNotResolved,

    /// The embedded payload is not syntactically valid JSON
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The discovered endpoint value does not parse as a URL
    #[error("discovered endpoint {raw:?} is not a valid URL: {source}")]
    BadEndpointUrl {
        raw: String,
        #[source]
        source: url::ParseError,
    },
}
