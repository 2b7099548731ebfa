//! Crawl orchestration over both listing sources
//!
//! One crawl is a short, fixed itinerary: fetch page 1, lift its embedded
//! listings, discover the pagination API endpoint, then walk API pages
//! until one comes back empty. The orchestrator owns the ordering and the
//! stop conditions; fetching and extraction live in their own modules.

use crate::checkpoint::CheckpointStore;
use crate::config::SiteConfig;
use crate::crawler::{discover_api_endpoint, extract_embedded_listings, Fetcher};
use crate::listing::{normalize, ListingRecord, RawListing};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Outcome of one crawl
#[derive(Debug)]
pub struct CrawlReport {
    /// Every admitted record, embedded listings first, then API pages in
    /// ascending page order
    pub records: Vec<ListingRecord>,

    /// Records that came from the embedded page-1 payload
    pub embedded_count: usize,

    /// API pages successfully fetched, including the empty page that
    /// ended the walk; a page whose fetch fails is not counted
    pub api_pages_fetched: u32,

    /// Whether the pagination endpoint was found in the page-1 HTML
    pub endpoint_resolved: bool,

    /// Set when the first page could not be fetched at all; the crawl
    /// then carries no records
    pub page1_error: Option<String>,
}

impl CrawlReport {
    fn empty_after_page1_failure(error: String) -> Self {
        Self {
            records: Vec::new(),
            embedded_count: 0,
            api_pages_fetched: 0,
            endpoint_resolved: false,
            page1_error: Some(error),
        }
    }
}

/// Shape of one pagination API response. Anything beyond the listing
/// array is ignored.
#[derive(Deserialize)]
struct ApiPage {
    #[serde(default)]
    listings: Option<Vec<RawListing>>,
}

/// Crawler over one configured listing search
///
/// Construction takes the fetcher and checkpoint store ready-made, which
/// keeps the crawl logic independent of how either is set up. The crawler
/// issues one request at a time.
pub struct Crawler {
    fetcher: Fetcher,
    store: CheckpointStore,
    search_url: String,
    origin: String,
    max_pages: u32,
}

impl Crawler {
    /// Creates a crawler for one listing search.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - The fetcher issuing all page requests
    /// * `store` - Visited-URL store consulted and extended during the walk
    /// * `site` - Search URL and origin of the target site
    /// * `max_pages` - Highest API page number to request
    pub fn new(fetcher: Fetcher, store: CheckpointStore, site: &SiteConfig, max_pages: u32) -> Self {
        Self {
            fetcher,
            store,
            search_url: site.search_url.clone(),
            origin: site.origin.clone(),
            max_pages,
        }
    }

    /// Runs the crawl to completion and reports what it gathered.
    ///
    /// Fetch and extraction failures never escape: a dead first page
    /// yields an empty report carrying the error text, a missing embedded
    /// payload yields zero embedded records, and an unresolved endpoint
    /// ends the crawl with the embedded records only. The error that does
    /// escape is a checkpoint store failure, since continuing without the
    /// visited set would re-emit old listings.
    pub async fn crawl(&self) -> crate::Result<CrawlReport> {
        info!(url = %self.search_url, "fetching first search page");
        let html = match self.fetcher.fetch(&self.search_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("first search page unavailable, nothing to ingest: {e}");
                return Ok(CrawlReport::empty_after_page1_failure(e.to_string()));
            }
        };
        self.fetcher.archive("page1.html", &html);

        let embedded = match extract_embedded_listings(&html) {
            Ok(items) => self.admit(normalize(items, &self.origin), false)?,
            Err(e) => {
                warn!("embedded listings unavailable: {e}");
                Vec::new()
            }
        };
        let embedded_count = embedded.len();
        info!(count = embedded_count, "embedded listings admitted");

        let mut records = embedded;

        let template = match discover_api_endpoint(&html, &self.origin) {
            Ok(template) => template,
            Err(e) => {
                warn!("pagination endpoint not resolved, keeping first-page listings only: {e}");
                return Ok(CrawlReport {
                    records,
                    embedded_count,
                    api_pages_fetched: 0,
                    endpoint_resolved: false,
                    page1_error: None,
                });
            }
        };

        let mut api_pages_fetched = 0;
        for page in 2..=self.max_pages {
            let url = template.page_url(page);
            info!(page, url = %url, "fetching API page");

            let body = match self.fetcher.fetch(url.as_str()).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(page, "API page unavailable, stopping pagination: {e}");
                    break;
                }
            };
            api_pages_fetched += 1;

            // The stop condition looks at the page as served, before any
            // already-seen listings are filtered out
            let items = parse_api_listings(&body);
            if items.is_empty() {
                info!(page, "empty API page, pagination complete");
                break;
            }

            let admitted = self.admit(normalize(items, &self.origin), true)?;
            debug!(page, admitted = admitted.len(), "API page admitted");
            records.extend(admitted);

            self.fetcher.pause().await;
        }

        info!(
            total = records.len(),
            embedded = embedded_count,
            api_pages = api_pages_fetched,
            "crawl finished"
        );

        Ok(CrawlReport {
            records,
            embedded_count,
            api_pages_fetched,
            endpoint_resolved: true,
            page1_error: None,
        })
    }

    /// Filters out records whose URL the store has already seen, keeping
    /// page order. With `mark` set, newly admitted URLs are written to the
    /// store; embedded page-1 records pass with `mark` unset so a later
    /// API appearance of the same listing still registers.
    ///
    /// Records without a URL cannot be deduplicated and always pass.
    fn admit(
        &self,
        records: Vec<ListingRecord>,
        mark: bool,
    ) -> crate::Result<Vec<ListingRecord>> {
        let mut admitted = Vec::with_capacity(records.len());
        for record in records {
            let Some(url) = record.detail_url.as_deref() else {
                admitted.push(record);
                continue;
            };
            if self.store.has_seen(url)? {
                debug!(url, "already ingested, skipping");
                continue;
            }
            if mark {
                self.store.mark_seen(url)?;
            }
            admitted.push(record);
        }
        Ok(admitted)
    }
}

/// Parses one API response body into its listing items.
///
/// A body that is not JSON, or JSON without a listing array, reads as an
/// empty page, which ends pagination upstream instead of aborting the
/// crawl.
fn parse_api_listings(body: &str) -> Vec<RawListing> {
    match serde_json::from_str::<ApiPage>(body) {
        Ok(page) => page.listings.unwrap_or_default(),
        Err(e) => {
            warn!("API page body was not parseable, treating as end of results: {e}");
            Vec::new()
        }
    }
}
