//! Veranda: a patient property-listing pipeline
//!
//! This crate crawls a paginated real-estate search site into a tabular raw
//! dataset, cleans that dataset into a typed schema, fits a simple locality
//! price model on it, and serves price predictions over HTTP.

pub mod checkpoint;
pub mod clean;
pub mod config;
pub mod crawler;
pub mod dataset;
pub mod listing;
pub mod pricing;
pub mod serve;

use thiserror::Error;

/// Main error type for veranda operations
///
/// Fetch and extraction failures never appear here: the crawl absorbs
/// them into its report. What remains are the storage and artifact
/// failures the pipeline stages return.
#[derive(Debug, Error)]
pub enum VerandaError {
    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] dataset::DatasetError),

    #[error("Model error: {0}")]
    Model(#[from] pricing::ModelError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for veranda operations
pub type Result<T> = std::result::Result<T, VerandaError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use checkpoint::CheckpointStore;
pub use config::Config;
pub use crawler::{CrawlReport, Crawler};
pub use listing::ListingRecord;
