use crate::config::types::{Config, CrawlerConfig, OutputConfig, ServeConfig, SiteConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    validate_serve_config(&config.serve)?;
    Ok(())
}

/// Validates target site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let search = Url::parse(&config.search_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search-url: {}", e)))?;

    if search.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(
            "search-url has no host".to_string(),
        ));
    }

    let origin = Url::parse(&config.origin)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid origin: {}", e)))?;

    if origin.host_str().is_none() {
        return Err(ConfigError::InvalidUrl("origin has no host".to_string()));
    }

    // The origin is prepended verbatim to site-relative paths, so a trailing
    // slash would produce double-slash URLs.
    if config.origin.ends_with('/') {
        return Err(ConfigError::Validation(format!(
            "origin must not end with a slash, got '{}'",
            config.origin
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.retry_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "retry-attempts must be >= 1, got {}",
            config.retry_attempts
        )));
    }

    if config.min_pause_ms > config.max_pause_ms {
        return Err(ConfigError::Validation(format!(
            "min-pause-ms ({}) must not exceed max-pause-ms ({})",
            config.min_pause_ms, config.max_pause_ms
        )));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output paths
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let fields = [
        ("raw-path", &config.raw_path),
        ("clean-path", &config.clean_path),
        ("checkpoint-path", &config.checkpoint_path),
        ("html-archive-dir", &config.html_archive_dir),
        ("model-path", &config.model_path),
    ];

    for (name, value) in fields {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates the serve section
fn validate_serve_config(config: &ServeConfig) -> Result<(), ConfigError> {
    config
        .bind_addr
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::Validation(format!("Invalid bind-addr: {}", e)))?;
    Ok(())
}
