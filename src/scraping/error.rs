//! Error types for the scraping module.

use thiserror::Error;

/// Errors that can occur during search and page scraping.
#[derive(Debug, Error)]
pub enum ScrapingError {
    /// HTTP request failed (transport, timeout or body decoding).
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client configuration error.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Remote server answered with a non-success status.
    #[error("{target} returned status: {status}")]
    Status {
        /// What was being requested (search engine or page URL).
        target: String,
        /// HTTP status code.
        status: u16,
    },

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// HTML parsing error.
    #[error("HTML parsing error: {0}")]
    HtmlParse(String),

    /// Regex error.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScrapingError {
    /// Whether the error came from the network rather than from local parsing.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::HttpRequest(_) | Self::Status { .. })
    }
}
