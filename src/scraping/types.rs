//! Core types for scraping results.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// Boxed future type for search and fetch backends.
pub type ScrapeFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Text isolated from one candidate page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Page URL as requested.
    pub url: String,
    /// Preview title (`og:title`, `twitter:title`, `<title>`…).
    pub title: String,
    /// Preview description (`og:description`, `description`).
    pub description: String,
    /// Bounded excerpt of the main textual content.
    pub excerpt: String,
}

impl PageContent {
    /// Content for a page that could not be fetched.
    #[must_use]
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Whether nothing at all was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.excerpt.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_page_content() {
        let content = PageContent::empty("https://example.ru");
        assert_eq!(content.url, "https://example.ru");
        assert!(content.is_empty());
    }

    #[test]
    fn test_non_empty_page_content() {
        let content = PageContent {
            title: "Highload++ 2025".to_string(),
            ..PageContent::empty("https://highload.ru")
        };
        assert!(!content.is_empty());
    }
}
