//! Search engine implementations.

pub mod duckduckgo;

pub use duckduckgo::DuckDuckGo;

use crate::scraping::types::ScrapeFuture;

/// Web search backend returning candidate page URLs.
///
/// Implementations are best-effort: any failure yields an empty list.
pub trait WebSearch: Send + Sync {
    /// Display name of the engine, used in logs.
    fn name(&self) -> &'static str;

    /// Search for `query` and return distinct absolute URLs in result order.
    fn search<'a>(&'a self, query: &'a str) -> ScrapeFuture<'a, Vec<String>>;
}
