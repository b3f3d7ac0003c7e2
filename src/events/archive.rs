//! Archive lookup capability.
//!
//! The archive is a semantic index over past events kept outside this crate.
//! Only the query contract lives here.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

/// Boxed future type for archive lookups.
pub type ArchiveFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default number of archive matches.
pub const DEFAULT_TOP_K: usize = 5;

/// Queries shorter than this (in characters, after trimming) are not searched.
const MIN_QUERY_CHARS: usize = 2;

/// Search over archived events.
pub trait ArchiveSearch: Send + Sync {
    /// Return up to `top_k` archived event identifiers matching `query`, best match first.
    fn search<'a>(&'a self, query: &'a str, top_k: usize) -> ArchiveFuture<'a, Vec<String>>;
}

/// Query the archive, skipping trivial queries and bounding the result count.
///
/// Blank and repeated matches are dropped before the bound applies, so up to
/// `top_k` distinct entries come back in ranking order.
pub async fn search_archive(archive: &dyn ArchiveSearch, query: &str, top_k: usize) -> Vec<String> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_CHARS || top_k == 0 {
        tracing::debug!("Archive query too short: '{query}'");
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut results = archive.search(query, top_k).await;
    results.retain(|entry| !entry.trim().is_empty() && seen.insert(entry.clone()));
    results.truncate(top_k);
    tracing::info!("Archive returned {} results for '{query}'", results.len());
    results
}
