//! DuckDuckGo search engine implementation.
//!
//! Uses DuckDuckGo HTML search (no API key required).

use std::collections::HashSet;

use regex::Regex;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER, UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use scraper::{Html, Selector};

use crate::scraping::config::ScrapingConfig;
use crate::scraping::engines::WebSearch;
use crate::scraping::error::ScrapingError;
use crate::scraping::types::ScrapeFuture;
use crate::scraping::urls::{clean_url, host_of, is_allowed_host, is_denied_host};

/// Base URL for DuckDuckGo HTML search.
const DDG_HTML_URL: &str = "https://html.duckduckgo.com/html/";

/// Result anchors on the HTML results page.
const RESULT_LINK_SELECTOR: &str = "a.result__a";

/// Permissive scan used when the result markup changes.
const RAW_HREF_PATTERN: &str = r#"href=["'](https?://[^"']+)["']"#;

/// Filters applied to every candidate link.
#[derive(Clone, Debug)]
struct LinkFilter {
    allowed_suffixes: Vec<String>,
    denied_hosts: Vec<String>,
    max_results: usize,
}

impl LinkFilter {
    fn from_config(config: &ScrapingConfig) -> Self {
        Self {
            allowed_suffixes: config.allowed_suffixes.clone(),
            denied_hosts: config.denied_hosts.clone(),
            max_results: config.max_results,
        }
    }

    /// Clean a raw href and decide whether it is a usable candidate.
    fn accept(&self, href: &str) -> Option<String> {
        let url = clean_url(href)?;
        let host = host_of(&url)?;
        if is_denied_host(&host, &self.denied_hosts) {
            return None;
        }
        if !is_allowed_host(&host, &self.allowed_suffixes) {
            return None;
        }
        Some(url)
    }

    /// Keep accepted, first-seen links in order, up to the result limit.
    fn collect<'h>(&self, hrefs: impl Iterator<Item = &'h str>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for href in hrefs {
            if urls.len() >= self.max_results {
                break;
            }
            if let Some(url) = self.accept(href) {
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }
        urls
    }
}

/// DuckDuckGo HTML search client.
pub struct DuckDuckGo {
    client: reqwest::Client,
    region: String,
    time_filter: String,
    filter: LinkFilter,
    raw_href: Regex,
}

impl DuckDuckGo {
    /// Create a client from the scraping configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ScrapingConfig) -> Result<Self, ScrapingError> {
        Ok(Self {
            client: build_client(config)?,
            region: config.region.clone(),
            time_filter: config.time_filter.clone(),
            filter: LinkFilter::from_config(config),
            raw_href: Regex::new(RAW_HREF_PATTERN)?,
        })
    }

    /// Perform a search and return candidate URLs.
    ///
    /// # Errors
    /// Returns an error if the request fails or the engine answers with an error status.
    pub async fn try_search(&self, query: &str) -> Result<Vec<String>, ScrapingError> {
        let params = build_params(query, &self.region, &self.time_filter);

        let response = self.client.post(DDG_HTML_URL).form(&params).send().await?;

        if !response.status().is_success() {
            return Err(ScrapingError::Status {
                target: "DuckDuckGo".to_string(),
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await?;
        parse_results(&html, &self.filter, &self.raw_href)
    }
}

impl WebSearch for DuckDuckGo {
    fn name(&self) -> &'static str {
        "DuckDuckGo"
    }

    fn search<'a>(&'a self, query: &'a str) -> ScrapeFuture<'a, Vec<String>> {
        Box::pin(async move {
            tracing::info!("DDG query: {query}");
            match self.try_search(query).await {
                Ok(urls) => urls,
                Err(e) => {
                    tracing::error!("Search error: {e}");
                    Vec::new()
                }
            }
        })
    }
}

/// Build an HTTP client with browser-like headers for the results page.
fn build_client(config: &ScrapingConfig) -> Result<reqwest::Client, ScrapingError> {
    let mut headers = HeaderMap::new();

    if let Ok(ua) = HeaderValue::from_str(&config.search_user_agent) {
        headers.insert(USER_AGENT, ua);
    }
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(REFERER, HeaderValue::from_static("https://duckduckgo.com/"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(config.search_timeout)
        .connect_timeout(config.connect_timeout)
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
        .map_err(|e| ScrapingError::HttpClient(e.to_string()))
}

/// Build form parameters for DuckDuckGo search.
fn build_params(query: &str, region: &str, time_filter: &str) -> Vec<(&'static str, String)> {
    let mut params = vec![("q", query.to_string()), ("kl", region.to_string())];
    if !time_filter.is_empty() {
        params.push(("df", time_filter.to_string()));
    }
    params
}

/// Parse DuckDuckGo HTML results, falling back to a raw href scan.
fn parse_results(
    html: &str,
    filter: &LinkFilter,
    raw_href: &Regex,
) -> Result<Vec<String>, ScrapingError> {
    let selector = Selector::parse(RESULT_LINK_SELECTOR)
        .map_err(|e| ScrapingError::HtmlParse(format!("Invalid selector: {e:?}")))?;

    let urls = {
        let document = Html::parse_document(html);
        filter.collect(
            document
                .select(&selector)
                .filter_map(|anchor| anchor.value().attr("href")),
        )
    };

    if !urls.is_empty() {
        return Ok(urls);
    }

    let fallback = filter.collect(
        raw_href
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str()),
    );
    if fallback.is_empty() {
        tracing::warn!("No results found in DuckDuckGo HTML response");
    } else {
        tracing::debug!("Result anchors missing, recovered {} links by scan", fallback.len());
    }

    Ok(fallback)
}
