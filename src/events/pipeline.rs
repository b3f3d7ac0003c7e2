//! Event discovery pipeline.
//!
//! Drives search, page extraction, title validation, LLM field extraction and
//! date normalization over the candidate URLs of one query, strictly one URL
//! at a time with a pacing delay between fetches.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::dates::DateNormalizer;
use crate::events::extractor::FieldExtractor;
use crate::events::record::EventRecord;
use crate::events::title::is_valid_title;
use crate::llm::LanguageModel;
use crate::scraping::{PageContent, ScrapingService};

/// Placeholder replaced by the user query in [`PipelineConfig::short_query_template`].
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// Errors raised while assembling a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A date pattern failed to compile.
    #[error("date pattern error: {0}")]
    Regex(#[from] regex::Error),
    /// Invalid pipeline configuration.
    #[error("invalid pipeline configuration: {0}")]
    Config(String),
}

/// Orchestrator settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Delay between consecutive page fetches (milliseconds).
    pub pacing_ms: u64,
    /// Template used to widen short queries; must contain `{query}`.
    pub short_query_template: String,
    /// Queries with fewer words than this are widened with the template.
    pub min_query_words: usize,
    /// Maximum description length kept from the model, in characters.
    pub description_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 1000,
            short_query_template: "IT-мероприятия в Санкт-Петербурге для {query}".to_string(),
            min_query_words: 3,
            description_max_chars: 250,
        }
    }
}

impl PipelineConfig {
    /// Pacing delay as a duration.
    #[must_use]
    pub const fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if the template lacks the query placeholder or the description cap is zero.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if !self.short_query_template.contains(QUERY_PLACEHOLDER) {
            return Err(PipelineError::Config(format!(
                "short_query_template must contain {QUERY_PLACEHOLDER}"
            )));
        }
        if self.description_max_chars == 0 {
            return Err(PipelineError::Config(
                "description_max_chars must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Terminal state of one candidate URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UrlOutcome {
    /// The page produced an event.
    Accepted(Box<EventRecord>),
    /// Page title or model-returned event name failed validation.
    SkippedInvalidTitle,
    /// The event started before the run began.
    SkippedPastDate(NaiveDate),
    /// Processing the URL failed unexpectedly.
    SkippedError(String),
}

/// Per-run tally of URL outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// Candidate URLs processed.
    pub urls: usize,
    /// Events accepted.
    pub accepted: usize,
    /// URLs rejected on title.
    pub skipped_invalid_title: usize,
    /// URLs rejected as past events.
    pub skipped_past_date: usize,
    /// URLs that failed unexpectedly.
    pub skipped_error: usize,
}

impl PipelineStats {
    fn record(&mut self, outcome: &UrlOutcome) {
        self.urls += 1;
        match outcome {
            UrlOutcome::Accepted(_) => self.accepted += 1,
            UrlOutcome::SkippedInvalidTitle => self.skipped_invalid_title += 1,
            UrlOutcome::SkippedPastDate(_) => self.skipped_past_date += 1,
            UrlOutcome::SkippedError(_) => self.skipped_error += 1,
        }
    }
}

impl fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} accepted of {} URLs (invalid title: {}, past: {}, errors: {})",
            self.accepted,
            self.urls,
            self.skipped_invalid_title,
            self.skipped_past_date,
            self.skipped_error
        )
    }
}

/// Accepted events of one run, in URL order.
#[derive(Clone, Debug, Default)]
pub struct EventBatch {
    /// Accepted events; immutable once the run ends.
    pub events: Arc<[EventRecord]>,
    /// Outcome tally.
    pub stats: PipelineStats,
}

impl EventBatch {
    /// Whether no event was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

struct Processed {
    outcome: UrlOutcome,
    fetched: bool,
}

/// Sequential event discovery over search results.
pub struct EventPipeline {
    scraping: ScrapingService,
    extractor: FieldExtractor,
    dates: DateNormalizer,
    config: PipelineConfig,
}

impl EventPipeline {
    /// Create a pipeline over a scraping service and a language model.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the date patterns fail to compile.
    pub fn new(
        scraping: ScrapingService,
        model: Arc<dyn LanguageModel>,
        config: PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            scraping,
            extractor: FieldExtractor::new(model, config.description_max_chars),
            dates: DateNormalizer::new()?,
            config,
        })
    }

    /// Scraping service behind the pipeline.
    #[must_use]
    pub const fn scraping(&self) -> &ScrapingService {
        &self.scraping
    }

    /// Widen queries shorter than the configured word count with the template.
    #[must_use]
    pub fn rewrite_query(&self, query: &str) -> String {
        let query = query.trim();
        if query.split_whitespace().count() < self.config.min_query_words {
            self.config
                .short_query_template
                .replace(QUERY_PLACEHOLDER, query)
        } else {
            query.to_string()
        }
    }

    /// Entry point for callers: rewrite short queries, then run the pipeline.
    pub async fn get_events(&self, query: &str) -> EventBatch {
        let query = self.rewrite_query(query);
        self.run(&query).await
    }

    /// Run the pipeline for a query as-is. Never fails; the worst case is an empty batch.
    pub async fn run(&self, query: &str) -> EventBatch {
        let now = Local::now();
        let today = now.date_naive();
        let current_year = now.year();

        tracing::info!("Searching events for: {query}");
        let urls = self.scraping.get_or_search(query).await;
        if urls.is_empty() {
            tracing::warn!("No URLs found for query: {query}");
            return EventBatch::default();
        }
        tracing::info!("Found {} URLs to process", urls.len());

        let pacing = self.config.pacing();
        let mut events = Vec::new();
        let mut stats = PipelineStats::default();

        for (index, url) in urls.iter().enumerate() {
            let result = AssertUnwindSafe(self.process_url(url, today, current_year))
                .catch_unwind()
                .await;

            let processed = result.unwrap_or_else(|panic| {
                let reason = panic_message(panic.as_ref());
                tracing::error!("Failed to process {url}: {reason}");
                Processed {
                    outcome: UrlOutcome::SkippedError(reason),
                    fetched: true,
                }
            });

            stats.record(&processed.outcome);
            if let UrlOutcome::Accepted(record) = processed.outcome {
                events.push(*record);
            }

            let more = index + 1 < urls.len();
            if processed.fetched && more && !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }

        tracing::info!("Pipeline finished: {stats}");
        EventBatch {
            events: events.into(),
            stats,
        }
    }

    async fn process_url(&self, url: &str, today: NaiveDate, current_year: i32) -> Processed {
        let (page, fetched) = match self.scraping.scrape_page(url).await {
            Some(page) => (page, true),
            None => (PageContent::empty(url), false),
        };
        let done = |outcome| Processed { outcome, fetched };

        if !is_valid_title(&page.title) {
            tracing::warn!("Skipping {url}: invalid page title '{}'", page.title);
            return done(UrlOutcome::SkippedInvalidTitle);
        }

        let mut record = self.extractor.extract(&page, current_year).await;
        if record.has_no_fields() {
            tracing::warn!("Skipping {url}: no event fields extracted");
            return done(UrlOutcome::SkippedInvalidTitle);
        }
        if !is_valid_title(&record.event_name) {
            tracing::warn!("Skipping {url}: invalid event name '{}'", record.event_name);
            return done(UrlOutcome::SkippedInvalidTitle);
        }

        self.resolve_dates(&mut record, current_year);
        if let Some(date) = past_start(record.parsed_date, today) {
            tracing::warn!("Skipping past event '{}' ({date})", record.event_name);
            return done(UrlOutcome::SkippedPastDate(date));
        }

        tracing::info!(
            "Added event: {} [{}]",
            record.event_name,
            record.event_type_label()
        );
        done(UrlOutcome::Accepted(Box::new(record)))
    }

    /// Canonicalize start and end dates; backfill the year from a resolved start date.
    fn resolve_dates(&self, record: &mut EventRecord, current_year: i32) {
        let fallback_year = record.year.trim().parse().unwrap_or(current_year);

        if let Some((date, text)) = self.dates.normalize(&record.start_date, Some(fallback_year)) {
            record.start_date = text;
            record.parsed_date = Some(date);
            if record.year.is_empty() {
                record.year = date.year().to_string();
            }
        }

        if let Some((_, text)) = self.dates.normalize(&record.end_date, Some(fallback_year)) {
            record.end_date = text;
        }
    }
}

/// The resolved start date, when strictly before `today`.
fn past_start(parsed: Option<NaiveDate>, today: NaiveDate) -> Option<NaiveDate> {
    parsed.filter(|date| *date < today)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
