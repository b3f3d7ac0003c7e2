//! HTTP route handlers for the events agent API.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::events::archive::{DEFAULT_TOP_K, search_archive};
use crate::events::format::{MAX_MESSAGE_CHARS, format_archive_results, format_events, split_message};
use crate::events::{EventRecord, PipelineStats};

use super::state::AppState;

/// Create the API router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/events", post(find_events))
        .route("/api/search", post(web_search))
        .route("/api/archive", post(archive_search))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cached_searches = state.scraping().cache().entry_count().await;
    Json(serde_json::json!({
        "status": "ok",
        "service": "it-events-agent",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model_name,
        "archive": state.archive.is_some(),
        "cached_searches": cached_searches,
    }))
}

/// Query request shared by the event and search endpoints.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// The user's query.
    pub query: String,
}

/// Event discovery response.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    /// Query actually searched, after short-query widening.
    pub query: String,
    /// Accepted events, in discovery order.
    pub events: Vec<EventRecord>,
    /// Number of events.
    pub count: usize,
    /// Chat-ready messages.
    pub messages: Vec<String>,
    /// Outcome tally of the run.
    pub stats: PipelineStats,
}

/// Handle event discovery requests.
async fn find_events(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<EventsResponse>, (StatusCode, String)> {
    let query = non_empty(&request.query)?;
    let query = state.pipeline.rewrite_query(query);
    let batch = state.pipeline.run(&query).await;

    let messages = split_message(&format_events(&batch.events, true), MAX_MESSAGE_CHARS);
    let events = batch.events.to_vec();

    Ok(Json(EventsResponse {
        query,
        count: events.len(),
        events,
        messages,
        stats: batch.stats,
    }))
}

/// Web search response.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Candidate URLs, served from the cache when fresh.
    pub urls: Vec<String>,
    /// Number of URLs.
    pub count: usize,
}

/// Handle web search requests.
async fn web_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query = non_empty(&request.query)?;
    let urls = state.scraping().get_or_search(query).await;
    let count = urls.len();

    Ok(Json(SearchResponse { urls, count }))
}

/// Archive search request.
#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    /// Free-text description of the wanted event.
    pub query: String,
    /// Maximum number of matches.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

const fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

/// Archive search response.
#[derive(Debug, Serialize)]
pub struct ArchiveResponse {
    /// Distinct matches, best first.
    pub results: Vec<String>,
    /// Number of matches.
    pub count: usize,
    /// Chat-ready rendering of the matches.
    pub message: String,
}

/// Handle archive search requests.
async fn archive_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ArchiveRequest>,
) -> Result<Json<ArchiveResponse>, (StatusCode, String)> {
    let query = non_empty(&request.query)?;
    let Some(archive) = state.archive.as_deref() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "archive search is not configured".to_string(),
        ));
    };

    let results = search_archive(archive, query, request.top_k).await;
    let message = format_archive_results(&results);

    Ok(Json(ArchiveResponse {
        count: results.len(),
        results,
        message,
    }))
}

fn non_empty(query: &str) -> Result<&str, (StatusCode, String)> {
    let query = query.trim();
    if query.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "query must not be empty".to_string()));
    }
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::events::archive::ArchiveFuture;
    use crate::events::format::ARCHIVE_NOTHING_FOUND;
    use crate::events::{ArchiveSearch, EventPipeline, PipelineConfig};
    use crate::llm::{LanguageModel, LlmError, LlmFuture};
    use crate::scraping::types::ScrapeFuture;
    use crate::scraping::{CacheConfig, PageContent, PageSource, ScrapingService, SearchCache, WebSearch};

    struct FixedSearch;

    impl WebSearch for FixedSearch {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn search<'a>(&'a self, _query: &'a str) -> ScrapeFuture<'a, Vec<String>> {
            Box::pin(async { vec!["https://event.ru/".to_string()] })
        }
    }

    struct OnePage;

    impl PageSource for OnePage {
        fn fetch_and_extract<'a>(&'a self, url: &'a str) -> ScrapeFuture<'a, Option<PageContent>> {
            let page = PageContent {
                url: url.to_string(),
                title: "Rust meetup SPb".to_string(),
                ..PageContent::default()
            };
            Box::pin(async move { Some(page) })
        }
    }

    struct EventModel;

    impl LanguageModel for EventModel {
        fn model_name(&self) -> &str {
            "test-model"
        }

        fn complete<'a>(&'a self, _prompt: &'a str) -> LlmFuture<'a, Result<String, LlmError>> {
            Box::pin(async {
                Ok::<_, LlmError>(r#"{"Event Name": "Rust meetup SPb", "Event Type": "Митап"}"#.to_string())
            })
        }
    }

    /// Archive over a fixed ranking, with repeats, that ignores the query.
    struct MemoryArchive(Vec<&'static str>);

    impl ArchiveSearch for MemoryArchive {
        fn search<'a>(&'a self, _query: &'a str, _top_k: usize) -> ArchiveFuture<'a, Vec<String>> {
            let ranked: Vec<String> = self.0.iter().map(|e| (*e).to_string()).collect();
            Box::pin(async move { ranked })
        }
    }

    fn router() -> Router {
        router_with_archive(None)
    }

    fn router_with_archive(archive: Option<Arc<dyn ArchiveSearch>>) -> Router {
        let cache = match SearchCache::new(&CacheConfig::default()) {
            Ok(cache) => Arc::new(cache),
            Err(err) => unreachable!("default cache config rejected: {err}"),
        };
        let scraping = ScrapingService::with_backends(cache, Arc::new(FixedSearch), Arc::new(OnePage));
        let config = PipelineConfig {
            pacing_ms: 0,
            ..PipelineConfig::default()
        };
        let pipeline = match EventPipeline::new(scraping, Arc::new(EventModel), config) {
            Ok(pipeline) => pipeline,
            Err(err) => unreachable!("default pipeline config rejected: {err}"),
        };
        create_router(AppState::with_archive(pipeline, "test-model".to_string(), archive))
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        send_to(router(), request).await
    }

    async fn send_to(router: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = match router.oneshot(request).await {
            Ok(response) => response,
            Err(err) => unreachable!("router is infallible: {err}"),
        };
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap_or_default();
        let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::get("/health").body(Body::empty()).unwrap_or_default();
        let (status, json) = send(request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["archive"], false);
        assert_eq!(json["cached_searches"], 0);
    }

    #[tokio::test]
    async fn test_search_returns_urls() {
        let (status, json) = send(post_json("/api/search", r#"{"query": "rust"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["urls"][0], "https://event.ru/");
    }

    #[tokio::test]
    async fn test_events_returns_records_and_messages() {
        let (status, json) = send(post_json("/api/events", r#"{"query": "rust"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["query"], "IT-мероприятия в Санкт-Петербурге для rust");
        assert_eq!(json["count"], 1);
        assert_eq!(json["events"][0]["Event Name"], "Rust meetup SPb");
        assert_eq!(json["events"][0]["Event Type"], "Meetup");
        assert_eq!(json["events"][0]["Source URL"], "https://event.ru/");
        assert_eq!(json["stats"]["accepted"], 1);
        assert_eq!(json["messages"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let (status, _) = send(post_json("/api/events", r#"{"query": "   "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_archive_returns_distinct_matches_and_message() {
        let archive = MemoryArchive(vec!["DevOops 2024", "DevOops 2024", "Heisenbug <Spring>", "Joker"]);
        let archive: Arc<dyn ArchiveSearch> = Arc::new(archive);
        let router = router_with_archive(Some(archive));

        let request = post_json("/api/archive", r#"{"query": "testing conference", "top_k": 2}"#);
        let (status, json) = send_to(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 2);
        assert_eq!(json["results"][0], "DevOops 2024");
        assert_eq!(json["results"][1], "Heisenbug <Spring>");
        let message = json["message"].as_str().unwrap_or_default();
        assert!(message.contains("1. DevOops 2024"));
        assert!(message.contains("2. Heisenbug &lt;Spring&gt;"));
        assert!(!message.contains("Joker"));
    }

    #[tokio::test]
    async fn test_archive_short_query_reports_nothing_found() {
        let archive: Arc<dyn ArchiveSearch> = Arc::new(MemoryArchive(vec!["Joker"]));
        let router = router_with_archive(Some(archive));

        let (status, json) = send_to(router, post_json("/api/archive", r#"{"query": "j"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
        assert_eq!(json["message"], ARCHIVE_NOTHING_FOUND);
    }

    #[tokio::test]
    async fn test_archive_unavailable_without_backend() {
        let (status, _) = send(post_json("/api/archive", r#"{"query": "rust"}"#)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
