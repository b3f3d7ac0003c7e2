//! Page fetching and main-content extraction.

use reqwest::header::{ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use crate::scraping::config::ScrapingConfig;
use crate::scraping::error::ScrapingError;
use crate::scraping::types::{PageContent, ScrapeFuture};

/// Elements whose text never belongs to the excerpt.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "head", "header", "footer", "nav",
];

/// Main-content containers, most specific first.
const CONTENT_SELECTORS: &[&str] = &[
    "main",
    "[role='main']",
    "#content",
    "[class*='content'], [class*='main'], [class*='article']",
];

/// Title sources in preference order: `(attribute, value)` of a `<meta>` tag.
const TITLE_METAS: &[(&str, &str)] = &[
    ("property", "og:title"),
    ("name", "twitter:title"),
    ("name", "title"),
];

/// Description sources in preference order.
const DESCRIPTION_METAS: &[(&str, &str)] = &[("property", "og:description"), ("name", "description")];

/// Source of candidate page content.
pub trait PageSource: Send + Sync {
    /// Fetch a page and extract its content, `None` when nothing could be retrieved.
    fn fetch_and_extract<'a>(&'a self, url: &'a str) -> ScrapeFuture<'a, Option<PageContent>>;
}

/// HTTP page fetcher with its own, smaller header set.
pub struct PageFetcher {
    client: reqwest::Client,
    excerpt_max_chars: usize,
}

impl PageFetcher {
    /// Create a fetcher from the scraping configuration.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ScrapingConfig) -> Result<Self, ScrapingError> {
        let mut headers = HeaderMap::new();
        if let Ok(ua) = HeaderValue::from_str(&config.page_user_agent) {
            headers.insert(USER_AGENT, ua);
        }
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ru-RU,ru;q=0.9"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.page_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ScrapingError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            excerpt_max_chars: config.excerpt_max_chars,
        })
    }

    /// Fetch a page and extract title, description and body excerpt.
    ///
    /// # Errors
    /// Returns an error for an unparseable URL, on transport failure or a non-success status.
    pub async fn fetch_page(&self, url: &str) -> Result<PageContent, ScrapingError> {
        let target = Url::parse(url)?;
        let response = self.client.get(target).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapingError::Status {
                target: url.to_string(),
                status: status.as_u16(),
            });
        }

        // Pages that omit a charset are decoded as UTF-8.
        let html = response.text_with_charset("utf-8").await?;
        Ok(extract_page(url, &html, self.excerpt_max_chars))
    }
}

impl PageSource for PageFetcher {
    fn fetch_and_extract<'a>(&'a self, url: &'a str) -> ScrapeFuture<'a, Option<PageContent>> {
        Box::pin(async move {
            match self.fetch_page(url).await {
                Ok(content) => {
                    if content.is_empty() {
                        tracing::debug!("No text extracted from {url}");
                    }
                    Some(content)
                }
                Err(e) if e.is_transport() => {
                    tracing::warn!("Failed to fetch {url}: {e}");
                    None
                }
                Err(e) => {
                    tracing::warn!("Skipping {url}: {e}");
                    None
                }
            }
        })
    }
}

/// Extract page content from raw HTML.
#[must_use]
pub fn extract_page(url: &str, html: &str, excerpt_max_chars: usize) -> PageContent {
    let document = Html::parse_document(html);

    let title = first_meta(&document, TITLE_METAS)
        .or_else(|| title_element(&document))
        .unwrap_or_default();
    let description = first_meta(&document, DESCRIPTION_METAS).unwrap_or_default();
    let excerpt = truncate_excerpt(&extract_main_text(&document), excerpt_max_chars);

    PageContent {
        url: url.to_string(),
        title,
        description,
        excerpt,
    }
}

/// First non-empty `<meta content>` among the given sources.
fn first_meta(document: &Html, sources: &[(&str, &str)]) -> Option<String> {
    sources.iter().find_map(|(attr, value)| {
        let selector = Selector::parse(&format!("meta[{attr}='{value}']")).ok()?;
        document
            .select(&selector)
            .filter_map(|element| element.value().attr("content"))
            .map(clean_text)
            .find(|content| !content.is_empty())
    })
}

/// Text of the `<title>` element.
fn title_element(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| clean_text(&element.text().collect::<String>()))
        .filter(|title| !title.is_empty())
}

/// Visible text of the main-content container, or of the whole page.
fn extract_main_text(document: &Html) -> String {
    for selector_str in CONTENT_SELECTORS {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let container = document
            .select(&selector)
            .find(|element| !is_inside_skipped(*element));
        if let Some(container) = container {
            let text = visible_text(container);
            if !text.is_empty() {
                return text;
            }
        }
    }

    visible_text(document.root_element())
}

/// Whether the element or one of its ancestors is a skipped block.
fn is_inside_skipped(element: ElementRef<'_>) -> bool {
    SKIPPED_TAGS.contains(&element.value().name())
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| SKIPPED_TAGS.contains(&ancestor.value().name()))
}

/// Collapsed text of an element, skipping non-content descendants.
fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    clean_text(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push(' ');
                out.push_str(&text.text);
            }
            Node::Element(el) if SKIPPED_TAGS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Collapse whitespace runs into single spaces and trim.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut the excerpt to `max_chars` characters, marking the cut with an ellipsis.
fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut excerpt: String = text.chars().take(max_chars).collect();
    excerpt.push_str("...");
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="ru">
<head>
  <title>Fallback title</title>
  <meta name="description" content="Plain description">
  <meta property="og:title" content="  Highload++   2025 ">
  <meta property="og:description" content="Конференция разработчиков высоконагруженных систем">
  <style>body { color: red; }</style>
</head>
<body>
  <header class="main-header">Меню сайта</header>
  <nav>Главная | Афиша</nav>
  <main>
    <h1>Highload++</h1>
    <p>Даты:   20-21 ноября 2025,
       Москва</p>
    <script>var tracking = 1;</script>
  </main>
  <footer>© 2025</footer>
</body>
</html>"#;

    #[tokio::test]
    async fn test_unparseable_url_is_rejected_before_request() {
        let fetcher = match PageFetcher::new(&ScrapingConfig::default()) {
            Ok(fetcher) => fetcher,
            Err(err) => unreachable!("default scraping config rejected: {err}"),
        };

        let result = fetcher.fetch_page("not a url").await;
        assert!(matches!(result, Err(ScrapingError::InvalidUrl(_))));
        assert!(!result.is_err_and(|e| e.is_transport()));
        assert!(fetcher.fetch_and_extract("not a url").await.is_none());
    }

    #[test]
    fn test_meta_title_and_description_preferred() {
        let content = extract_page("https://highload.ru", PAGE, 1500);
        assert_eq!(content.url, "https://highload.ru");
        assert_eq!(content.title, "Highload++ 2025");
        assert_eq!(
            content.description,
            "Конференция разработчиков высоконагруженных систем"
        );
    }

    #[test]
    fn test_title_element_fallback() {
        let html = "<html><head><title> Rust Meetup  СПб </title></head><body><p>Текст</p></body></html>";
        let content = extract_page("https://example.ru", html, 1500);
        assert_eq!(content.title, "Rust Meetup СПб");
        assert_eq!(content.description, "");
    }

    #[test]
    fn test_twitter_title_before_title_element() {
        let html = r#"<html><head><title>Page</title><meta name="twitter:title" content="DevOops"></head><body></body></html>"#;
        let content = extract_page("https://example.ru", html, 1500);
        assert_eq!(content.title, "DevOops");
    }

    #[test]
    fn test_excerpt_prefers_main_and_strips_noise() {
        let content = extract_page("https://highload.ru", PAGE, 1500);
        assert_eq!(content.excerpt, "Highload++ Даты: 20-21 ноября 2025, Москва");
        assert!(!content.excerpt.contains("tracking"));
        assert!(!content.excerpt.contains("Меню"));
    }

    #[test]
    fn test_excerpt_uses_class_container() {
        let html = r#"<html><body>
            <div class="sidebar">Реклама</div>
            <div class="article-body">Текст статьи о митапе</div>
        </body></html>"#;
        let content = extract_page("https://example.ru", html, 1500);
        assert_eq!(content.excerpt, "Текст статьи о митапе");
    }

    #[test]
    fn test_excerpt_whole_page_fallback() {
        let html = "<html><body><div>Один</div><nav>Меню</nav><div>Два</div></body></html>";
        let content = extract_page("https://example.ru", html, 1500);
        assert_eq!(content.excerpt, "Один Два");
    }

    #[test]
    fn test_excerpt_truncated_with_ellipsis() {
        let body = "слово ".repeat(400);
        let html = format!("<html><body><main>{body}</main></body></html>");
        let content = extract_page("https://example.ru", &html, 1500);
        assert_eq!(content.excerpt.chars().count(), 1503);
        assert!(content.excerpt.ends_with("..."));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Hello   world  \n\t  test  "), "Hello world test");
    }

    #[test]
    fn test_truncate_excerpt_short_text_untouched() {
        assert_eq!(truncate_excerpt("short", 10), "short");
        assert_eq!(truncate_excerpt("абвгд", 3), "абв...");
    }
}
