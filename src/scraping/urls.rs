//! Cleaning and filtering of search result links.

use url::Url;

/// Query parameter carrying the real target in DuckDuckGo redirect links.
const REDIRECT_PARAM: &str = "uddg=";

/// Unwrap a search-engine redirect and return the absolute http(s) target.
///
/// Already-clean absolute URLs come back unchanged. Returns `None` for
/// relative links, other schemes and URLs without a host.
#[must_use]
pub fn clean_url(raw: &str) -> Option<String> {
    let unwrapped = unwrap_redirect(raw).unwrap_or_else(|| raw.to_string());
    let candidate = unwrapped.trim();

    if !(candidate.starts_with("http://") || candidate.starts_with("https://")) {
        return None;
    }

    let parsed = Url::parse(candidate).ok()?;
    parsed.host_str().filter(|host| !host.is_empty())?;

    Some(candidate.to_string())
}

/// Extract the decoded target of a `…/l/?uddg=<encoded>&rut=…` redirect link.
fn unwrap_redirect(href: &str) -> Option<String> {
    let start = href.find(REDIRECT_PARAM)? + REDIRECT_PARAM.len();
    let end = href[start..].find('&').map_or(href.len(), |i| start + i);
    let encoded = &href[start..end];
    Some(
        urlencoding::decode(encoded)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| encoded.to_string()),
    )
}

/// Lowercased host of an absolute URL.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

/// Whether the host is a denied domain or one of its subdomains.
#[must_use]
pub fn is_denied_host(host: &str, denied: &[String]) -> bool {
    denied.iter().any(|domain| {
        host == domain
            || host
                .strip_suffix(domain.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Whether the host ends with one of the permitted suffixes.
#[must_use]
pub fn is_allowed_host(host: &str, allowed_suffixes: &[String]) -> bool {
    allowed_suffixes
        .iter()
        .any(|suffix| host.ends_with(suffix.as_str()))
}
