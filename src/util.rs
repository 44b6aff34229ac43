use std::future::Future;
use tracing::warn;

/// Run `op` once plus up to `max_retries` more times while it fails.
///
/// Callers wrap only the send of a request, so what gets retried is a
/// transport failure, never an HTTP status. With the default of zero
/// retries this is a single attempt.
pub async fn with_retries<T, E, F, Fut>(what: &str, max_retries: u32, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt <= max_retries => {
                warn!("{} failed (attempt {}): {}; retrying", what, attempt, e);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Final non-empty path segment of a link, ignoring query and fragment.
///
/// Relative hrefs are accepted too since the page may not use absolute URLs.
pub fn last_path_segment(href: &str) -> Option<String> {
    if let Ok(parsed) = url::Url::parse(href) {
        return parsed
            .path_segments()
            .and_then(|mut segs| segs.next_back())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());
    }
    let path = href.split(['?', '#']).next().unwrap_or("");
    path.rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}
