//! Recover a streaming-service track id from a canonical resource page.
//!
//! The page belongs to a third party, so everything here is best effort and
//! every failure maps to a recoverable [`Error`].

use crate::error::{Error, Result};
use crate::util::{last_path_segment, with_retries};
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

static ANCHOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("anchor selector is valid"));

/// Find the first anchor (document order) whose rendered text contains
/// `marker` and return the last path segment of its href.
pub fn extract_identifier(html: &str, marker: &str) -> Result<String> {
    let doc = Html::parse_document(html);
    let anchor = doc
        .select(&ANCHOR)
        .find(|a| a.text().collect::<String>().contains(marker))
        .ok_or_else(|| Error::IdentifierNotFound {
            marker: marker.to_string(),
        })?;

    let href = anchor
        .value()
        .attr("href")
        .ok_or_else(|| Error::IdentifierMalformed("matching anchor has no href".into()))?;

    last_path_segment(href)
        .ok_or_else(|| Error::IdentifierMalformed(format!("no path segment in {:?}", href)))
}

/// Fetches canonical pages and runs [`extract_identifier`] on them.
pub struct IdentifierScraper {
    client: Client,
    marker: String,
    max_retries: u32,
}

impl IdentifierScraper {
    pub fn new(client: Client, marker: impl Into<String>, max_retries: u32) -> Self {
        Self {
            client,
            marker: marker.into(),
            max_retries,
        }
    }

    async fn fetch_page(&self, page_url: &str) -> Result<String> {
        // Only transport errors are retried; a non-2xx answer is final.
        let resp = with_retries("page fetch", self.max_retries, || self.client.get(page_url).send())
            .await
            .map_err(|e| Error::ScrapeUnavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::ScrapeUnavailable(format!("{} => {}", page_url, status)));
        }
        resp.text()
            .await
            .map_err(|e| Error::ScrapeUnavailable(e.to_string()))
    }

    pub async fn identifier_for(&self, page_url: &str) -> Result<String> {
        let html = self.fetch_page(page_url).await?;
        let id = extract_identifier(&html, &self.marker)?;
        debug!("scraped identifier {} from {}", id, page_url);
        Ok(id)
    }
}
