use crate::error::{Error, Result};
use crate::models::CanonicalResource;
use crate::util::with_retries;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::json;
use tracing::debug;

/// Client for the cross-service link resolution API.
pub struct Resolver {
    client: Client,
    endpoint: String,
    max_retries: u32,
}

impl Resolver {
    pub fn new(client: Client, endpoint: impl Into<String>, max_retries: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            max_retries,
        }
    }

    async fn post_link(&self, link: &str) -> Result<reqwest::Response> {
        let body = json!({ "url": link });
        // Only transport errors are retried; a non-2xx answer is final.
        let resp = with_retries("resolution", self.max_retries, || {
            self.client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .json(&body)
                .send()
        })
        .await
        .map_err(|e| Error::ResolutionUnavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(Error::ResolutionUnavailable(format!("{} => {}", status, txt)));
        }
        Ok(resp)
    }

    /// Resolve a shared link to its canonical resource.
    pub async fn resolve(&self, link: &str) -> Result<CanonicalResource> {
        let resp = self.post_link(link).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| Error::ResolutionUnavailable(e.to_string()))?;
        let resource: CanonicalResource = serde_json::from_str(&body)
            .map_err(|e| Error::ResolutionMalformed(e.to_string()))?;
        debug!(
            "resolved {} -> {} ({:?} {:?})",
            link, resource.url, resource.kind, resource.name
        );
        Ok(resource)
    }
}
