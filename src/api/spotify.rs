use super::TrackService;
use crate::models::CredentialSession;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde_json::json;

/// Spotify Web API client.
///
/// Holds no credential of its own: the bearer comes from the session passed
/// to each call. A 401 is reported as an error, never refreshed here; getting
/// a new session is a human step.
pub struct SpotifyClient {
    client: Client,
    api_base: String,
}

impl SpotifyClient {
    pub fn new(client: Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn name(&self) -> &str {
        "spotify"
    }
}

#[async_trait]
impl TrackService for SpotifyClient {
    fn name(&self) -> &str {
        SpotifyClient::name(self)
    }

    async fn track_uri(&self, session: &CredentialSession, track_id: &str) -> Result<String> {
        let url = format!("{}/tracks/{}", self.api_base, urlencoding::encode(track_id));
        let resp = self
            .client
            .get(&url)
            .header(AUTHORIZATION, session.bearer())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!("Got 401 looking up track {}; session rejected by Spotify", track_id);
        }
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("get track failed: {} => {}", status, txt));
        }
        let j: serde_json::Value = resp.json().await?;
        let uri = j["uri"]
            .as_str()
            .ok_or_else(|| anyhow!("no uri in track response"))?
            .to_string();
        debug!("track {} resolved to {}", track_id, uri);
        Ok(uri)
    }

    async fn add_tracks(&self, session: &CredentialSession, playlist_id: &str, uris: &[String]) -> Result<()> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        );
        let body = json!({ "uris": uris });
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, session.bearer())
            .json(&body)
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(anyhow!("rate_limited: retry_after={:?}", retry_after));
        }
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("add tracks failed: {} => {}", status, txt));
        }
        Ok(())
    }

    async fn playlist_track_uris(&self, session: &CredentialSession, playlist_id: &str) -> Result<Vec<String>> {
        let mut uris = Vec::new();
        let mut next: Option<String> = Some(format!(
            "{}/playlists/{}/tracks?fields=items(track(uri)),next&limit=100",
            self.api_base,
            urlencoding::encode(playlist_id)
        ));

        while let Some(url) = next {
            let resp = self
                .client
                .get(&url)
                .header(AUTHORIZATION, session.bearer())
                .send()
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let txt = resp.text().await.unwrap_or_default();
                return Err(anyhow!(
                    "list playlist tracks failed: {} => {}",
                    status,
                    txt
                ));
            }
            let j: serde_json::Value = resp.json().await?;
            if let Some(items) = j["items"].as_array() {
                for it in items {
                    if let Some(uri) = it["track"]["uri"].as_str() {
                        uris.push(uri.to_string());
                    }
                }
            }
            next = j["next"].as_str().map(|s| s.to_string());
        }
        Ok(uris)
    }
}
