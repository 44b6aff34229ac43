//! Authorization-code flow helpers.
//!
//! 1. [`authorize_url`] builds the link a user opens in a browser.
//! 2. Spotify redirects to `redirect_uri?code=...`.
//! 3. [`code_from_redirect`] pulls the code out of that redirect URL.
//! 4. [`complete_authorization`] exchanges the code and replaces the session.
//!
//! Sessions are never refreshed; when one expires the user repeats the flow.

use crate::config::Config;
use crate::models::CredentialSession;
use crate::session::SessionStore;
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Deserialize;
use tracing::info;
use url::Url;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

const SCOPES: [&str; 2] = ["playlist-modify-public", "playlist-modify-private"];

pub fn authorize_url(cfg: &Config) -> Result<Url> {
    if cfg.client_id.is_empty() {
        return Err(anyhow!("client_id is not configured"));
    }
    let mut url = Url::parse(&format!(
        "{}/authorize",
        cfg.spotify_auth_base.trim_end_matches('/')
    ))?;
    url.query_pairs_mut()
        .append_pair("client_id", &cfg.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &cfg.redirect_uri)
        .append_pair("scope", &SCOPES.join(" "));
    Ok(url)
}

/// Extract the `code` query parameter from a pasted redirect URL.
pub fn code_from_redirect(redirect: &str) -> Result<String> {
    let parsed = Url::parse(redirect.trim()).map_err(|e| anyhow!("invalid url pasted: {}", e))?;
    if let Some((_, err)) = parsed.query_pairs().find(|(k, _)| k == "error") {
        return Err(anyhow!("authorization denied: {}", err));
    }
    let code = parsed
        .query_pairs()
        .find(|(k, _)| k == "code")
        .ok_or_else(|| anyhow!("no code in redirect URL"))?
        .1
        .into_owned();
    Ok(code)
}

/// Exchange an authorization code for a new credential session.
pub async fn exchange_code(client: &Client, cfg: &Config, code: &str) -> Result<CredentialSession> {
    let params = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", cfg.redirect_uri.as_str()),
    ];
    let auth_header = format!(
        "Basic {}",
        general_purpose::STANDARD.encode(format!("{}:{}", cfg.client_id, cfg.client_secret))
    );
    let url = format!("{}/api/token", cfg.spotify_auth_base.trim_end_matches('/'));
    let resp = client
        .post(&url)
        .header(AUTHORIZATION, auth_header)
        .form(&params)
        .send()
        .await?;
    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        return Err(anyhow!("token exchange failed: {} => {}", status, txt));
    }

    let tr: TokenResponse = resp.json().await?;
    Ok(CredentialSession {
        access_token: tr.access_token,
        client_id: cfg.client_id.clone(),
        expires_at: chrono::Utc::now() + chrono::Duration::seconds(tr.expires_in),
    })
}

/// The callback boundary: code in, session stored.
pub async fn complete_authorization(
    client: &Client,
    cfg: &Config,
    store: &SessionStore,
    code: &str,
) -> Result<()> {
    let session = exchange_code(client, cfg, code).await?;
    store.set(session);
    info!("Spotify authorization completed");
    Ok(())
}
