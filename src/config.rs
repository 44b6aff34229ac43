use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Cross-service resolution endpoint; receives `POST {"url": ...}`.
    #[serde(default = "default_resolver_url")]
    pub resolver_url: String,
    #[serde(default = "default_spotify_api_base")]
    pub spotify_api_base: String,
    #[serde(default = "default_spotify_auth_base")]
    pub spotify_auth_base: String,

    // Spotify app credentials
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Playlist every resolved track gets appended to.
    #[serde(default)]
    pub playlist_id: String,

    /// Anchor text that identifies the Spotify link on the canonical page.
    #[serde(default = "default_scrape_marker")]
    pub scrape_marker: String,

    // Network behavior
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Extra attempts for resolution and page fetch on transport errors.
    #[serde(default)]
    pub max_retries: u32,

    /// Skip the append when the track is already in the playlist.
    #[serde(default)]
    pub dedup: bool,

    /// Upper bound on messages processed at once. Unbounded when unset.
    #[serde(default)]
    pub max_concurrent_messages: Option<usize>,

    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
}

fn default_resolver_url() -> String { "https://songwhip.com".into() }
fn default_spotify_api_base() -> String { "https://api.spotify.com/v1".into() }
fn default_spotify_auth_base() -> String { "https://accounts.spotify.com".into() }
fn default_redirect_uri() -> String { "http://127.0.0.1:8888/callback".into() }
fn default_scrape_marker() -> String { "Spotify".into() }
fn default_http_timeout() -> u64 { 10 }
fn default_log_dir() -> PathBuf { "/var/log/music-relay".into() }

impl Default for Config {
    fn default() -> Self {
        Self {
            resolver_url: default_resolver_url(),
            spotify_api_base: default_spotify_api_base(),
            spotify_auth_base: default_spotify_auth_base(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            playlist_id: String::new(),
            scrape_marker: default_scrape_marker(),
            http_timeout_secs: default_http_timeout(),
            max_retries: 0,
            dedup: false,
            max_concurrent_messages: None,
            log_dir: default_log_dir(),
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Let the usual `SPOTIFY_*` environment variables override the file,
    /// so secrets can stay out of the TOML.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let fields: [(&str, &mut String); 4] = [
            ("SPOTIFY_CLIENT_ID", &mut self.client_id),
            ("SPOTIFY_CLIENT_SECRET", &mut self.client_secret),
            ("SPOTIFY_REDIRECT_URI", &mut self.redirect_uri),
            ("SPOTIFY_PLAYLIST_ID", &mut self.playlist_id),
        ];
        for (key, field) in fields {
            if let Some(v) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = v.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.playlist_id.trim().is_empty() {
            return Err(anyhow!("playlist_id must be set"));
        }
        if self.http_timeout_secs == 0 {
            return Err(anyhow!("http_timeout_secs must be greater than zero"));
        }
        if self.max_concurrent_messages == Some(0) {
            return Err(anyhow!("max_concurrent_messages must be greater than zero"));
        }
        url::Url::parse(&self.resolver_url)
            .map_err(|e| anyhow!("invalid resolver_url {}: {}", self.resolver_url, e))?;
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Shared HTTP client with the configured per-request timeout.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout())
            .build()
            .map_err(|e| anyhow!("build http client: {}", e))
    }
}
