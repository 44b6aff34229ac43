use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Service key in the resolution `links` map that gates playlist sync.
pub const SPOTIFY: &str = "spotify";

/// One inbound chat message as delivered by the chat gateway.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub author_is_bot: bool,
    pub content: String,
}

impl ChatMessage {
    pub fn from_user(content: impl Into<String>) -> Self {
        Self {
            author_is_bot: false,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Track,
    Album,
    Playlist,
}

/// Cross-service description of a music item as returned by the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalResource {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    /// Canonical page; this is what gets replied to the channel.
    pub url: String,
    /// Per-service availability, keyed by service name.
    #[serde(default)]
    pub links: HashMap<String, bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl CanonicalResource {
    pub fn available_on(&self, service: &str) -> bool {
        self.links.get(service).copied().unwrap_or(false)
    }
}

/// Bearer credential for the streaming-service API.
///
/// Sessions are never edited; a fresh authentication builds a new one and
/// replaces the old in the [`SessionStore`](crate::session::SessionStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialSession {
    pub access_token: String,
    pub client_id: String,
    pub expires_at: DateTime<Utc>,
}

impl CredentialSession {
    /// Usable strictly before `expires_at`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistMutationResult {
    Appended { uri: String },
    /// Only produced when the `dedup` knob is enabled.
    AlreadyPresent { uri: String },
}
