use crate::api::songwhip::Resolver;
use crate::api::TrackService;
use crate::config::Config;
use crate::error::Error;
use crate::links::extract_link;
use crate::models::{CanonicalResource, ChatMessage, PlaylistMutationResult, SPOTIFY};
use crate::scrape::IdentifierScraper;
use crate::session::SessionStore;
use crate::sync::PlaylistSync;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Sent alongside the canonical link whenever the playlist sync fails.
pub const REAUTH_ADVISORY: &str =
    "Could not add the track to the Spotify playlist.\nPlease authenticate again with `/auth_spotify`.";

#[derive(Debug)]
pub enum SyncStatus {
    /// The resolver reports no Spotify equivalent; nothing was attempted.
    NotOnSpotify,
    Synced(PlaylistMutationResult),
    Failed(Error),
}

/// Result of running one message through the pipeline past resolution.
#[derive(Debug)]
pub struct Outcome {
    pub link: String,
    pub resource: CanonicalResource,
    pub sync: SyncStatus,
}

impl Outcome {
    /// Replies to post, in order. The canonical URL is always among them;
    /// a failed sync adds the advisory ahead of it.
    pub fn replies(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(2);
        if let SyncStatus::Failed(_) = self.sync {
            out.push(REAUTH_ADVISORY.to_string());
        }
        out.push(self.resource.url.clone());
        out
    }
}

/// Runs the link -> resolve -> scrape -> playlist pipeline for chat messages.
pub struct MessageHandler {
    resolver: Resolver,
    sync: PlaylistSync,
}

impl MessageHandler {
    pub fn new(resolver: Resolver, sync: PlaylistSync) -> Self {
        Self { resolver, sync }
    }

    /// Wire the pipeline from config around a shared session store.
    pub fn from_config(
        cfg: &Config,
        sessions: Arc<SessionStore>,
        service: Arc<dyn TrackService>,
    ) -> anyhow::Result<Self> {
        let client = cfg.http_client()?;
        let resolver = Resolver::new(client.clone(), cfg.resolver_url.clone(), cfg.max_retries);
        let scraper = IdentifierScraper::new(client, cfg.scrape_marker.clone(), cfg.max_retries);
        let sync = PlaylistSync::new(service, sessions, scraper, cfg.playlist_id.clone())
            .with_dedup(cfg.dedup);
        Ok(Self::new(resolver, sync))
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.sync.sessions()
    }

    /// Run the pipeline on raw message text.
    ///
    /// `None` means there was nothing to reply to: no recognized link, or
    /// the resolver failed (treated the same as no match).
    pub async fn process(&self, text: &str) -> Option<Outcome> {
        let link = extract_link(text)?.to_string();
        let resource = match self.resolver.resolve(&link).await {
            Ok(r) => r,
            Err(e) => {
                warn!("could not resolve {}: {}", link, e);
                return None;
            }
        };

        let sync = if !resource.available_on(SPOTIFY) {
            debug!("{} has no Spotify equivalent", resource.url);
            SyncStatus::NotOnSpotify
        } else {
            match self.sync.sync_resource(&resource).await {
                Ok(r) => SyncStatus::Synced(r),
                Err(e) => {
                    warn!("playlist sync failed for {}: {}", resource.url, e);
                    SyncStatus::Failed(e)
                }
            }
        };

        Some(Outcome { link, resource, sync })
    }

    /// Handle one inbound chat message and return the replies to post.
    pub async fn handle(&self, msg: &ChatMessage) -> Vec<String> {
        if msg.author_is_bot {
            return Vec::new();
        }
        let span = info_span!("message", id = %Uuid::new_v4());
        async {
            match self.process(&msg.content).await {
                Some(outcome) => {
                    info!("replying with {} for {}", outcome.resource.url, outcome.link);
                    outcome.replies()
                }
                None => Vec::new(),
            }
        }
        .instrument(span)
        .await
    }
}
