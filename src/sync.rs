use crate::api::TrackService;
use crate::error::{Error, Result};
use crate::models::{CanonicalResource, CredentialSession, PlaylistMutationResult};
use crate::scrape::IdentifierScraper;
use crate::session::{SessionState, SessionStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Appends resolved tracks to the configured playlist.
///
/// Order per resource: session check (no network), page scrape, track lookup,
/// append. Each step fails independently and nothing is retried here.
pub struct PlaylistSync {
    service: Arc<dyn TrackService>,
    sessions: Arc<SessionStore>,
    scraper: IdentifierScraper,
    playlist_id: String,
    dedup: bool,
}

impl PlaylistSync {
    pub fn new(
        service: Arc<dyn TrackService>,
        sessions: Arc<SessionStore>,
        scraper: IdentifierScraper,
        playlist_id: impl Into<String>,
    ) -> Self {
        Self {
            service,
            sessions,
            scraper,
            playlist_id: playlist_id.into(),
            dedup: false,
        }
    }

    /// Skip tracks whose URI is already in the playlist. Off by default, so
    /// sharing the same link twice appends it twice.
    pub fn with_dedup(mut self, dedup: bool) -> Self {
        self.dedup = dedup;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    fn require_session(&self) -> Result<Arc<CredentialSession>> {
        match self.sessions.state() {
            SessionState::Unset => Err(Error::NotAuthenticated),
            SessionState::Expired(s) => Err(Error::SessionExpired {
                expired_at: s.expires_at,
            }),
            SessionState::Active(s) => Ok(s),
        }
    }

    /// Scrape the resource page for a track id and append that track.
    pub async fn sync_resource(&self, resource: &CanonicalResource) -> Result<PlaylistMutationResult> {
        let session = self.require_session()?;
        let track_id = self.scraper.identifier_for(&resource.url).await?;
        self.append(&session, &track_id).await
    }

    /// Append a track by id using the current session.
    pub async fn sync_track(&self, track_id: &str) -> Result<PlaylistMutationResult> {
        let session = self.require_session()?;
        self.append(&session, track_id).await
    }

    async fn append(&self, session: &CredentialSession, track_id: &str) -> Result<PlaylistMutationResult> {
        let uri = self
            .service
            .track_uri(session, track_id)
            .await
            .map_err(|e| Error::TrackLookupFailed(format!("{}: {:#}", track_id, e)))?;

        if self.dedup {
            let existing = self
                .service
                .playlist_track_uris(session, &self.playlist_id)
                .await
                .map_err(|e| Error::PlaylistAppendFailed(format!("{:#}", e)))?;
            if existing.iter().any(|u| u == &uri) {
                debug!("{} already in playlist {}, skipping", uri, self.playlist_id);
                return Ok(PlaylistMutationResult::AlreadyPresent { uri });
            }
        }

        self.service
            .add_tracks(session, &self.playlist_id, std::slice::from_ref(&uri))
            .await
            .map_err(|e| Error::PlaylistAppendFailed(format!("{:#}", e)))?;
        info!(
            "added {} to {} playlist {}",
            uri,
            self.service.name(),
            self.playlist_id
        );
        Ok(PlaylistMutationResult::Appended { uri })
    }
}
