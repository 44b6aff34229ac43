pub mod songwhip;
pub mod spotify;
pub mod spotify_auth;
pub mod mock;

use crate::models::CredentialSession;
use anyhow::Result;

/// Streaming-service operations the sync engine needs.
/// Implementations: spotify::SpotifyClient, mock::MockTrackService.
///
/// Every call takes the session explicitly so a caller's snapshot is what
/// authenticates the request, not whatever the store holds at send time.
#[async_trait::async_trait]
pub trait TrackService: Send + Sync {
    /// Look up a track by id and return its canonical URI (e.g. "spotify:track:...").
    async fn track_uri(&self, session: &CredentialSession, track_id: &str) -> Result<String>;

    /// Append URIs to the end of a playlist.
    async fn add_tracks(&self, session: &CredentialSession, playlist_id: &str, uris: &[String]) -> Result<()>;

    /// All track URIs currently in the playlist. Only used when dedup is on.
    async fn playlist_track_uris(&self, session: &CredentialSession, playlist_id: &str) -> Result<Vec<String>>;

    /// Return the service's name (for logging)
    fn name(&self) -> &str;
}
