use super::TrackService;
use crate::models::CredentialSession;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

/// In-memory track service used in tests and dry runs.
///
/// Tracks resolve to `mock:track:{id}`; appended URIs are kept in an
/// in-memory playlist so callers can inspect what would have been sent.
#[derive(Default)]
pub struct MockTrackService {
    fail_lookup: bool,
    fail_append: bool,
    lookups: Mutex<Vec<String>>,
    playlist: Mutex<Vec<String>>,
}

impl MockTrackService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(fail_lookup: bool, fail_append: bool) -> Self {
        Self {
            fail_lookup,
            fail_append,
            ..Self::default()
        }
    }

    /// Track ids looked up so far, in call order.
    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Current contents of the mock playlist.
    pub fn playlist(&self) -> Vec<String> {
        self.playlist.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TrackService for MockTrackService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn track_uri(&self, _session: &CredentialSession, track_id: &str) -> Result<String> {
        info!("MockTrackService: track_uri {}", track_id);
        self.lookups
            .lock()
            .map_err(|_| anyhow!("mock lock poisoned"))?
            .push(track_id.to_string());
        if self.fail_lookup {
            return Err(anyhow!("mock lookup failure"));
        }
        Ok(format!("mock:track:{}", track_id))
    }

    async fn add_tracks(&self, _session: &CredentialSession, playlist_id: &str, uris: &[String]) -> Result<()> {
        info!("MockTrackService: add_tracks {} -> {} tracks", playlist_id, uris.len());
        if self.fail_append {
            return Err(anyhow!("mock append failure"));
        }
        self.playlist
            .lock()
            .map_err(|_| anyhow!("mock lock poisoned"))?
            .extend(uris.iter().cloned());
        Ok(())
    }

    async fn playlist_track_uris(&self, _session: &CredentialSession, _playlist_id: &str) -> Result<Vec<String>> {
        Ok(self.playlist())
    }
}
