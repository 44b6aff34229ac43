use crate::models::CredentialSession;
use chrono::{DateTime, Utc};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::info;

/// Where the stored credential is in its lifecycle at a given instant.
#[derive(Debug, Clone)]
pub enum SessionState {
    Unset,
    Active(Arc<CredentialSession>),
    Expired(Arc<CredentialSession>),
}

/// Single-slot, process-wide holder of the current credential.
///
/// `set` is a last-writer-wins replace and `current` hands out a snapshot, so
/// a sync already in flight keeps using the session it read even if a new
/// authentication lands meanwhile.
#[derive(Debug, Default)]
pub struct SessionStore {
    slot: RwLock<Option<Arc<CredentialSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, session: CredentialSession) {
        let session = Arc::new(session);
        info!(
            "credential session replaced (client {}, expires {})",
            session.client_id, session.expires_at
        );
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(session);
    }

    /// Snapshot of the stored session. Expiry is not checked here.
    pub fn current(&self) -> Option<Arc<CredentialSession>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        match self.current() {
            None => SessionState::Unset,
            Some(s) if s.is_valid_at(now) => SessionState::Active(s),
            Some(s) => SessionState::Expired(s),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state_at(Utc::now())
    }
}
