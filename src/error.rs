//! Pipeline error taxonomy.
//!
//! Every variant is recoverable: the message handler downgrades resolution
//! failures to silence and everything after resolution to a re-authentication
//! advisory. Config, auth and CLI code paths use `anyhow` instead.

/// Result type used by the link -> playlist pipeline.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The resolution service could not be reached or answered non-2xx.
    #[error("resolution unavailable: {0}")]
    ResolutionUnavailable(String),

    /// The resolution service answered with a body we could not decode.
    #[error("resolution response malformed: {0}")]
    ResolutionMalformed(String),

    /// The canonical page could not be fetched.
    #[error("scrape unavailable: {0}")]
    ScrapeUnavailable(String),

    /// No anchor on the page carried the service marker.
    #[error("no anchor containing {marker:?} found")]
    IdentifierNotFound { marker: String },

    /// The matching anchor had no usable href path segment.
    #[error("identifier malformed: {0}")]
    IdentifierMalformed(String),

    /// No credential session was ever stored.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A session is stored but its expiry has passed.
    #[error("session expired at {expired_at}")]
    SessionExpired { expired_at: chrono::DateTime<chrono::Utc> },

    #[error("track lookup failed: {0}")]
    TrackLookupFailed(String),

    #[error("playlist append failed: {0}")]
    PlaylistAppendFailed(String),
}

impl Error {
    /// Resolution failures are reported as "no match" rather than surfaced.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            Error::ResolutionUnavailable(_) | Error::ResolutionMalformed(_)
        )
    }
}
