//! Error types for torrent-dl
//!
//! Failures are typed so the orchestrator can tell "we gave up" (network
//! trouble, timeouts, cancellation — retry the entry on the next feed poll)
//! apart from "the remote answered and said no" (carried as an
//! [`UploadOutcome::Failure`](crate::types::UploadOutcome), not an error).

use thiserror::Error;

/// Result type alias for torrent-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for torrent-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "filters.pattern")
        key: Option<String>,
    },

    /// State-file I/O failure.
    ///
    /// Fatal when the dedup state cannot be opened at startup (a silent empty
    /// default would lose dedup history); surfaced but non-fatal per save
    /// attempt.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error: connection failure or timeout while talking to the
    /// torrent source or the Transmission daemon
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Operation aborted by an external cancellation signal.
    ///
    /// Classified alongside [`Error::Network`] by [`Error::is_network`] so
    /// callers retry the entry instead of treating it as a remote rejection.
    #[error("operation cancelled")]
    Cancelled,

    /// Malformed RPC response or unexpected HTTP status from the remote side
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// True for failures where this side gave up — connection trouble,
    /// timeouts, cancellation — as opposed to the remote side replying with a
    /// rejection. Network-level failures leave the entry unrecorded so the
    /// next feed poll retries it.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Cancelled)
    }
}
