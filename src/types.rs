//! Core types for torrent-dl

use serde::{Deserialize, Serialize};

/// One item from a feed, as produced by the upstream feed parser.
///
/// Immutable once constructed. The `url` is the identity used for
/// deduplication — the persisted state is URL-keyed, not GUID-keyed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Display name (typically the feed item title); the text filter rules
    /// are matched against
    pub name: String,

    /// Download URL of the torrent payload; dedup key
    pub url: String,

    /// Category reported by the feed, if any
    #[serde(default)]
    pub category: Option<String>,

    /// Feed-assigned unique identifier, if any
    #[serde(default)]
    pub guid: Option<String>,

    /// Identifier of the feed this item came from; empty when the feed has
    /// no identifier. Compared case-insensitively against feed-scoped rules.
    #[serde(default)]
    pub feed_id: String,
}

/// Classification of the Transmission daemon's reply to a torrent upload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The daemon accepted the torrent
    Success,

    /// The daemon already has this torrent. Equivalent to [`Success`] for
    /// dedup purposes — the entry must not be retried — but distinguishable
    /// for reporting.
    ///
    /// [`Success`]: UploadOutcome::Success
    DuplicateAtRemote,

    /// The daemon explicitly rejected the upload; carries the daemon's
    /// `result` string verbatim
    Failure(String),
}

impl UploadOutcome {
    /// True when the entry should be recorded as processed (the daemon has
    /// the torrent, whether it arrived just now or earlier)
    pub fn is_accepted(&self) -> bool {
        matches!(self, UploadOutcome::Success | UploadOutcome::DuplicateAtRemote)
    }
}

/// Per-entry result of a [`FeedAgent`](crate::agent::FeedAgent) pipeline run
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemDisposition {
    /// The entry's URL was already in the dedup state; nothing was done
    AlreadySeen,

    /// No filter rule matched; the entry was ignored and not recorded
    NoMatch,

    /// A rule matched but its folder template resolved to an empty string.
    /// Treated as a configuration error: the entry is skipped and left
    /// unrecorded so it is processed normally once the rule is fixed.
    EmptyFolder,

    /// The torrent was uploaded and accepted; the URL is now recorded
    Delivered {
        /// Save path computed for the torrent file
        path: String,
    },

    /// The daemon already had the torrent; the URL is now recorded
    Duplicate {
        /// Save path computed for the torrent file
        path: String,
    },

    /// The daemon explicitly rejected the upload; the entry stays unrecorded
    Rejected {
        /// The daemon's `result` string
        reason: String,
    },

    /// A network or protocol failure interrupted the pipeline; the entry
    /// stays unrecorded and is retried on the next feed poll
    Errored {
        /// Description of the failure
        error: String,
    },
}
