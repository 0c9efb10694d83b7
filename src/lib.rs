//! # torrent-dl
//!
//! Feed-driven torrent download agent library for the Transmission daemon.
//!
//! Given already-parsed feed entries and an ordered list of filter rules,
//! torrent-dl decides which entries to act on, fetches their torrent
//! payloads, submits them to a Transmission daemon over its HTTP/JSON RPC
//! interface, and keeps a durable record of processed URLs so nothing is
//! downloaded twice across restarts.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI; feed polling and scheduling belong to
//!   the embedding application
//! - **Explicit state** - Configuration, rules, and dedup state flow through
//!   parameters and struct fields, never process-wide globals
//! - **Typed outcomes** - Every failure is classified, so callers can tell a
//!   remote rejection from a network hiccup worth retrying
//!
//! ## Quick Start
//!
//! ```no_run
//! use tokio_util::sync::CancellationToken;
//! use torrent_dl::{Config, FeedAgent, FeedItem};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut agent = FeedAgent::new(&config)?;
//!
//!     let items = vec![FeedItem {
//!         name: "Show.S01E01.1080p".to_string(),
//!         url: "http://tracker.example.com/dl/show.s01e01.torrent".to_string(),
//!         category: None,
//!         guid: None,
//!         feed_id: "main".to_string(),
//!     }];
//!
//!     let cancel = CancellationToken::new();
//!     for disposition in agent.process_items(&items, &cancel).await {
//!         println!("{disposition:?}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Feed-entry processing pipeline
pub mod agent;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Save-path derivation
pub mod filename;
/// Filter-rule evaluation
pub mod matcher;
/// Transmission RPC client
pub mod rpc;
/// Durable dedup state
pub mod state;
/// Core types
pub mod types;

// Re-export commonly used types
pub use agent::FeedAgent;
pub use config::{Config, FilterRuleConfig, TransmissionConfig};
pub use error::{Error, Result};
pub use filename::{MAX_PATH_LEN, torrent_save_path};
pub use matcher::{FilterRule, compile_rules, match_rules};
pub use rpc::TransmissionClient;
pub use state::{DedupStore, MIN_URL_LEN};
pub use types::{FeedItem, ItemDisposition, UploadOutcome};
