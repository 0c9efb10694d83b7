//! Configuration types for torrent-dl

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Transmission daemon connection settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransmissionConfig {
    /// Daemon hostname
    #[serde(default = "default_host")]
    pub host: String,

    /// RPC port (default: 9091)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Opaque `user:password` credential, sent as HTTP Basic auth.
    /// None disables authentication.
    #[serde(default)]
    pub auth: Option<String>,
}

impl Default for TransmissionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            auth: None,
        }
    }
}

/// One configured filter rule, as read from configuration (uncompiled).
///
/// The runtime counterpart is [`FilterRule`](crate::matcher::FilterRule).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterRuleConfig {
    /// Regular expression matched against an item's name
    pub pattern: String,

    /// Destination folder template; may reference capture groups of the
    /// pattern (`$1`, `${name}`)
    pub folder: String,

    /// Restrict the rule to items from this feed, compared
    /// case-insensitively. None (or an empty string) matches items from any
    /// feed.
    #[serde(default)]
    pub feed_id: Option<String>,
}

/// Main configuration for [`FeedAgent`](crate::agent::FeedAgent)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Transmission daemon connection settings
    #[serde(default)]
    pub transmission: TransmissionConfig,

    /// Path of the persisted dedup state file (one URL per line).
    /// Must exist and be readable at startup; bootstrap a fresh install with
    /// [`DedupStore::create`](crate::state::DedupStore::create).
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Filter rules, evaluated in order — the first matching rule wins
    #[serde(default)]
    pub filters: Vec<FilterRuleConfig>,

    /// Bound on every HTTP call (payload fetch and RPC upload); no call
    /// blocks past this (default: 30 seconds)
    #[serde(default = "default_http_timeout")]
    pub http_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transmission: TransmissionConfig::default(),
            state_file: default_state_file(),
            filters: Vec::new(),
            http_timeout: default_http_timeout(),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    9091
}

fn default_state_file() -> PathBuf {
    PathBuf::from("./torrent-dl.state")
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}
