//! Feed-entry processing pipeline.
//!
//! The [`FeedAgent`] drives each entry through the decision pipeline:
//! seen-check, rule matching, payload fetch, save-path resolution, upload,
//! dedup recording. Entries are processed sequentially, one blocking
//! pipeline at a time; the agent is the sole owner of the dedup state, so
//! no mutation races are possible. A failure on one entry never aborts the
//! rest of the batch — failed entries stay unrecorded and are retried on
//! the next feed poll.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filename::torrent_save_path;
use crate::matcher::{self, FilterRule};
use crate::rpc::TransmissionClient;
use crate::state::DedupStore;
use crate::types::{FeedItem, ItemDisposition, UploadOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrates the decision pipeline for feed entries.
///
/// Holds the compiled rule list (read-only), the dedup state (exclusively
/// owned), and the HTTP clients. Configuration flows in through
/// [`FeedAgent::new`] — there is no process-wide lookup.
pub struct FeedAgent {
    rules: Vec<FilterRule>,
    state: DedupStore,
    client: TransmissionClient,
    http: reqwest::Client,
}

impl FeedAgent {
    /// Create an agent from configuration.
    ///
    /// Compiles the filter rules (invalid patterns are logged and skipped),
    /// loads the dedup state, and builds the HTTP clients.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the state file cannot be opened — fatal at
    /// startup, since an empty default would silently re-download history —
    /// and [`Error::Config`] when a client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let rules = matcher::compile_rules(&config.filters);
        let state = DedupStore::load(&config.state_file)?;
        let client = TransmissionClient::new(
            &config.transmission.host,
            config.transmission.port,
            config.transmission.auth.as_deref(),
            config.http_timeout,
        )?;
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {e}"),
                key: None,
            })?;

        info!(
            rules = rules.len(),
            known_urls = state.len(),
            "feed agent initialized"
        );
        Ok(Self {
            rules,
            state,
            client,
            http,
        })
    }

    /// Read access to the dedup state
    pub fn state(&self) -> &DedupStore {
        &self.state
    }

    /// Process a batch of feed entries sequentially.
    ///
    /// Returns one disposition per entry, in input order. Entries that fail
    /// are reported as [`ItemDisposition::Errored`] and left unrecorded;
    /// processing always continues with the next entry. Once `cancel` fires,
    /// the in-flight HTTP call is aborted and the remaining entries are
    /// reported as errored without being touched.
    pub async fn process_items(
        &mut self,
        items: &[FeedItem],
        cancel: &CancellationToken,
    ) -> Vec<ItemDisposition> {
        let mut dispositions = Vec::with_capacity(items.len());
        for item in items {
            if cancel.is_cancelled() {
                dispositions.push(ItemDisposition::Errored {
                    error: Error::Cancelled.to_string(),
                });
                continue;
            }

            let disposition = match self.process_item(item, cancel).await {
                Ok(disposition) => disposition,
                Err(e) => {
                    warn!(item = %item.name, error = %e, "entry left for next run");
                    ItemDisposition::Errored {
                        error: e.to_string(),
                    }
                }
            };
            dispositions.push(disposition);
        }
        dispositions
    }

    /// Run a single entry through the pipeline.
    ///
    /// # Errors
    ///
    /// Network and protocol failures during the payload fetch or the upload;
    /// the entry is left unrecorded in every error case.
    pub async fn process_item(
        &mut self,
        item: &FeedItem,
        cancel: &CancellationToken,
    ) -> Result<ItemDisposition> {
        if self.state.contains(&item.url) {
            debug!(item = %item.name, "already downloaded, skipping");
            return Ok(ItemDisposition::AlreadySeen);
        }

        let Some(folder) = matcher::match_rules(&self.rules, &item.name, &item.feed_id) else {
            debug!(item = %item.name, "no filter rule matched");
            return Ok(ItemDisposition::NoMatch);
        };
        if folder.is_empty() {
            warn!(
                item = %item.name,
                "filter matched but resolved an empty folder, check the rule's folder template"
            );
            return Ok(ItemDisposition::EmptyFolder);
        }

        let (payload, server_filename) = self.fetch_payload(&item.url, cancel).await?;
        let path = torrent_save_path(server_filename.as_deref(), &item.url, &folder);

        match self
            .client
            .add_torrent_to(&payload, Some(&folder), cancel)
            .await?
        {
            UploadOutcome::Success => {
                self.record(&item.url);
                info!(item = %item.name, path = %path, "torrent delivered");
                Ok(ItemDisposition::Delivered { path })
            }
            UploadOutcome::DuplicateAtRemote => {
                self.record(&item.url);
                info!(item = %item.name, "torrent already known to the daemon");
                Ok(ItemDisposition::Duplicate { path })
            }
            UploadOutcome::Failure(reason) => {
                warn!(item = %item.name, reason = %reason, "daemon rejected the torrent");
                Ok(ItemDisposition::Rejected { reason })
            }
        }
    }

    /// Fetch the torrent payload, capturing the server-suggested filename
    /// from the Content-Disposition header when present.
    async fn fetch_payload(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<(Vec<u8>, Option<String>)> {
        let request = self.http.get(url);
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = request.send() => result?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Protocol(format!(
                "torrent download returned HTTP {} for {url}",
                status.as_u16()
            )));
        }

        let server_filename = content_disposition_filename(&response);
        let payload = response.bytes().await?.to_vec();
        Ok((payload, server_filename))
    }

    /// Record a processed URL and checkpoint the state file. A failed save
    /// is surfaced as a warning, not an error — the entry was delivered; at
    /// worst it is reprocessed after a restart and the daemon reports it as
    /// a duplicate.
    fn record(&mut self, url: &str) {
        self.state.insert(url.to_string());
        if let Err(e) = self.state.save() {
            warn!(
                error = %e,
                "failed to persist dedup state, entry may be reprocessed after restart"
            );
        }
    }
}

/// Extract the filename from a Content-Disposition header, if any.
/// Handles both the plain `filename="..."` form and the RFC 5987
/// `filename*=charset''encoded` form.
fn content_disposition_filename(response: &reqwest::Response) -> Option<String> {
    let value = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)?
        .to_str()
        .ok()?;

    for part in value.split(';') {
        let part = part.trim();
        if let Some(name) = part.strip_prefix("filename=") {
            let name = name.trim_matches('"');
            if !name.is_empty() {
                return Some(name.to_string());
            }
        } else if let Some(encoded) = part.strip_prefix("filename*=")
            && let Some(idx) = encoded.rfind('\'')
            && let Ok(decoded) = urlencoding::decode(&encoded[idx + 1..])
            && !decoded.is_empty()
        {
            return Some(decoded.into_owned());
        }
    }
    None
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
