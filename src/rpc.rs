//! Transmission RPC client — submits raw torrent data to the daemon's
//! `torrent-add` endpoint and classifies the reply.
//!
//! The client never touches the dedup state; recording a processed entry is
//! the orchestrator's job, kept separate so retries compose externally.

use crate::error::{Error, Result};
use crate::types::UploadOutcome;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::json;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Header carrying Transmission's CSRF token
const SESSION_ID_HEADER: &str = "X-Transmission-Session-Id";

/// Response envelope of an RPC call; only the `result` string matters here
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
}

/// Client for the Transmission daemon's HTTP/JSON RPC endpoint.
///
/// Every call is bounded by the timeout given at construction and can be
/// aborted through a [`CancellationToken`]; both conditions surface as
/// network-level errors ([`Error::is_network`]), never as an
/// [`UploadOutcome::Failure`].
#[derive(Debug)]
pub struct TransmissionClient {
    http: reqwest::Client,
    endpoint: String,
    auth: Option<(String, String)>,
    /// CSRF session id negotiated with the daemon, cached across calls
    session_id: Mutex<Option<String>>,
}

impl TransmissionClient {
    /// Build a client for the daemon at `host:port`.
    ///
    /// `auth` is the opaque `user:password` credential (None disables
    /// authentication); `timeout` bounds every request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the underlying HTTP client cannot be
    /// constructed.
    pub fn new(host: &str, port: u16, auth: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {e}"),
                key: None,
            })?;

        let auth = auth
            .filter(|credential| !credential.is_empty())
            .map(|credential| match credential.split_once(':') {
                Some((user, pass)) => (user.to_string(), pass.to_string()),
                None => (credential.to_string(), String::new()),
            });

        Ok(Self {
            http,
            endpoint: format!("http://{host}:{port}/transmission/rpc"),
            auth,
            session_id: Mutex::new(None),
        })
    }

    /// Upload raw torrent data, letting the daemon pick its default
    /// download location.
    ///
    /// # Errors
    ///
    /// [`Error::Network`] on connection failure or timeout,
    /// [`Error::Cancelled`] when `cancel` fires first, and
    /// [`Error::Protocol`] when the reply is not a well-formed RPC response.
    pub async fn add_torrent(
        &self,
        payload: &[u8],
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome> {
        self.add_torrent_to(payload, None, cancel).await
    }

    /// Upload raw torrent data, directing the daemon to download its content
    /// into `download_dir` (ignored when None or empty).
    ///
    /// # Errors
    ///
    /// Same as [`add_torrent`](TransmissionClient::add_torrent).
    pub async fn add_torrent_to(
        &self,
        payload: &[u8],
        download_dir: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome> {
        let mut arguments = json!({ "metainfo": BASE64.encode(payload) });
        if let Some(dir) = download_dir.filter(|d| !d.is_empty()) {
            arguments["download-dir"] = json!(dir);
        }
        let body = json!({ "method": "torrent-add", "arguments": arguments });

        let mut response = self.post(&body, cancel).await?;

        // The daemon rejects the first request of a session with 409 and
        // hands out the CSRF token to use from then on; retry once with it.
        if response.status() == reqwest::StatusCode::CONFLICT {
            if let Some(id) = response
                .headers()
                .get(SESSION_ID_HEADER)
                .and_then(|value| value.to_str().ok())
            {
                debug!(session_id = %id, "negotiated Transmission session id");
                if let Ok(mut guard) = self.session_id.lock() {
                    *guard = Some(id.to_string());
                }
            }
            response = self.post(&body, cancel).await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Protocol(format!(
                "RPC endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let text = response.text().await?;
        let parsed: RpcResponse = serde_json::from_str(&text).map_err(|_| {
            Error::Protocol(format!("RPC response has no usable result field: {text}"))
        })?;

        let outcome = classify(&parsed.result);
        match &outcome {
            UploadOutcome::Success => debug!("torrent upload successful"),
            UploadOutcome::DuplicateAtRemote => debug!("torrent already present at the daemon"),
            UploadOutcome::Failure(reason) => {
                warn!(reason = %reason, "daemon rejected torrent upload");
            }
        }
        Ok(outcome)
    }

    async fn post(
        &self,
        body: &serde_json::Value,
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.post(&self.endpoint).json(body);

        if let Some((user, pass)) = &self.auth {
            request = request.basic_auth(user, Some(pass));
        }

        let session_id = self.session_id.lock().ok().and_then(|guard| guard.clone());
        if let Some(id) = session_id {
            request = request.header(SESSION_ID_HEADER, id);
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = request.send() => Ok(result?),
        }
    }
}

/// Map the daemon's `result` string onto an outcome. The daemon reports
/// duplicates with a message starting with "duplicate torrent"; anything
/// that is neither that nor a success is carried verbatim as the failure
/// reason.
fn classify(result: &str) -> UploadOutcome {
    if result.starts_with("success") {
        UploadOutcome::Success
    } else if result.starts_with("duplicate torrent") {
        UploadOutcome::DuplicateAtRemote
    } else {
        UploadOutcome::Failure(result.to_string())
    }
}
