//! Single-attempt HTTP transport for pushing bytes to the file server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::{Method, StatusCode};

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::progress::ProgressSample;
use crate::task::Task;

/// Header signalling append semantics for a resumed upload.
pub const UPDATE_RANGE_HEADER: &str = "X-Update-Range";

/// Progress callback invoked by a transport as bytes go out.
pub type ProgressFn = Arc<dyn Fn(ProgressSample) + Send + Sync>;

/// Outcome of a single upload attempt.
///
/// A tagged result instead of a raw status code, so an aborted request can
/// never be mistaken for a server error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The server answered with a status in [200, 300).
    Success,
    /// The server answered with a status outside [200, 300).
    ServerRejected {
        /// HTTP status code.
        status: u16,
        /// Reason phrase for the status, empty when unknown.
        status_text: String,
    },
    /// The request never completed (connection error or abort).
    NetworkAborted,
}

impl AttemptOutcome {
    /// Returns true when the attempt succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Reason string for a rejected attempt (`"<status> <statusText>"`).
    /// Aborted attempts carry no reason.
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Self::ServerRejected {
                status,
                status_text,
            } => {
                if status_text.is_empty() {
                    Some(status.to_string())
                } else {
                    Some(format!("{status} {status_text}"))
                }
            }
            Self::Success | Self::NetworkAborted => None,
        }
    }
}

/// Executes the HTTP side of the engine: upload attempts, length probes and
/// session verification. Implemented by [`HttpTransport`] in production and
/// by scripted fakes in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one upload attempt for `task`, emitting progress samples as
    /// bytes go out. Never retries internally.
    async fn attempt(&self, task: &Task, on_progress: ProgressFn) -> AttemptOutcome;

    /// Probes the destination path for an existing object.
    ///
    /// Returns `Ok(Some(len))` when the destination exists (status 200, with
    /// `len` parsed from `Content-Length`, 0 when absent or unparseable) and
    /// `Ok(None)` for any other status.
    ///
    /// # Errors
    ///
    /// Returns an error only when the request itself fails.
    async fn probe(&self, relative_path: &str) -> Result<Option<u64>>;

    /// One session verification round-trip.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    async fn verify_session(&self) -> Result<()>;
}

fn classify_status(status: StatusCode) -> AttemptOutcome {
    if status.is_success() {
        AttemptOutcome::Success
    } else {
        AttemptOutcome::ServerRejected {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
        }
    }
}

pub(crate) fn ensure_success(res: &reqwest::Response) -> Result<()> {
    let status = res.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::Rejected {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
        })
    }
}

/// Production transport speaking the file-server HTTP contract:
/// `PUT` for fresh uploads, `PATCH` + `X-Update-Range: append` for resumed
/// ones, `HEAD` for length probes and `CHECKAUTH` for session verification.
pub struct HttpTransport {
    http: reqwest::Client,
    server: ServerConfig,
}

impl HttpTransport {
    /// Creates a transport over an existing client.
    #[must_use]
    pub const fn new(http: reqwest::Client, server: ServerConfig) -> Self {
        Self { http, server }
    }

    /// The server this transport talks to.
    #[must_use]
    pub const fn server(&self) -> &ServerConfig {
        &self.server
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn attempt(&self, task: &Task, on_progress: ProgressFn) -> AttemptOutcome {
        let url = match self.server.url_for(task.relative_path()) {
            Ok(url) => url,
            Err(e) => {
                log::error!("cannot build upload URL for {}: {e}", task.relative_path());
                return AttemptOutcome::NetworkAborted;
            }
        };

        let offset = task.resume_offset();
        let total = task.total_size().saturating_sub(offset);
        let stream = match task.source().slice_from(offset).await {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("cannot open byte source for {}: {e}", task.relative_path());
                return AttemptOutcome::NetworkAborted;
            }
        };

        let sent = Arc::new(AtomicU64::new(0));
        let counting = stream.inspect_ok(move |chunk| {
            let so_far = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed) + chunk.len() as u64;
            on_progress(ProgressSample {
                sent: so_far,
                total,
            });
        });
        let body = reqwest::Body::wrap_stream(counting);

        let request = if offset > 0 {
            log::debug!("PATCH {url} (append from {offset})");
            self.http
                .patch(url)
                .header(UPDATE_RANGE_HEADER, "append")
                .body(body)
        } else {
            log::debug!("PUT {url}");
            self.http.put(url).body(body)
        };

        match request.send().await {
            Ok(res) => classify_status(res.status()),
            Err(e) => {
                log::debug!("upload of {} did not complete: {e}", task.relative_path());
                AttemptOutcome::NetworkAborted
            }
        }
    }

    async fn probe(&self, relative_path: &str) -> Result<Option<u64>> {
        let url = self.server.url_for(relative_path)?;
        let res = self.http.head(url).send().await?;
        if res.status() == StatusCode::OK {
            let len = res
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0);
            Ok(Some(len))
        } else {
            Ok(None)
        }
    }

    async fn verify_session(&self) -> Result<()> {
        let method = Method::from_bytes(b"CHECKAUTH").expect("static method token");
        let res = self
            .http
            .request(method, self.server.base().clone())
            .send()
            .await?;
        ensure_success(&res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_success_range() {
        assert_eq!(classify_status(StatusCode::OK), AttemptOutcome::Success);
        assert_eq!(
            classify_status(StatusCode::NO_CONTENT),
            AttemptOutcome::Success
        );
        assert_eq!(
            classify_status(StatusCode::from_u16(299).unwrap()),
            AttemptOutcome::Success
        );
    }

    #[test]
    fn classify_rejection_carries_reason() {
        let outcome = classify_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            outcome.failure_reason().as_deref(),
            Some("503 Service Unavailable")
        );
        assert!(!outcome.is_success());
    }

    #[test]
    fn classify_redirect_is_rejection() {
        let outcome = classify_status(StatusCode::FOUND);
        assert_eq!(outcome.failure_reason().as_deref(), Some("302 Found"));
    }

    #[test]
    fn unknown_status_text_omitted_from_reason() {
        let outcome = classify_status(StatusCode::from_u16(599).unwrap());
        assert_eq!(outcome.failure_reason().as_deref(), Some("599"));
    }

    #[test]
    fn aborted_attempt_has_no_reason() {
        assert_eq!(AttemptOutcome::NetworkAborted.failure_reason(), None);
        assert_eq!(AttemptOutcome::Success.failure_reason(), None);
    }
}
