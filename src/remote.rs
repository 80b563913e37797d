//! Collaborator file-management operations against the file server.
//!
//! These share the upload engine's success contract (any status in
//! [200, 300)) but are otherwise independent of the scheduler: deleting,
//! creating and moving remote paths are one-shot calls, not queued tasks.

use reqwest::Method;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::transport::ensure_success;

/// Interactive prompt capability injected into operations that need user
/// input, so they stay testable without a real user interface.
pub trait Prompt: Send + Sync {
    /// Asks the user for a string, pre-filled with `initial`.
    /// `None` cancels the operation.
    fn prompt(&self, message: &str, initial: &str) -> Option<String>;

    /// Asks a yes/no question.
    fn confirm(&self, message: &str) -> bool;
}

/// A prompt that never answers; confirmations are declined.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl Prompt for NoPrompt {
    fn prompt(&self, _message: &str, _initial: &str) -> Option<String> {
        None
    }

    fn confirm(&self, _message: &str) -> bool {
        false
    }
}

/// Remote file-management operations: DELETE, MKCOL, MOVE and empty PUT.
pub struct RemoteOps {
    http: reqwest::Client,
    server: ServerConfig,
}

impl RemoteOps {
    /// Creates the operations handle over an existing client.
    #[must_use]
    pub const fn new(http: reqwest::Client, server: ServerConfig) -> Self {
        Self { http, server }
    }

    /// Deletes a remote path.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    pub async fn delete_path(&self, path: &str) -> Result<()> {
        let res = self.http.delete(self.server.url_for(path)?).send().await?;
        ensure_success(&res)
    }

    /// Creates a remote directory (MKCOL).
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    pub async fn create_dir(&self, path: &str) -> Result<()> {
        let method = Method::from_bytes(b"MKCOL").expect("static method token");
        let res = self
            .http
            .request(method, self.server.url_for(path)?)
            .send()
            .await?;
        ensure_success(&res)
    }

    /// Creates an empty remote file.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails or the server rejects it.
    pub async fn create_file(&self, path: &str) -> Result<()> {
        let res = self
            .http
            .put(self.server.url_for(path)?)
            .body(Vec::new())
            .send()
            .await?;
        ensure_success(&res)
    }

    /// Probes whether a remote path exists (HEAD answered 200).
    ///
    /// # Errors
    ///
    /// Returns an error only when the request itself fails.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        let res = self.http.head(self.server.url_for(path)?).send().await?;
        Ok(res.status() == reqwest::StatusCode::OK)
    }

    /// Moves `from` to `to` (MOVE with a `Destination` header).
    ///
    /// When the destination already exists the overwrite is confirmed through
    /// `prompt`; returns `Ok(false)` when the user declines.
    ///
    /// # Errors
    ///
    /// Returns an error when a request fails or the server rejects the move.
    pub async fn move_path(&self, from: &str, to: &str, prompt: &dyn Prompt) -> Result<bool> {
        let destination = self.server.url_for(to)?;
        if self.exists(to).await? && !prompt.confirm(&format!("Overwrite existing `{to}`?")) {
            return Ok(false);
        }
        let method = Method::from_bytes(b"MOVE").expect("static method token");
        let res = self
            .http
            .request(method, self.server.url_for(from)?)
            .header("Destination", destination.as_str())
            .send()
            .await?;
        ensure_success(&res)?;
        Ok(true)
    }
}
