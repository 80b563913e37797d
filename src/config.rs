//! Configuration types for the upload engine.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Tuning knobs for the upload engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of transfers active at once (minimum 1).
    pub max_concurrent: usize,
    /// Whether the first dispatch performs a session verification round-trip.
    pub verify_session: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            verify_session: true,
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the concurrency cap.
    #[must_use]
    pub const fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Enables or disables the session gate.
    #[must_use]
    pub const fn with_verify_session(mut self, verify: bool) -> Self {
        self.verify_session = verify;
        self
    }
}

/// Location of the remote file-server endpoint.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    base: Url,
}

impl ServerConfig {
    /// Parses the server base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is not an absolute, path-capable URL.
    pub fn new(base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(base.to_string()));
        }
        Ok(Self { base: url })
    }

    /// The server base URL.
    #[must_use]
    pub const fn base(&self) -> &Url {
        &self.base
    }

    /// Builds the destination URL for a logical path, percent-encoding each
    /// path segment individually.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot take path segments.
    pub fn url_for(&self, relative_path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidUrl(self.base.to_string()))?;
            segments.pop_if_empty();
            for part in relative_path.split('/').filter(|p| !p.is_empty()) {
                segments.push(part);
            }
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_engine_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent, 1);
        assert!(config.verify_session);
    }

    #[test]
    fn engine_config_builder_pattern() {
        let config = EngineConfig::new()
            .with_max_concurrent(4)
            .with_verify_session(false);
        assert_eq!(config.max_concurrent, 4);
        assert!(!config.verify_session);
    }

    #[test]
    fn engine_config_serializes_to_toml() {
        let config = EngineConfig::default().with_max_concurrent(3);
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(deserialized.max_concurrent, 3);
        assert_eq!(deserialized.verify_session, config.verify_session);
    }

    #[test]
    fn server_config_rejects_bad_urls() {
        assert!(ServerConfig::new("not a url").is_err());
        assert!(ServerConfig::new("mailto:user@host").is_err());
        assert!(ServerConfig::new("http://localhost:5000/").is_ok());
    }

    #[test]
    fn url_for_joins_segments() {
        let server = ServerConfig::new("http://localhost:5000/").unwrap();
        let url = server.url_for("docs/report.pdf").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/docs/report.pdf");
    }

    #[test]
    fn url_for_keeps_base_path() {
        let server = ServerConfig::new("http://host/share/").unwrap();
        let url = server.url_for("a/b.txt").unwrap();
        assert_eq!(url.as_str(), "http://host/share/a/b.txt");
    }

    #[test]
    fn url_for_percent_encodes_segments() {
        let server = ServerConfig::new("http://host/").unwrap();
        let url = server.url_for("my dir/100%.txt").unwrap();
        assert_eq!(url.as_str(), "http://host/my%20dir/100%25.txt");
    }

    #[test]
    fn url_for_skips_empty_segments() {
        let server = ServerConfig::new("http://host/").unwrap();
        let url = server.url_for("/a//b/").unwrap();
        assert_eq!(url.as_str(), "http://host/a/b");
    }
}
