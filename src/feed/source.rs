//! Feed sources: where a poll cycle reads its payload body from.
//!
//! `http://` and `https://` addresses are fetched with a blocking `ureq` agent;
//! everything else is read from the local filesystem, which covers the common
//! setup of a controller process rewriting `parameters.json` next to the
//! dashboard.

#![allow(missing_docs)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::core::errors::{DashError, Result};

/// Anything that can produce one payload body per call.
///
/// Implementations must be `Send` so the poller can own them on its thread.
pub trait FeedSource: Send {
    /// Fetch the raw body. Non-success statuses are errors.
    fn fetch(&mut self) -> Result<String>;

    /// Human-readable address for status lines and error messages.
    fn describe(&self) -> String;
}

/// GET a URL with a per-request timeout.
pub struct HttpSource {
    url: String,
    agent: ureq::Agent,
}

impl HttpSource {
    #[must_use]
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl FeedSource for HttpSource {
    fn fetch(&mut self) -> Result<String> {
        let mut response = self.agent.get(self.url.as_str()).call().map_err(|e| match e {
            ureq::Error::StatusCode(status) => DashError::HttpStatus {
                source_addr: self.url.clone(),
                status,
            },
            other => DashError::Transport {
                source_addr: self.url.clone(),
                details: other.to_string(),
            },
        })?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| DashError::Transport {
                source_addr: self.url.clone(),
                details: format!("reading body: {e}"),
            })
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Read a local JSON file on every cycle.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FeedSource for FileSource {
    fn fetch(&mut self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|source| DashError::SourceRead {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Which kind of source an address resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceAddress {
    Http(String),
    File(PathBuf),
}

impl SourceAddress {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Http(raw.to_string())
        } else if let Some(path) = raw.strip_prefix("file://") {
            Self::File(PathBuf::from(path))
        } else {
            Self::File(PathBuf::from(raw))
        }
    }
}

/// Build a boxed source for a configured address.
#[must_use]
pub fn open_source(address: &str, timeout: Duration) -> Box<dyn FeedSource> {
    match SourceAddress::parse(address) {
        SourceAddress::Http(url) => Box::new(HttpSource::new(url, timeout)),
        SourceAddress::File(path) => Box::new(FileSource::new(path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_parsing() {
        assert_eq!(
            SourceAddress::parse("http://car.local:8080/parameters.json"),
            SourceAddress::Http("http://car.local:8080/parameters.json".to_string())
        );
        assert_eq!(
            SourceAddress::parse("HTTPS://car.local/p.json"),
            SourceAddress::Http("HTTPS://car.local/p.json".to_string())
        );
        assert_eq!(
            SourceAddress::parse("file:///srv/dash/parameters.json"),
            SourceAddress::File(PathBuf::from("/srv/dash/parameters.json"))
        );
        assert_eq!(
            SourceAddress::parse(" ./parameters.json "),
            SourceAddress::File(PathBuf::from("./parameters.json"))
        );
    }

    #[test]
    fn file_source_reads_current_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parameters.json");
        fs::write(&path, r#"[{"name":"TV_g","value":"11"}]"#).unwrap();

        let mut source = FileSource::new(&path);
        assert!(source.fetch().unwrap().contains("TV_g"));

        fs::write(&path, r#"[{"name":"TV_g","value":"12"}]"#).unwrap();
        assert!(source.fetch().unwrap().contains("\"12\""));
        assert_eq!(source.describe(), path.display().to_string());
    }

    #[test]
    fn missing_file_is_a_retryable_feed_error() {
        let mut source = FileSource::new("/nonexistent/rdash/parameters.json");
        let err = source.fetch().unwrap_err();
        assert_eq!(err.code(), "RD-2004");
        assert!(err.is_feed_error());
        assert!(err.is_retryable());
    }

    #[test]
    fn open_source_picks_by_scheme() {
        let source = open_source("http://127.0.0.1:9/parameters.json", Duration::from_millis(50));
        assert_eq!(source.describe(), "http://127.0.0.1:9/parameters.json");
        let source = open_source("parameters.json", Duration::from_millis(50));
        assert_eq!(source.describe(), "parameters.json");
    }
}
