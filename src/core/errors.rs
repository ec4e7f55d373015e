//! RD-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, DashError>;

/// Top-level error type for race_dash.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("[RD-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[RD-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[RD-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[RD-2001] transport failure fetching {source_addr}: {details}")]
    Transport {
        source_addr: String,
        details: String,
    },

    #[error("[RD-2002] HTTP error! status: {status} ({source_addr})")]
    HttpStatus { source_addr: String, status: u16 },

    #[error("[RD-2003] malformed payload: {details}")]
    MalformedPayload { details: String },

    #[error("[RD-2004] cannot read feed file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[RD-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[RD-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[RD-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl DashError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "RD-1001",
            Self::MissingConfig { .. } => "RD-1002",
            Self::ConfigParse { .. } => "RD-1003",
            Self::Transport { .. } => "RD-2001",
            Self::HttpStatus { .. } => "RD-2002",
            Self::MalformedPayload { .. } => "RD-2003",
            Self::SourceRead { .. } => "RD-2004",
            Self::Serialization { .. } => "RD-2101",
            Self::Io { .. } => "RD-3002",
            Self::Runtime { .. } => "RD-3900",
        }
    }

    /// Whether retrying (on the next poll cycle) might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::HttpStatus { .. }
                | Self::MalformedPayload { .. }
                | Self::SourceRead { .. }
                | Self::Io { .. }
                | Self::Runtime { .. }
        )
    }

    /// Whether this error came from fetching or decoding the feed.
    #[must_use]
    pub const fn is_feed_error(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::HttpStatus { .. }
                | Self::MalformedPayload { .. }
                | Self::SourceRead { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for DashError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for DashError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
