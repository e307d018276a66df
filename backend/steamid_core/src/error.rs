// backend/steamid_core/src/error.rs

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the ID document. Any of these aborts the run
/// before a single identifier is sent.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Could not read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid JSON in file: {} ({source})", path.display())]
    MalformedDocument {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid ID document {}: {detail}", path.display())]
    InvalidShape { path: PathBuf, detail: String },
}

impl LoadError {
    /// True when the file was readable but its content is not a usable document.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            LoadError::MalformedDocument { .. } | LoadError::InvalidShape { .. }
        )
    }
}

/// Why a single notify attempt failed. Never fatal to the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("{0}")]
    Network(String),

    /// `message` is the server's `error` field, or `HTTP <status>` when it sent none.
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Empty response body")]
    EmptyResponseBody,

    #[error("Invalid JSON: {snippet}")]
    MalformedJsonResponse { snippet: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    Extract(#[from] Box<figment::Error>),

    #[error("MARKER_API_KEY must be set")]
    MissingApiKey,

    #[error("Invalid API endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("HTTP client could not be built: {0}")]
    Client(#[from] reqwest::Error),
}
