//! Error types for reference resolution, schema loading and validation.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::syntax::SyntaxMessage;

/// Transport failures raised by a [`UriFetcher`](crate::UriFetcher).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no fetcher registered for scheme \"{scheme}\"")]
    UnsupportedScheme { scheme: String },

    #[error("cannot fetch {locator}: {message}")]
    InvalidLocator { locator: String, message: String },

    #[error("cannot read archive entry {locator}: {source}")]
    Archive {
        locator: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Errors while turning references into schema nodes.
///
/// Cloneable because failed loads are cached alongside successful ones.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("invalid reference \"{input}\": {message}")]
    InvalidReference { input: String, message: String },

    #[error("schema at {locator} has {} syntax error(s)", messages.iter().filter(|m| m.is_fatal()).count())]
    Syntax {
        locator: String,
        messages: Vec<SyntaxMessage>,
    },

    #[error("dangling reference: {reference}")]
    DanglingReference { reference: String },

    #[error("failed to load {locator}: {source}")]
    Fetch {
        locator: String,
        #[source]
        source: Arc<FetchError>,
    },

    #[error("invalid JSON at {locator}: {message}")]
    InvalidJson { locator: String, message: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::Fetch { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors from a top-level validation call.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<ValidationMessage> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Resolve(e) => e.exit_code(),
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Single keyword failure with instance path context.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationMessage {
    /// JSON Pointer (RFC 6901) to the offending instance node.
    pub path: String,
    /// Keyword whose check failed.
    pub keyword: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() { "/" } else { &self.path };
        write!(f, "{}: [{}] {}", path, self.keyword, self.message)
    }
}
