//! Document loading: pluggable per-scheme fetchers and JSON helpers.
//!
//! The registry asks a [`UriFetcher`] for the raw bytes behind a locator and
//! parses them itself. `file`, `jar` and `archive` are always available;
//! `http` requires the `remote` feature (enabled by default). `https` is
//! deliberately left to caller-supplied fetchers.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::error::{FetchError, ResolveError};
use crate::reference::{JsonRef, ARCHIVE_SCHEMES};
use crate::uri::percent_decode;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of raw document bytes for one or more URI schemes.
///
/// Implementations do their own retrying, if any. The registry calls
/// `fetch` at most once per locator.
pub trait UriFetcher: Send + Sync {
    /// Fetch the document behind `locator` (a reference without fragment).
    fn fetch(&self, locator: &JsonRef) -> Result<Vec<u8>, FetchError>;
}

/// Reads `file:` locators from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl UriFetcher for FileFetcher {
    fn fetch(&self, locator: &JsonRef) -> Result<Vec<u8>, FetchError> {
        let path = file_path(locator.locator())?;
        if !path.exists() {
            return Err(FetchError::FileNotFound { path });
        }
        std::fs::read(&path).map_err(|source| FetchError::ReadError { path, source })
    }
}

fn file_path(locator: &str) -> Result<PathBuf, FetchError> {
    let invalid = |message: String| FetchError::InvalidLocator {
        locator: locator.to_string(),
        message,
    };
    let url = url::Url::parse(locator).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "file" {
        return Err(invalid("not a file URL".to_string()));
    }
    url.to_file_path()
        .map_err(|()| invalid("not a local file path".to_string()))
}

/// Reads entries of local zip archives: `jar:file:/p/my.jar!/a/b.json`.
///
/// The part before `!` must be a `file:` URL; the part after it names the
/// entry inside the archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct JarFetcher;

impl UriFetcher for JarFetcher {
    fn fetch(&self, locator: &JsonRef) -> Result<Vec<u8>, FetchError> {
        let text = locator.locator();
        let invalid = |message: &str| FetchError::InvalidLocator {
            locator: text.to_string(),
            message: message.to_string(),
        };

        let inner = locator
            .scheme()
            .filter(|scheme| ARCHIVE_SCHEMES.contains(scheme))
            .and_then(|scheme| text.get(scheme.len() + 1..))
            .ok_or_else(|| invalid("not an archive locator"))?;
        let (archive, entry) = inner
            .split_once('!')
            .ok_or_else(|| invalid("missing '!' between archive and entry"))?;
        let entry = percent_decode(entry.trim_start_matches('/'));

        let path = file_path(archive)?;
        if !path.exists() {
            return Err(FetchError::FileNotFound { path });
        }
        let file = File::open(&path).map_err(|source| FetchError::ReadError {
            path: path.clone(),
            source,
        })?;

        let archive_error = |source| FetchError::Archive {
            locator: text.to_string(),
            source,
        };
        let mut archive = zip::ZipArchive::new(file).map_err(archive_error)?;
        let mut entry = archive.by_name(&entry).map_err(archive_error)?;

        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .map_err(|source| FetchError::ReadError { path, source })?;
        Ok(bytes)
    }
}

/// Fetches `http:` locators with a blocking client.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Copy)]
pub struct HttpFetcher {
    timeout: Duration,
}

#[cfg(feature = "remote")]
impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[cfg(feature = "remote")]
impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(HTTP_TIMEOUT)
    }
}

#[cfg(feature = "remote")]
impl UriFetcher for HttpFetcher {
    fn fetch(&self, locator: &JsonRef) -> Result<Vec<u8>, FetchError> {
        let url = locator.locator();
        let network = |source| FetchError::Network {
            url: url.to_string(),
            source,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(network)?;

        let response = client.get(url).send().map_err(network)?;

        // Check for HTTP errors before reading the body
        let response = response.error_for_status().map_err(network)?;

        response
            .bytes()
            .map(|body| body.to_vec())
            .map_err(network)
    }
}

/// Serves documents from memory, keyed by locator.
///
/// Useful for embedding schemas in a binary or for serving an archive's
/// entries that were unpacked elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. The fragment of `locator`, if any, is ignored.
    pub fn insert(&mut self, locator: &JsonRef, content: impl Into<Vec<u8>>) {
        self.documents
            .insert(locator.locator().to_string(), content.into());
    }

    /// Builder form of [`MemoryFetcher::insert`].
    pub fn with(mut self, locator: &JsonRef, content: impl Into<Vec<u8>>) -> Self {
        self.insert(locator, content);
        self
    }
}

impl UriFetcher for MemoryFetcher {
    fn fetch(&self, locator: &JsonRef) -> Result<Vec<u8>, FetchError> {
        self.documents
            .get(locator.locator())
            .cloned()
            .ok_or_else(|| FetchError::InvalidLocator {
                locator: locator.locator().to_string(),
                message: "no such document".to_string(),
            })
    }
}

/// Load a JSON document from a file path.
///
/// # Errors
///
/// Returns `ResolveError::Fetch` if the file is missing or unreadable, or
/// `ResolveError::InvalidJson` if it isn't valid JSON.
pub fn load_json(path: &Path) -> Result<Value, ResolveError> {
    let locator = path.display().to_string();
    let fetch_error = |source: FetchError| ResolveError::Fetch {
        locator: locator.clone(),
        source: Arc::new(source),
    };

    if !path.exists() {
        return Err(fetch_error(FetchError::FileNotFound {
            path: path.to_path_buf(),
        }));
    }

    let content = std::fs::read_to_string(path).map_err(|source| {
        fetch_error(FetchError::ReadError {
            path: path.to_path_buf(),
            source,
        })
    })?;

    load_json_str(&content).map_err(|e| match e {
        ResolveError::InvalidJson { message, .. } => ResolveError::InvalidJson {
            locator: locator.clone(),
            message,
        },
        other => other,
    })
}

/// Load a JSON document from a string.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the string isn't valid JSON.
pub fn load_json_str(content: &str) -> Result<Value, ResolveError> {
    serde_json::from_str(content).map_err(|e| ResolveError::InvalidJson {
        locator: "<string>".to_string(),
        message: e.to_string(),
    })
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Turn a command-line source (file path or URL) into a reference.
///
/// File paths become absolute `file:` URLs so that relative `$ref`s inside
/// the document resolve against its directory.
pub fn source_to_reference(source: &str) -> Result<JsonRef, FetchError> {
    if is_url(source) || source.starts_with("file:") {
        return JsonRef::from_string(source).map_err(|e| FetchError::InvalidLocator {
            locator: source.to_string(),
            message: e.to_string(),
        });
    }

    let path = Path::new(source);
    if !path.exists() {
        return Err(FetchError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let absolute = path.canonicalize().map_err(|source| FetchError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let url = url::Url::from_file_path(&absolute).map_err(|()| FetchError::InvalidLocator {
        locator: source.to_string(),
        message: "cannot express path as a file URL".to_string(),
    })?;
    JsonRef::from_string(url.as_str()).map_err(|e| FetchError::InvalidLocator {
        locator: url.to_string(),
        message: e.to_string(),
    })
}
