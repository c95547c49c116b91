//! Schema references: normalized URI plus fragment pointer.
//!
//! A [`JsonRef`] is what `$ref`, `extends` and `id` values turn into. Two
//! references are equal when their normalized URIs are, with a missing
//! fragment counting as an empty one. Two references *contain* each other
//! when they point into the same document (same locator), whatever their
//! fragments.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use serde_json::Value;

use crate::error::ResolveError;
use crate::types::escape_token;
use crate::uri::{percent_decode, percent_encode_fragment, Uri};

/// Schemes whose scheme-specific part embeds a second locator, split on `!`
/// (`jar:file:/p/my.jar!/entry.json`).
pub const ARCHIVE_SCHEMES: &[&str] = &["jar", "archive"];

static EMPTY: OnceLock<JsonRef> = OnceLock::new();

/// The fragment part of a reference, already percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// JSON Pointer (RFC 6901). The empty pointer addresses the root.
    Pointer(String),
    /// Plain-name fragment, matched against a subschema's `"id": "#name"`.
    Anchor(String),
}

impl Fragment {
    /// The root pointer.
    pub fn root() -> Self {
        Fragment::Pointer(String::new())
    }

    /// Interpret a decoded fragment: empty or `/`-prefixed text is a pointer,
    /// anything else an anchor name.
    pub fn parse(decoded: &str) -> Self {
        if decoded.is_empty() || decoded.starts_with('/') {
            Fragment::Pointer(decoded.to_string())
        } else {
            Fragment::Anchor(decoded.to_string())
        }
    }

    /// True for the root pointer (no fragment, `#`, or `#` + nothing).
    pub fn is_empty(&self) -> bool {
        matches!(self, Fragment::Pointer(p) if p.is_empty())
    }

    /// Locate the addressed node in `document`.
    ///
    /// Returns the node together with its JSON Pointer from the document root,
    /// or `None` if nothing is there.
    pub fn resolve<'a>(&self, document: &'a Value) -> Option<(String, &'a Value)> {
        match self {
            Fragment::Pointer(pointer) => document
                .pointer(pointer)
                .map(|node| (pointer.clone(), node)),
            Fragment::Anchor(name) => {
                let target = format!("#{}", name);
                let mut path = String::new();
                find_anchor(document, &target, &mut path)
                    .then(|| document.pointer(&path).map(|node| (path.clone(), node)))
                    .flatten()
            }
        }
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Pointer(p) | Fragment::Anchor(p) => f.write_str(p),
        }
    }
}

fn find_anchor(value: &Value, target: &str, path: &mut String) -> bool {
    match value {
        Value::Object(map) => {
            if map.get("id").and_then(Value::as_str) == Some(target) {
                return true;
            }
            for (key, child) in map {
                let len = path.len();
                path.push('/');
                path.push_str(&escape_token(key));
                if find_anchor(child, target, path) {
                    return true;
                }
                path.truncate(len);
            }
            false
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                let len = path.len();
                path.push_str(&format!("/{}", i));
                if find_anchor(child, target, path) {
                    return true;
                }
                path.truncate(len);
            }
            false
        }
        _ => false,
    }
}

struct RefInner {
    /// Normalized URI as supplied (fragment may be absent).
    uri: Uri,
    /// Normalized URI with an empty fragment appended when none was given.
    canonical: String,
    /// URI without any fragment.
    locator: String,
    fragment: Fragment,
    display: String,
}

/// An immutable, normalized schema reference. Cheap to clone.
#[derive(Clone)]
pub struct JsonRef {
    inner: Arc<RefInner>,
}

impl JsonRef {
    /// The canonical empty reference (`""`, `#`). Always the same instance.
    pub fn empty() -> Self {
        EMPTY
            .get_or_init(|| {
                let mut built = JsonRef::build(Uri::default());
                if let Some(inner) = Arc::get_mut(&mut built.inner) {
                    inner.display = "#".to_string();
                }
                built
            })
            .clone()
    }

    /// Build a reference from an already parsed URI. Never fails.
    pub fn from_uri(uri: &Uri) -> Self {
        let normalized = uri.normalize();
        let text = normalized.to_string();
        if text.is_empty() || text == "#" {
            return Self::empty();
        }
        Self::build(normalized)
    }

    /// Parse a reference from text.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidReference` if `s` is not a URI reference.
    pub fn from_string(s: &str) -> Result<Self, ResolveError> {
        Uri::parse(s)
            .map(|uri| Self::from_uri(&uri))
            .map_err(|e| ResolveError::InvalidReference {
                input: s.to_string(),
                message: e.to_string(),
            })
    }

    /// Build a reference from a schema value.
    ///
    /// Non-string values yield the empty reference rather than an error.
    pub fn from_node(node: &Value) -> Result<Self, ResolveError> {
        match node {
            Value::String(s) => Self::from_string(s),
            _ => Ok(Self::empty()),
        }
    }

    fn build(uri: Uri) -> Self {
        let raw_fragment = uri.fragment().unwrap_or("").to_string();
        let canonical = uri.with_fragment(Some(&raw_fragment)).to_string();
        let locator = uri.with_fragment(None).to_string();
        let fragment = Fragment::parse(&percent_decode(&raw_fragment));
        let display = uri.to_string();
        Self {
            inner: Arc::new(RefInner {
                uri,
                canonical,
                locator,
                fragment,
                display,
            }),
        }
    }

    /// True if the URI has a scheme and the fragment is empty.
    pub fn is_absolute(&self) -> bool {
        self.inner.uri.has_scheme() && self.inner.fragment.is_empty()
    }

    /// True for the canonical empty reference.
    pub fn is_empty(&self) -> bool {
        self.inner.canonical == "#"
    }

    /// The document part of this reference, without fragment.
    pub fn locator(&self) -> &str {
        &self.inner.locator
    }

    /// This reference with its fragment dropped.
    pub fn to_locator(&self) -> Self {
        Self::from_uri(&self.inner.uri.with_fragment(None))
    }

    pub fn fragment(&self) -> &Fragment {
        &self.inner.fragment
    }

    pub fn scheme(&self) -> Option<&str> {
        self.inner.uri.scheme()
    }

    /// Reference into the same document at the given JSON Pointer.
    pub fn with_pointer(&self, pointer: &str) -> Self {
        Self::from_uri(
            &self
                .inner
                .uri
                .with_fragment(Some(&percent_encode_fragment(pointer))),
        )
    }

    /// True iff both references address the same document.
    pub fn contains(&self, other: &JsonRef) -> bool {
        self.inner.locator == other.inner.locator
    }

    /// Resolve `other` against this reference.
    ///
    /// Absolute references come back unchanged. Archive references resolve
    /// relative to their embedded entry path, since the archive scheme makes
    /// the whole URI opaque.
    pub fn resolve(&self, other: &JsonRef) -> JsonRef {
        if other.inner.uri.has_scheme() {
            return other.clone();
        }
        let target = self
            .resolve_archive(other)
            .unwrap_or_else(|| self.inner.uri.resolve(&other.inner.uri));
        Self::from_uri(&target)
    }

    fn resolve_archive(&self, other: &JsonRef) -> Option<Uri> {
        let scheme = self.inner.uri.scheme()?;
        if !ARCHIVE_SCHEMES.contains(&scheme) {
            return None;
        }
        let locator = &self.inner.locator;
        let idx = locator.find('!')?;
        let (archive, entry) = locator.split_at(idx + 1);
        let target = Uri::parse(entry).ok()?.resolve(&other.inner.uri);
        Uri::parse(&format!("{}{}", archive, target)).ok()
    }
}

impl PartialEq for JsonRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.canonical == other.inner.canonical
    }
}

impl Eq for JsonRef {}

impl Hash for JsonRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.canonical.hash(state);
    }
}

impl fmt::Display for JsonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.display)
    }
}

impl fmt::Debug for JsonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("JsonRef").field(&self.inner.canonical).finish()
    }
}

impl FromStr for JsonRef {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}
