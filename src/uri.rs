//! Syntactic URI references (RFC 3986): parsing, normalization and
//! reference resolution.
//!
//! Unlike `url::Url`, a [`Uri`] may be relative (`../x.json#/a`, `#`, `""`),
//! which is what schema references mostly are. Anything with a hierarchical
//! scheme is normalized and resolved by `url::Url`; only references with no
//! scheme at all are merged here.

use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;
use url::Url;

/// Characters escaped when a decoded fragment is written back after `#`.
const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Reasons a string is not a URI reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("illegal character {ch:?} at index {index}")]
    IllegalCharacter { ch: char, index: usize },

    #[error("malformed percent escape at index {index}")]
    MalformedEscape { index: usize },

    #[error("malformed scheme name \"{scheme}\"")]
    MalformedScheme { scheme: String },
}

/// A parsed URI reference.
///
/// Components are kept in their raw (still percent-encoded) form. A `None`
/// fragment means no `#` was present; `Some("")` is an explicit empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Uri {
    scheme: Option<String>,
    authority: Option<String>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Uri {
    /// Parse a URI reference.
    ///
    /// # Errors
    ///
    /// Returns `UriError` for characters outside the URI grammar, broken
    /// `%` escapes and invalid scheme names.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        check_characters(input)?;

        let (rest, fragment) = match input.find('#') {
            Some(idx) => (&input[..idx], Some(input[idx + 1..].to_string())),
            None => (input, None),
        };
        if let Some((idx, ch)) = fragment
            .as_deref()
            .and_then(|f| f.char_indices().find(|(_, c)| *c == '#'))
        {
            return Err(UriError::IllegalCharacter {
                ch,
                index: rest.len() + 1 + idx,
            });
        }

        let (scheme, rest) = split_scheme(rest)?;

        let (rest, query) = match rest.find('?') {
            Some(idx) => (&rest[..idx], Some(rest[idx + 1..].to_string())),
            None => (rest, None),
        };

        let (authority, path) = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                (Some(after[..end].to_string()), &after[end..])
            }
            None => (None, rest),
        };

        if authority.is_none() {
            if let Some(idx) = path.find(|c: char| c == '[' || c == ']') {
                let ch = path[idx..].chars().next().unwrap_or('[');
                return Err(UriError::IllegalCharacter { ch, index: idx });
            }
        }

        Ok(Self {
            scheme,
            authority,
            path: path.to_string(),
            query,
            fragment,
        })
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw fragment, if a `#` was present.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// True if the reference carries a scheme.
    pub fn has_scheme(&self) -> bool {
        self.scheme.is_some()
    }

    /// An opaque URI has a scheme and a scheme-specific part that does not
    /// start with `/` (`mailto:x`, `jar:file:/a.jar!/b`). Its path is not
    /// hierarchical, so it is neither normalized nor usable as a base.
    pub fn is_opaque(&self) -> bool {
        self.scheme.is_some() && self.authority.is_none() && !self.path.starts_with('/')
    }

    /// Returns a copy with the fragment replaced.
    pub fn with_fragment(&self, fragment: Option<&str>) -> Self {
        Self {
            fragment: fragment.map(str::to_string),
            ..self.clone()
        }
    }

    /// Canonical form: absolute URIs as `url::Url` serializes them, relative
    /// ones with `.` and `..` segments removed.
    ///
    /// Leading `..` segments of a relative path are kept, since there is
    /// nothing to climb out of yet. Opaque URIs are left alone.
    pub fn normalize(&self) -> Self {
        if self.is_opaque() {
            return self.clone();
        }
        if self.scheme.is_some() {
            if let Some(uri) = self.to_url().and_then(|url| Uri::from_url(&url)) {
                return uri;
            }
        }
        Self {
            path: remove_dot_segments(&self.path),
            ..self.clone()
        }
    }

    /// Resolve `reference` against `self` (RFC 3986 section 5.2.2).
    ///
    /// An opaque base, or one `url::Url` rejects, cannot anchor anything, so
    /// the reference comes back unchanged.
    pub fn resolve(&self, reference: &Uri) -> Uri {
        if reference.scheme.is_some() || self.is_opaque() {
            return reference.normalize();
        }
        if self.scheme.is_some() {
            return self
                .to_url()
                .and_then(|base| base.join(&reference.to_string()).ok())
                .and_then(|url| Uri::from_url(&url))
                .unwrap_or_else(|| reference.normalize());
        }
        self.merge_relative(reference)
    }

    fn to_url(&self) -> Option<Url> {
        Url::parse(&self.to_string()).ok()
    }

    fn from_url(url: &Url) -> Option<Uri> {
        Uri::parse(url.as_str()).ok()
    }

    /// Resolution against a base with no scheme, which `url::Url` cannot
    /// represent.
    fn merge_relative(&self, reference: &Uri) -> Uri {
        let mut target = Uri {
            scheme: self.scheme.clone(),
            fragment: reference.fragment.clone(),
            ..Uri::default()
        };

        if reference.authority.is_some() {
            target.authority = reference.authority.clone();
            target.path = remove_dot_segments(&reference.path);
            target.query = reference.query.clone();
            return target;
        }

        target.authority = self.authority.clone();
        if reference.path.is_empty() {
            target.path = self.path.clone();
            target.query = reference.query.clone().or_else(|| self.query.clone());
        } else {
            target.path = if reference.path.starts_with('/') {
                remove_dot_segments(&reference.path)
            } else {
                remove_dot_segments(&self.merge(&reference.path))
            };
            target.query = reference.query.clone();
        }
        target
    }

    fn merge(&self, relative: &str) -> String {
        if self.authority.is_some() && self.path.is_empty() {
            return format!("/{}", relative);
        }
        match self.path.rfind('/') {
            Some(idx) => format!("{}{}", &self.path[..=idx], relative),
            None => relative.to_string(),
        }
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}:", scheme)?;
        }
        if let Some(authority) = &self.authority {
            write!(f, "//{}", authority)?;
        }
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

fn check_characters(input: &str) -> Result<(), UriError> {
    let bytes = input.as_bytes();
    for (index, ch) in input.char_indices() {
        if ch.is_control() || ch.is_whitespace() || "\"<>\\^`{|}".contains(ch) {
            return Err(UriError::IllegalCharacter { ch, index });
        }
        if ch == '%' {
            let valid = bytes.len() > index + 2
                && bytes[index + 1].is_ascii_hexdigit()
                && bytes[index + 2].is_ascii_hexdigit();
            if !valid {
                return Err(UriError::MalformedEscape { index });
            }
        }
    }
    Ok(())
}

fn split_scheme(input: &str) -> Result<(Option<String>, &str), UriError> {
    let Some(colon) = input.find(':') else {
        return Ok((None, input));
    };
    // A colon after the first '/' or '?' belongs to the path or query.
    if input[..colon].contains(|c: char| c == '/' || c == '?') {
        return Ok((None, input));
    }

    let scheme = &input[..colon];
    let mut chars = scheme.chars();
    let valid = chars.next().map(|c| c.is_ascii_alphabetic()).unwrap_or(false)
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !valid {
        return Err(UriError::MalformedScheme {
            scheme: scheme.to_string(),
        });
    }
    Ok((Some(scheme.to_ascii_lowercase()), &input[colon + 1..]))
}

fn remove_dot_segments(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    let absolute = path.starts_with('/');
    let body = if absolute { &path[1..] } else { path };

    let segments: Vec<&str> = body.split('/').collect();
    let last = segments.len() - 1;
    let mut out: Vec<&str> = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        match *segment {
            "." => {
                if i == last {
                    out.push("");
                }
            }
            ".." => {
                match out.last() {
                    Some(&top) if top != ".." => {
                        out.pop();
                    }
                    _ if !absolute => out.push(".."),
                    _ => {}
                }
                if i == last {
                    out.push("");
                }
            }
            other => out.push(other),
        }
    }

    let joined = out.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Encode a decoded fragment so it can be embedded after `#` again.
///
/// Only characters that the fragment grammar forbids are escaped.
pub fn percent_encode_fragment(input: &str) -> String {
    utf8_percent_encode(input, FRAGMENT).to_string()
}

/// Decode `%XX` escapes. Invalid UTF-8 is replaced, not rejected.
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}
