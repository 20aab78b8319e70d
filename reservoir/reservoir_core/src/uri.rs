//! URIs and pool keys.
//!
//! A [`Uri`] keeps the text it was parsed from verbatim, which is what the pool uses
//! as the default grouping key. Only the scheme is required: it is read with the
//! RFC 3986 scheme grammar, so a URI whose authority or path the `url` crate rejects
//! still dispatches on its scheme. Component access uses the `url` parse when one
//! succeeded and a plain split of the raw text otherwise.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;
use url::Url;

use crate::error::PoolError;

/// A parsed resource identifier.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    /// The text exactly as supplied by the caller
    raw: String,

    /// The scheme, lowercased
    scheme: String,

    /// Full parse, when the `url` crate accepts the text
    parsed: Option<Url>,
}

/// Extract the scheme: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )` before the first `:`.
fn extract_scheme(text: &str) -> Result<&str, &'static str> {
    let end = text.find(':').ok_or("missing `:` after scheme")?;
    let scheme = &text[..end];

    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        Some(_) => return Err("scheme must start with a letter"),
        None => return Err("empty scheme"),
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return Err("invalid character in scheme");
    }

    Ok(scheme)
}

impl Uri {
    /// Parse a URI, rejecting text from which no scheme can be extracted.
    pub fn parse(text: &str) -> Result<Self, PoolError> {
        let scheme = extract_scheme(text).map_err(|reason| PoolError::MalformedUri {
            uri: text.to_string(),
            reason: reason.to_string(),
        })?;

        Ok(Self {
            raw: text.to_string(),
            scheme: scheme.to_ascii_lowercase(),
            parsed: Url::parse(text).ok(),
        })
    }

    /// The original text.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The scheme, lowercased.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything after `scheme:`.
    fn rest(&self) -> &str {
        &self.raw[self.scheme.len() + 1..]
    }

    /// Raw authority and the remainder following it.
    fn split_authority(&self) -> (Option<&str>, &str) {
        match self.rest().strip_prefix("//") {
            Some(rest) => {
                let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
                (Some(&rest[..end]), &rest[end..])
            }
            None => (None, self.rest()),
        }
    }

    /// Host and port, if the URI has an authority component.
    ///
    /// Returns an empty string for URIs such as `file:///tmp/a` or `mailto:x@y`.
    pub fn authority(&self) -> String {
        if let Some(url) = &self.parsed {
            return match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{}:{}", host, port),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
        }

        let authority = self.split_authority().0.unwrap_or("");
        // Drop userinfo, like the parsed form does
        match authority.rfind('@') {
            Some(at) => authority[at + 1..].to_string(),
            None => authority.to_string(),
        }
    }

    /// The path component.
    pub fn path(&self) -> &str {
        if let Some(url) = &self.parsed {
            return url.path();
        }

        let tail = self.split_authority().1;
        let end = tail.find(['?', '#']).unwrap_or(tail.len());
        &tail[..end]
    }

    /// The query component, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        if let Some(url) = &self.parsed {
            return url.query();
        }

        let tail = self.split_authority().1;
        let tail = tail.split('#').next().unwrap_or("");
        tail.find('?').map(|start| &tail[start + 1..])
    }

    /// Iterate over decoded query pairs.
    pub fn query_pairs(&self) -> form_urlencoded::Parse<'_> {
        form_urlencoded::parse(self.query().unwrap_or("").as_bytes())
    }
}

impl FromStr for Uri {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = PoolError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl AsRef<str> for Uri {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uri({:?})", self.raw)
    }
}

/// Grouping token selecting an idle queue.
///
/// Keys are opaque: two URIs share a queue exactly when their factory derives equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey(String);

impl PoolKey {
    /// Create a key from any string-like token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The key token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Uri> for PoolKey {
    fn from(uri: &Uri) -> Self {
        Self(uri.as_str().to_string())
    }
}

impl From<&str> for PoolKey {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for PoolKey {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl Borrow<str> for PoolKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
