//! Workspace member identifier parsing.
//!
//! `cargo metadata` reports workspace members as opaque identifier strings whose
//! shape depends on the cargo release that produced them:
//!
//! - before 1.77: `name version (url)`, e.g.
//!   `function 0.1.0 (path+file:///home/user/fn-rs)`
//! - 1.77 and later, either `url#name@version`, e.g.
//!   `path+file:///home/user/fn-rs#function@0.1.0`, or `url#version` when the
//!   package name equals the final directory name, e.g.
//!   `path+file:///home/user/ws/services/example#0.4.0`

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use url::Url;

/// Scheme prefix that marks the fragment encoding.
pub const FRAGMENT_PREFIX: &str = "path+file://";

/// The two identifier encodings emitted by different cargo releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberEncoding {
    /// `name version (url)`
    Legacy,
    /// `url#name@version` or `url#version`
    Fragment,
}

impl MemberEncoding {
    /// Select the encoding of a raw identifier by its prefix.
    #[must_use]
    pub fn detect(raw: &str) -> Self {
        if raw.starts_with(FRAGMENT_PREFIX) {
            Self::Fragment
        } else {
            Self::Legacy
        }
    }

    /// Decode `raw` according to this encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] when `raw` does not have the shape this
    /// encoding requires.
    pub fn decode(self, raw: &str) -> Result<WorkspaceMember> {
        match self {
            Self::Legacy => decode_legacy(raw),
            Self::Fragment => decode_fragment(raw),
        }
    }
}

/// A decoded workspace member reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceMember {
    name: String,
    version: String,
    location: String,
}

impl WorkspaceMember {
    /// Parse a raw workspace member identifier in either encoding.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] naming the identifier when it is malformed.
    pub fn parse(raw: &str) -> Result<Self> {
        MemberEncoding::detect(raw).decode(raw)
    }

    /// Package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Source location reference, e.g. `path+file:///home/user/ws`.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// The location parsed as a URL.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if the location is not a valid URL.
    pub fn location_url(&self) -> Result<Url> {
        Url::parse(&self.location).map_err(|source| Error::InvalidUrl {
            input: self.location.clone(),
            source,
        })
    }

    fn new(raw: &str, name: &str, version: &str, location: &str) -> Result<Self> {
        let (name, version, location) = (name.trim(), version.trim(), location.trim());
        if name.is_empty() {
            return Err(Error::parse(raw, "empty package name"));
        }
        if version.is_empty() {
            return Err(Error::parse(raw, "empty package version"));
        }
        if location.is_empty() {
            return Err(Error::parse(raw, "empty location"));
        }
        Ok(Self {
            name: name.to_string(),
            version: version.to_string(),
            location: location.to_string(),
        })
    }
}

impl FromStr for WorkspaceMember {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for WorkspaceMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}@{}", self.location, self.name, self.version)
    }
}

/// Filesystem path of a member location such as `path+file:///home/u/ws`.
///
/// Returns `None` for locations that are not local paths.
#[must_use]
pub fn location_path(location: &Url) -> Option<PathBuf> {
    let file_url = location.as_str().strip_prefix("path+").unwrap_or(location.as_str());
    Url::parse(file_url).ok()?.to_file_path().ok()
}

fn decode_fragment(raw: &str) -> Result<WorkspaceMember> {
    let Some((url, fragment)) = raw.split_once('#') else {
        return Err(Error::parse(raw, "missing `#`"));
    };

    if let Some((name, version)) = fragment.split_once('@') {
        return WorkspaceMember::new(raw, name, version, url);
    }

    // `url#version`: the final path segment is the package name
    let Some((location, name)) = url.rsplit_once('/') else {
        return Err(Error::parse(raw, "missing path segment for package name"));
    };
    WorkspaceMember::new(raw, name, fragment, location)
}

fn decode_legacy(raw: &str) -> Result<WorkspaceMember> {
    // none of name, version or url may contain whitespace and still be valid
    let fields: Vec<&str> = raw.split_whitespace().collect();
    let [name, version, url] = *fields.as_slice() else {
        return Err(Error::parse(raw, "unexpected format"));
    };

    let url = url.strip_prefix('(').unwrap_or(url);
    let url = url.strip_suffix(')').unwrap_or(url);
    WorkspaceMember::new(raw, name, version, url)
}
