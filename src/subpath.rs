//! Deployment subpath handling: the normalised URL path prefix the client is served under.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::config::ServerConfig;
use crate::error::{Result, SubpathError};

/// URL path prefix under which the web client is served.
///
/// Always starts and ends with `/`; the root subpath is exactly `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subpath(String);

impl Subpath {
    /// The canonical "no subpath" value.
    pub fn root() -> Self {
        Self("/".into())
    }

    /// Normalise any path-like value: empty segments are dropped and the result is wrapped
    /// in exactly one leading and one trailing slash.
    ///
    /// Characters that would end a quoted attribute, a JS string literal, a CSS `url(...)`
    /// or a CSP source are percent-encoded, so the subpath can be embedded in every asset
    /// document and found again on the next rewrite.
    pub fn new(raw: &str) -> Self {
        let segments: Vec<String> = raw
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(encode_segment)
            .collect();

        if segments.is_empty() {
            Self::root()
        } else {
            Self(format!("/{}/", segments.join("/")))
        }
    }

    /// Whether this is the root subpath.
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Borrow the normalised value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Public path of the asset root below this subpath, e.g. `/team/static/`.
    pub fn asset_root(&self, marker: &str) -> String {
        format!("{}{}", self.0, marker)
    }
}

fn encode_segment(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for c in segment.chars() {
        if c.is_whitespace()
            || c.is_control()
            || matches!(
                c,
                '\'' | '"' | '<' | '>' | '\\' | '`' | ';' | '?' | '#' | '(' | ')' | '{' | '}'
            )
        {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).as_bytes() {
                encoded.push_str(&format!("%{byte:02X}"));
            }
        } else {
            encoded.push(c);
        }
    }
    encoded
}

impl Default for Subpath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Subpath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Subpath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Subpath {
    type Err = Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(value))
    }
}

/// Derive the subpath from a site URL setting.
///
/// An absent or blank setting means the root subpath. Only the path component of the URL
/// matters; scheme, host, port, query and fragment are ignored.
pub fn resolve_subpath(site_url: Option<&str>) -> Result<Subpath> {
    let Some(raw) = site_url.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(Subpath::root());
    };

    let url = Url::parse(raw).map_err(|source| SubpathError::InvalidSiteUrl {
        url: raw.to_string(),
        source,
    })?;

    Ok(Subpath::new(url.path()))
}

/// Derive the subpath from the `SiteURL` entry of a server configuration.
pub fn subpath_from_config(config: &ServerConfig) -> Result<Subpath> {
    resolve_subpath(config.site_url())
}
