//! Error type shared by the resolver, the rewriter and the on-disk updater.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SubpathError>;

/// Everything that can go wrong while deriving a subpath or rewriting client assets.
#[derive(Error, Debug)]
pub enum SubpathError {
    /// The configured site URL could not be parsed as an absolute URL.
    #[error("invalid site URL {url:?}: {source}")]
    InvalidSiteUrl {
        /// Raw setting value.
        url: String,
        /// Parser failure.
        source: url::ParseError,
    },

    /// The server configuration file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        /// Config file location.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// The server configuration file is not valid JSON for the expected shape.
    #[error("failed to parse config {}: {source}", path.display())]
    ConfigParse {
        /// Config file location.
        path: PathBuf,
        /// Underlying parse failure.
        source: serde_json::Error,
    },

    /// The asset root marker is empty, so every absolute path would look like an asset.
    #[error("invalid asset root {asset_root:?}: must name at least one directory segment")]
    InvalidAssetRoot {
        /// Configured asset root.
        asset_root: String,
    },

    /// The client asset directory does not exist.
    #[error("failed to find client dir {}", path.display())]
    DirectoryNotFound {
        /// Directory that was expected to hold the client assets.
        path: PathBuf,
    },

    /// Reading an asset document failed.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// Writing an asset document failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File that could not be written.
        path: PathBuf,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// A required anchor was missing or did not have the expected shape.
    #[error("failed to find {anchor} to rewrite in {document}: {reason}")]
    AnchorNotFound {
        /// Document being rewritten.
        document: &'static str,
        /// Anchor that was looked for.
        anchor: &'static str,
        /// What exactly was wrong.
        reason: String,
    },

    /// A structured document could not be parsed.
    #[error("malformed {document}: {source}")]
    MalformedDocument {
        /// Document being rewritten.
        document: &'static str,
        /// Underlying parse failure.
        source: serde_json::Error,
    },
}
