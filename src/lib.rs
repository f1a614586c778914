#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod rewrite;
pub mod subpath;
pub mod updater;

pub use config::{BuildMode, ClientLayout, RunEnvironment, ServerConfig, ServiceSettings};
pub use error::{Result, SubpathError};
pub use rewrite::{AssetKind, AssetRewriter};
pub use subpath::{Subpath, resolve_subpath, subpath_from_config};
pub use updater::{AssetUpdater, UpdateSummary, update_from_config};
