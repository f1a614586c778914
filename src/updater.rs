//! Applies the asset rewrite to the client directory on disk.
//!
//! All three documents are read and rewritten in memory before anything is written, so a
//! failed precondition (most importantly a malformed Content-Security-Policy) leaves the
//! deployed client exactly as it was.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::{ClientLayout, RunEnvironment, ServerConfig};
use crate::error::{Result, SubpathError};
use crate::rewrite::{AssetKind, AssetRewriter};
use crate::subpath::{Subpath, subpath_from_config};

const STAGING_SUFFIX: &str = "subpath-tmp";

/// One client document with its current and rewritten content.
#[derive(Debug, Clone)]
pub struct AssetDocument {
    /// Which document this is.
    pub kind: AssetKind,
    /// Location on disk.
    pub path: PathBuf,
    /// Content as read from disk.
    pub original: String,
    /// Content after rewriting for the target subpath.
    pub rewritten: String,
}

impl AssetDocument {
    /// Whether persisting this document would change the file.
    pub fn is_changed(&self) -> bool {
        self.original != self.rewritten
    }
}

/// Outcome of a successful update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Subpath the assets now point at.
    pub subpath: Subpath,
    /// Files that were overwritten.
    pub written: Vec<PathBuf>,
    /// Files that already matched the subpath.
    pub unchanged: Vec<PathBuf>,
}

/// Rewrites the client documents inside a client directory.
#[derive(Debug)]
pub struct AssetUpdater {
    layout: ClientLayout,
    rewriter: AssetRewriter,
}

impl AssetUpdater {
    /// Create an updater for the provided client layout.
    ///
    /// Fails when the layout's asset root is empty.
    pub fn new(layout: ClientLayout) -> Result<Self> {
        let rewriter = AssetRewriter::for_layout(&layout)?;
        Ok(Self { layout, rewriter })
    }

    /// Layout this updater operates on.
    pub fn layout(&self) -> &ClientLayout {
        &self.layout
    }

    /// Read and rewrite every document without touching the filesystem.
    pub fn plan(&self, subpath: &Subpath) -> Result<Vec<AssetDocument>> {
        let client_dir = &self.layout.client_dir;
        if !client_dir.is_dir() {
            return Err(SubpathError::DirectoryNotFound {
                path: client_dir.clone(),
            });
        }

        let sources = AssetKind::ALL
            .into_iter()
            .map(|kind| -> Result<(AssetKind, PathBuf, String)> {
                let path = self.layout.path(kind);
                let original = fs::read_to_string(&path).map_err(|source| SubpathError::Read {
                    path: path.clone(),
                    source,
                })?;
                Ok((kind, path, original))
            })
            .collect::<Result<Vec<_>>>()?;

        sources
            .into_iter()
            .map(|(kind, path, original)| -> Result<AssetDocument> {
                let rewritten = self.rewriter.rewrite(kind, &original, subpath)?;
                Ok(AssetDocument {
                    kind,
                    path,
                    original,
                    rewritten,
                })
            })
            .collect()
    }

    /// Point every client asset reference at `subpath`.
    ///
    /// Either all changed documents are replaced or none are.
    pub fn update(&self, subpath: &Subpath) -> Result<UpdateSummary> {
        info!(
            "Rewriting client assets in {} for subpath {}",
            self.layout.client_dir.display(),
            subpath
        );

        let documents = self.plan(subpath)?;
        persist(&documents)?;

        let mut summary = UpdateSummary {
            subpath: subpath.clone(),
            written: Vec::new(),
            unchanged: Vec::new(),
        };
        for document in documents {
            if document.is_changed() {
                debug!("Rewrote {} ({})", document.path.display(), document.kind.label());
                summary.written.push(document.path);
            } else {
                debug!("{} already matches subpath {}", document.path.display(), subpath);
                summary.unchanged.push(document.path);
            }
        }

        Ok(summary)
    }
}

/// Stage every changed document next to its target, then move the staged files into place.
///
/// If a rename fails, documents that were already moved get their original content back.
fn persist(documents: &[AssetDocument]) -> Result<()> {
    let mut staged: Vec<(PathBuf, &AssetDocument)> = Vec::new();

    for document in documents.iter().filter(|document| document.is_changed()) {
        let staging = staging_path(&document.path);
        if let Err(source) = stage(&document.path, &staging, &document.rewritten) {
            if staging.is_file() {
                remove_staging(&staging);
            }
            discard(&staged);
            return Err(SubpathError::Write {
                path: document.path.clone(),
                source,
            });
        }
        staged.push((staging, document));
    }

    for (index, (staging, document)) in staged.iter().enumerate() {
        if let Err(source) = fs::rename(staging, &document.path) {
            restore(&staged[..index]);
            discard(&staged[index..]);
            return Err(SubpathError::Write {
                path: document.path.clone(),
                source,
            });
        }
    }

    Ok(())
}

fn stage(target: &Path, staging: &Path, content: &str) -> io::Result<()> {
    fs::write(staging, content)?;
    let permissions = fs::metadata(target)?.permissions();
    fs::set_permissions(staging, permissions)
}

fn restore(moved: &[(PathBuf, &AssetDocument)]) {
    for (_, document) in moved {
        if let Err(err) = fs::write(&document.path, &document.original) {
            warn!("failed to restore {}: {}", document.path.display(), err);
        }
    }
}

fn discard(staged: &[(PathBuf, &AssetDocument)]) {
    for (staging, _) in staged {
        remove_staging(staging);
    }
}

fn remove_staging(staging: &Path) {
    match fs::remove_file(staging) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!("failed to remove staging file {}: {}", staging.display(), err),
    }
}

fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{STAGING_SUFFIX}"))
}

/// Rewrite the client assets for the subpath configured in `SiteURL`.
///
/// Development builds and CI runs do not ship the built client, so they return `Ok(None)`
/// without looking at the configuration or the client directory.
pub fn update_from_config(
    config: &ServerConfig,
    layout: &ClientLayout,
    environment: &RunEnvironment,
) -> Result<Option<UpdateSummary>> {
    if environment.skips_asset_rewrite() {
        debug!("Skipping client asset rewrite for {environment:?}");
        return Ok(None);
    }

    let subpath = subpath_from_config(config)?;
    AssetUpdater::new(layout.clone())?.update(&subpath).map(Some)
}
