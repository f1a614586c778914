//! Pure, anchor-based rewriting of the client asset documents.
//!
//! Each document carries absolute references to the bundled asset root (`/static/` when
//! served from the site root). Instead of remembering which subpath was applied last, the
//! rewriter finds every path that ends in the asset root marker right after a known anchor
//! and swaps the variable prefix in front of it. That makes every rewrite idempotent, and
//! rewriting `A -> B` yields the same bytes as `A -> / -> B`.

mod manifest;
mod markup;
mod styles;

use regex::{Captures, Regex};

use crate::config::ClientLayout;
use crate::error::{Result, SubpathError};
use crate::subpath::Subpath;

use manifest::ManifestRewriter;
use markup::MarkupRewriter;
use styles::StyleRewriter;

/// The three client documents that reference the asset root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    /// HTML shell served for every client route.
    RootMarkup,
    /// Main stylesheet.
    StyleSheet,
    /// Web app manifest.
    ManifestDescriptor,
}

impl AssetKind {
    /// Every document kind in the order they are processed.
    pub const ALL: [AssetKind; 3] = [
        AssetKind::RootMarkup,
        AssetKind::StyleSheet,
        AssetKind::ManifestDescriptor,
    ];

    /// Human readable name used in errors and logs.
    pub fn label(self) -> &'static str {
        match self {
            AssetKind::RootMarkup => "root markup",
            AssetKind::StyleSheet => "stylesheet",
            AssetKind::ManifestDescriptor => "manifest",
        }
    }
}

/// Rewrites asset documents for a fixed asset root marker.
#[derive(Debug)]
pub struct AssetRewriter {
    marker: String,
    markup: MarkupRewriter,
    styles: StyleRewriter,
    manifest: ManifestRewriter,
}

impl AssetRewriter {
    /// Compile the anchors for an asset root such as `static` or `static/`.
    ///
    /// An empty root is rejected: the prefix pattern would then match every absolute path.
    pub fn new(asset_root: &str) -> Result<Self> {
        let trimmed = asset_root.trim_matches('/');
        if trimmed.is_empty() {
            return Err(SubpathError::InvalidAssetRoot {
                asset_root: asset_root.to_string(),
            });
        }

        let marker = format!("{trimmed}/");
        Ok(Self {
            markup: MarkupRewriter::new(&marker),
            styles: StyleRewriter::new(&marker),
            manifest: ManifestRewriter::new(&marker),
            marker,
        })
    }

    /// Rewriter for the asset root configured in a client layout.
    pub fn for_layout(layout: &ClientLayout) -> Result<Self> {
        Self::new(&layout.asset_root)
    }

    /// The asset root marker this rewriter was built for.
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Rewrite a whole document so every asset reference sits below `subpath`.
    ///
    /// The result only depends on the document with its asset prefixes removed and on the
    /// target subpath, never on which subpath the document was rewritten to before.
    pub fn rewrite(&self, kind: AssetKind, content: &str, subpath: &Subpath) -> Result<String> {
        let asset_root = subpath.asset_root(&self.marker);
        match kind {
            AssetKind::RootMarkup => self.markup.rewrite(content, subpath, &asset_root),
            AssetKind::StyleSheet => Ok(self.styles.rewrite(content, &asset_root)),
            AssetKind::ManifestDescriptor => self.manifest.rewrite(content, &asset_root),
        }
    }
}

/// Build a pattern matching `lead` followed by an absolute asset path prefix and the marker.
///
/// The prefix is `/` plus any number of whole segments; segments never contain `/` or any
/// of the `excluded` characters. Repetition is greedy, so the last marker segment in a run
/// wins and a subpath that itself contains the marker name still round-trips.
fn asset_path_pattern(lead: &str, excluded: &str, marker: &str) -> Regex {
    Regex::new(&format!(
        r"(?P<lead>{lead})(?P<prefix>/(?:[^/{excluded}]+/)*){}",
        regex::escape(marker)
    ))
    .expect("invalid asset path regex")
}

/// Replace every matched prefix and marker with the new asset root.
fn replace_prefixes(pattern: &Regex, text: &str, asset_root: &str) -> String {
    pattern
        .replace_all(text, |caps: &Captures| format!("{}{}", &caps["lead"], asset_root))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greedy_prefix_survives_marker_named_subpath() {
        let pattern = asset_path_pattern(r#"src=""#, r#""\s"#, "static/");
        let once = replace_prefixes(&pattern, r#"src="/static/main.js""#, "/static/static/");
        assert_eq!(once, r#"src="/static/static/main.js""#);
        let twice = replace_prefixes(&pattern, &once, "/static/static/");
        assert_eq!(twice, once);
        let reset = replace_prefixes(&pattern, &twice, "/static/");
        assert_eq!(reset, r#"src="/static/main.js""#);
    }

    #[test]
    fn ignores_relative_and_protocol_relative_paths() {
        let pattern = asset_path_pattern(r#"src=""#, r#""\s"#, "static/");
        let input = r#"src="static/a.js" src="//cdn.example.com/static/b.js" src="/img/c.png""#;
        assert_eq!(replace_prefixes(&pattern, input, "/team/static/"), input);
    }

    #[test]
    fn rejects_empty_asset_root() {
        for root in ["", "/", "//"] {
            assert!(matches!(
                AssetRewriter::new(root),
                Err(SubpathError::InvalidAssetRoot { .. })
            ));
        }
        assert_eq!(AssetRewriter::new("/static").unwrap().marker(), "static/");
        assert_eq!(AssetRewriter::new("static/").unwrap().marker(), "static/");
    }

    #[test]
    fn labels_each_kind() {
        let labels: Vec<&str> = AssetKind::ALL.iter().map(|kind| kind.label()).collect();
        assert_eq!(labels, vec!["root markup", "stylesheet", "manifest"]);
    }
}
