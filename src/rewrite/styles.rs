//! Stylesheet rewriting for `url(...)` references into the asset root.

use regex::Regex;

use super::{asset_path_pattern, replace_prefixes};

#[derive(Debug)]
pub(super) struct StyleRewriter {
    url_paths: Regex,
}

impl StyleRewriter {
    pub(super) fn new(marker: &str) -> Self {
        Self {
            url_paths: asset_path_pattern(r#"url\(\s*["']?"#, r#"\s"'()"#, marker),
        }
    }

    /// A stylesheet without matching references comes back unchanged.
    pub(super) fn rewrite(&self, content: &str, asset_root: &str) -> String {
        replace_prefixes(&self.url_paths, content, asset_root)
    }
}
