//! Web app manifest rewriting.
//!
//! The manifest is validated as JSON first; the rewrite itself then walks the string
//! literals of the source text so key order, whitespace and escapes stay byte-identical.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::{asset_path_pattern, replace_prefixes};
use crate::error::{Result, SubpathError};

fn string_literal_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#""(?P<literal>(?:[^"\\]|\\.)*)"(?P<key>\s*:)?"#)
            .expect("invalid JSON string regex")
    })
}

#[derive(Debug)]
pub(super) struct ManifestRewriter {
    value_path: Regex,
}

impl ManifestRewriter {
    pub(super) fn new(marker: &str) -> Self {
        Self {
            value_path: asset_path_pattern("^", r#""\\"#, marker),
        }
    }

    pub(super) fn rewrite(&self, content: &str, asset_root: &str) -> Result<String> {
        serde_json::from_str::<Value>(content).map_err(|source| SubpathError::MalformedDocument {
            document: "manifest",
            source,
        })?;

        let rewritten = string_literal_pattern().replace_all(content, |caps: &Captures| {
            if caps.name("key").is_some() {
                return caps[0].to_string();
            }
            format!(
                "\"{}\"",
                replace_prefixes(&self.value_path, &caps["literal"], asset_root)
            )
        });

        Ok(rewritten.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"{
    "icons": [
        {"src": "/static/icon_96x96.png", "sizes": "96x96", "type": "image/png"},
        {"src": "/static/icon_192x192.png", "sizes": "192x192", "type": "image/png"}
    ],
    "name": "Team Chat",
    "start_url": "/static/launch.html",
    "scope": "/",
    "description": "see https://example.com/static/ for docs",
    "/static/": "keys are left alone"
}
"#;

    fn rewrite(content: &str, asset_root: &str) -> Result<String> {
        ManifestRewriter::new("static/").rewrite(content, asset_root)
    }

    #[test]
    fn prefixes_path_values_only() {
        let output = rewrite(BASE, "/subpath/static/").unwrap();
        assert!(output.contains(r#""src": "/subpath/static/icon_96x96.png""#));
        assert!(output.contains(r#""src": "/subpath/static/icon_192x192.png""#));
        assert!(output.contains(r#""start_url": "/subpath/static/launch.html""#));
        assert!(output.contains(r#""scope": "/""#));
        assert!(output.contains("see https://example.com/static/ for docs"));
        assert!(output.contains(r#""/static/": "keys are left alone""#));
    }

    #[test]
    fn keeps_formatting_and_round_trips() {
        let moved = rewrite(BASE, "/nested/subpath/static/").unwrap();
        assert_eq!(rewrite(&moved, "/static/").unwrap(), BASE);
        assert_eq!(rewrite(BASE, "/static/").unwrap(), BASE);
    }

    #[test]
    fn escaped_quotes_do_not_confuse_the_scanner() {
        let input = r#"{"name": "say \"hi\" /static/", "src": "/static/a.png"}"#;
        let output = rewrite(input, "/team/static/").unwrap();
        assert_eq!(
            output,
            r#"{"name": "say \"hi\" /static/", "src": "/team/static/a.png"}"#
        );
    }

    #[test]
    fn manifest_without_paths_is_a_no_op() {
        let input = r#"{"name": "Team Chat", "display": "standalone"}"#;
        assert_eq!(rewrite(input, "/team/static/").unwrap(), input);
    }

    #[test]
    fn rejects_malformed_manifest() {
        let err = rewrite(r#"{"icons": [}"#, "/team/static/").unwrap_err();
        assert!(matches!(err, SubpathError::MalformedDocument { .. }));
    }
}
