//! Rewriting of the HTML shell: asset attributes, the Content-Security-Policy meta tag and
//! the inline script announcing the public asset path to the client bundle.

use std::ops::Range;
use std::sync::OnceLock;

use base64::{Engine as _, engine::general_purpose};
use regex::Regex;
use sha2::{Digest, Sha256};

use super::{asset_path_pattern, replace_prefixes};
use crate::error::{Result, SubpathError};
use crate::subpath::Subpath;

const DOCUMENT: &str = "root markup";
const CSP_ANCHOR: &str = "'Content-Security-Policy' meta tag";
const STYLE_CLOSE: &str = "</style>";
const SCRIPT_SRC: &str = "script-src";
const UNSAFE_EVAL: &str = "'unsafe-eval'";
const REQUIRED_SCRIPT_SOURCES: [&str; 2] = ["'self'", UNSAFE_EVAL];

fn csp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?i)<meta\s+http-equiv="content-security-policy"\s+content="(?P<policy>[^"]*)"\s*/?>"#,
        )
        .expect("invalid CSP meta regex")
    })
}

fn public_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"</style><script>window\.publicPath='(?P<path>[^']*)'</script>")
            .expect("invalid public path script regex")
    })
}

#[derive(Debug)]
pub(super) struct MarkupRewriter {
    attribute_paths: Regex,
    policy_paths: Regex,
}

impl MarkupRewriter {
    pub(super) fn new(marker: &str) -> Self {
        Self {
            attribute_paths: asset_path_pattern(r#"\b(?:href|src)=""#, r#""\s?#"#, marker),
            policy_paths: asset_path_pattern(r"^|[\s;]", r#"\s;"'"#, marker),
        }
    }

    pub(super) fn rewrite(
        &self,
        content: &str,
        subpath: &Subpath,
        asset_root: &str,
    ) -> Result<String> {
        let (mut text, stale_hashes) = strip_public_path_script(content);

        let script = (!subpath.is_root()).then(|| public_path_script(asset_root));
        if script.is_some() && !text.contains(STYLE_CLOSE) {
            return Err(SubpathError::AnchorNotFound {
                document: DOCUMENT,
                anchor: "closing </style> tag",
                reason: "nowhere to inject the public path script".into(),
            });
        }

        let policy_range = locate_policy(&text)?;
        let fresh_hash = script.as_deref().map(script_hash);
        let policy = self.rewrite_policy(
            &text[policy_range.clone()],
            &stale_hashes,
            fresh_hash.as_deref(),
            asset_root,
        )?;
        text.replace_range(policy_range, &policy);

        let mut text = replace_prefixes(&self.attribute_paths, &text, asset_root);

        if let Some(script) = script {
            text = text.replacen(
                STYLE_CLOSE,
                &format!("{STYLE_CLOSE}<script>{script}</script>"),
                1,
            );
        }

        Ok(text)
    }

    fn rewrite_policy(
        &self,
        policy: &str,
        stale_hashes: &[String],
        fresh_hash: Option<&str>,
        asset_root: &str,
    ) -> Result<String> {
        let mut seen_script_src = false;
        let mut directives = Vec::new();

        for directive in policy.split(';') {
            let is_script_src = directive.split_whitespace().next() == Some(SCRIPT_SRC);
            if is_script_src && !seen_script_src {
                seen_script_src = true;
                directives.push(rewrite_script_src(directive, stale_hashes, fresh_hash)?);
            } else {
                directives.push(directive.to_string());
            }
        }

        if !seen_script_src {
            return Err(malformed_policy(format!("missing {SCRIPT_SRC} directive")));
        }

        let policy = directives.join(";");
        if !self.policy_paths.is_match(&policy) {
            return Err(malformed_policy(format!(
                "no source refers to the asset root (expected e.g. {asset_root})"
            )));
        }

        Ok(replace_prefixes(&self.policy_paths, &policy, asset_root))
    }
}

fn locate_policy(text: &str) -> Result<Range<usize>> {
    let mut tags = csp_pattern().captures_iter(text);
    let Some(tag) = tags.next() else {
        return Err(malformed_policy("no meta tag present".into()));
    };
    if tags.next().is_some() {
        return Err(malformed_policy("more than one meta tag present".into()));
    }

    tag
        .name("policy")
        .map(|policy| policy.range())
        .ok_or_else(|| malformed_policy("meta tag has no content".into()))
}

fn rewrite_script_src(
    directive: &str,
    stale_hashes: &[String],
    fresh_hash: Option<&str>,
) -> Result<String> {
    let tokens: Vec<&str> = directive.split_whitespace().collect();
    for required in REQUIRED_SCRIPT_SOURCES {
        if !tokens.contains(&required) {
            return Err(malformed_policy(format!("{SCRIPT_SRC} is missing {required}")));
        }
    }

    let mut directive = directive.to_string();
    for hash in stale_hashes {
        let token = format!(" {hash}");
        if let Some(start) = directive.find(&token) {
            directive.replace_range(start..start + token.len(), "");
        }
    }

    if let Some(hash) = fresh_hash {
        directive = directive.replacen(UNSAFE_EVAL, &format!("{UNSAFE_EVAL} {hash}"), 1);
    }

    Ok(directive)
}

fn malformed_policy(reason: String) -> SubpathError {
    SubpathError::AnchorNotFound {
        document: DOCUMENT,
        anchor: CSP_ANCHOR,
        reason,
    }
}

/// Remove previously injected public path scripts, returning the CSP hashes they needed.
fn strip_public_path_script(content: &str) -> (String, Vec<String>) {
    let pattern = public_path_pattern();
    let stale_hashes = pattern
        .captures_iter(content)
        .map(|caps| script_hash(&public_path_script(&caps["path"])))
        .collect();
    let stripped = pattern.replace_all(content, STYLE_CLOSE).into_owned();
    (stripped, stale_hashes)
}

fn public_path_script(asset_root: &str) -> String {
    format!("window.publicPath='{asset_root}'")
}

/// CSP source expression allowing an inline script body.
fn script_hash(script: &str) -> String {
    let digest = Sha256::digest(script.as_bytes());
    format!("'sha256-{}'", general_purpose::STANDARD.encode(digest))
}
