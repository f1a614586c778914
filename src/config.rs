//! Configuration inputs: the server config carrying the site URL, the client directory
//! layout, and the run environment that decides whether rewriting happens at all.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SubpathError};
use crate::rewrite::AssetKind;

const DEFAULT_CLIENT_DIR: &str = "client";
const CI_ENV_VAR: &str = "IS_CI";
const DEV_BUILD_NUMBER: &str = "dev";

/// Subset of the server configuration this crate cares about.
///
/// Unknown sections and fields are ignored so the full server config file can be passed
/// in unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Service level settings.
    #[serde(rename = "ServiceSettings")]
    pub service_settings: ServiceSettings,
}

/// Service settings section of the server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Public base URL of the site, e.g. `https://chat.example.com/team`.
    #[serde(rename = "SiteURL")]
    pub site_url: Option<String>,
}

impl ServerConfig {
    /// Build a config carrying only a site URL.
    pub fn with_site_url(site_url: impl Into<String>) -> Self {
        Self {
            service_settings: ServiceSettings {
                site_url: Some(site_url.into()),
            },
        }
    }

    /// Read configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SubpathError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| SubpathError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Configured site URL, treating an all-whitespace value as absent.
    pub fn site_url(&self) -> Option<&str> {
        self
            .service_settings
            .site_url
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }
}

/// Where the client bundle lives and which files inside it get rewritten.
#[derive(Debug, Clone)]
pub struct ClientLayout {
    /// Directory holding the built client assets.
    pub client_dir: PathBuf,
    /// Markup shell served for every client route.
    pub root_html_file: String,
    /// Main stylesheet.
    pub stylesheet_file: String,
    /// Web app manifest.
    pub manifest_file: String,
    /// Directory segment that every bundled asset path is served under.
    pub asset_root: String,
}

impl Default for ClientLayout {
    fn default() -> Self {
        Self {
            client_dir: DEFAULT_CLIENT_DIR.into(),
            root_html_file: "root.html".into(),
            stylesheet_file: "main.css".into(),
            manifest_file: "manifest.json".into(),
            asset_root: "static".into(),
        }
    }
}

impl ClientLayout {
    /// Default layout rooted at a specific client directory.
    pub fn new(client_dir: impl Into<PathBuf>) -> Self {
        Self {
            client_dir: client_dir.into(),
            ..Self::default()
        }
    }

    /// File name used for a given asset document.
    pub fn file_name(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::RootMarkup => &self.root_html_file,
            AssetKind::StyleSheet => &self.stylesheet_file,
            AssetKind::ManifestDescriptor => &self.manifest_file,
        }
    }

    /// Full path of a given asset document.
    pub fn path(&self, kind: AssetKind) -> PathBuf {
        self.client_dir.join(self.file_name(kind))
    }
}

/// Kind of build the running binary came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// Local development build; the client is served by a dev server instead.
    Development,
    /// Packaged build shipping the compiled client bundle.
    #[default]
    Release,
}

impl BuildMode {
    /// Interpret a build number, where `dev` marks a development build.
    pub fn from_build_number(build_number: &str) -> Self {
        if build_number.trim().eq_ignore_ascii_case(DEV_BUILD_NUMBER) {
            Self::Development
        } else {
            Self::Release
        }
    }
}

/// Process level signals consulted before rewriting assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunEnvironment {
    /// Build the binary came from.
    pub build: BuildMode,
    /// Whether the process runs under continuous integration.
    pub is_ci: bool,
}

impl RunEnvironment {
    /// Capture the CI flag from the `IS_CI` environment variable.
    pub fn from_env(build: BuildMode) -> Self {
        let is_ci = env::var(CI_ENV_VAR)
            .map(|value| parse_boolish(&value))
            .unwrap_or(false);
        Self { build, is_ci }
    }

    /// Development builds and CI runs do not ship the built client bundle.
    pub fn skips_asset_rewrite(&self) -> bool {
        self.build == BuildMode::Development || self.is_ci
    }
}

fn parse_boolish(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_site_url_and_ignores_unknown_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"ServiceSettings":{"SiteURL":"http://localhost:8065/team","ListenAddress":":8065"},"SqlSettings":{}}"#,
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.site_url(), Some("http://localhost:8065/team"));
    }

    #[test]
    fn missing_section_means_no_site_url() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{}").unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.site_url(), None);
    }

    #[test]
    fn blank_site_url_is_absent() {
        assert_eq!(ServerConfig::with_site_url("  ").site_url(), None);
    }

    #[test]
    fn reports_unreadable_and_malformed_config() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            ServerConfig::load(&missing),
            Err(SubpathError::ConfigRead { .. })
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(matches!(
            ServerConfig::load(&broken),
            Err(SubpathError::ConfigParse { .. })
        ));
    }

    #[test]
    fn layout_resolves_document_paths() {
        let layout = ClientLayout::new("/srv/app/client");
        assert_eq!(
            layout.path(AssetKind::RootMarkup),
            PathBuf::from("/srv/app/client/root.html")
        );
        assert_eq!(layout.file_name(AssetKind::StyleSheet), "main.css");
        assert_eq!(layout.file_name(AssetKind::ManifestDescriptor), "manifest.json");
    }

    #[test]
    fn dev_build_and_ci_skip_rewrite() {
        assert_eq!(BuildMode::from_build_number("dev"), BuildMode::Development);
        assert_eq!(BuildMode::from_build_number("5.30.1"), BuildMode::Release);

        let dev = RunEnvironment {
            build: BuildMode::Development,
            is_ci: false,
        };
        let ci = RunEnvironment {
            build: BuildMode::Release,
            is_ci: true,
        };
        assert!(dev.skips_asset_rewrite());
        assert!(ci.skips_asset_rewrite());
        assert!(!RunEnvironment::default().skips_asset_rewrite());
    }

    #[test]
    fn parses_boolish_ci_values() {
        assert!(parse_boolish("true"));
        assert!(parse_boolish(" TRUE "));
        assert!(parse_boolish("1"));
        assert!(!parse_boolish("false"));
        assert!(!parse_boolish(""));
    }
}
