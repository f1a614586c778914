//! Command-line entry point: rewrite a client directory for the configured site URL.

use std::path::PathBuf;

use anyhow::{Context, Result};
use asset_subpath::{
    AssetUpdater, BuildMode, ClientLayout, RunEnvironment, ServerConfig, subpath_from_config,
    update_from_config,
};
use clap::Parser;
use log::info;

#[derive(Debug, Parser)]
#[command(
    name = "asset-subpath",
    version,
    about = "Point static client assets at a deployment subpath"
)]
struct Cli {
    /// Server config JSON carrying `ServiceSettings.SiteURL`.
    #[arg(long, value_name = "FILE", conflicts_with = "site_url")]
    config: Option<PathBuf>,
    /// Site URL to derive the subpath from instead of a config file.
    #[arg(long, value_name = "URL")]
    site_url: Option<String>,
    /// Directory holding the built client assets.
    #[arg(long, value_name = "DIR", default_value = "client")]
    client_dir: PathBuf,
    /// Build number of the running server; `dev` skips the rewrite.
    #[arg(long, env = "BUILD_NUMBER", default_value = "")]
    build_number: String,
    /// Report which documents would change without writing them.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match (&cli.config, &cli.site_url) {
        (Some(path), _) => ServerConfig::load(path)?,
        (None, Some(url)) => ServerConfig::with_site_url(url.as_str()),
        (None, None) => ServerConfig::default(),
    };
    let layout = ClientLayout::new(&cli.client_dir);

    if cli.dry_run {
        let subpath = subpath_from_config(&config)?;
        let documents = AssetUpdater::new(layout)?
            .plan(&subpath)
            .with_context(|| format!("failed to plan rewrite of {}", cli.client_dir.display()))?;
        for document in documents {
            let state = if document.is_changed() {
                "would rewrite"
            } else {
                "unchanged"
            };
            println!("{state}: {}", document.path.display());
        }
        return Ok(());
    }

    let environment = RunEnvironment::from_env(BuildMode::from_build_number(&cli.build_number));
    let outcome = update_from_config(&config, &layout, &environment).with_context(|| {
        format!(
            "failed to update client assets in {}",
            cli.client_dir.display()
        )
    })?;

    match outcome {
        Some(summary) => info!(
            "Client assets now served from {} ({} rewritten, {} unchanged)",
            summary.subpath,
            summary.written.len(),
            summary.unchanged.len()
        ),
        None => info!("Development build or CI run, client assets left as built"),
    }

    Ok(())
}
