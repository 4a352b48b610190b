mod github;
mod helpers;
mod manifest;
mod reconcile;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use env_logger::Env;
use log::{error, info};
use url::Url;

use github::{DEFAULT_API_URL, GithubClient, GithubConfig, Release, ReleaseSelector};
use helpers::AssetFetcher;
use helpers::asset_resolver::HttpAssetFetcher;
use manifest::{DictMetadata, load_manifest, save_manifest};
use reconcile::{MetadataPolicy, reconcile};

#[derive(Parser, Debug)]
#[command(
    name = "release-manifest-sync",
    version,
    about = "Update dictionary and layout manifests from GitHub Release assets"
)]
struct Cli {
    /// GitHub repository owner.
    #[arg(long)]
    owner: String,

    /// GitHub repository name.
    #[arg(long)]
    repo: String,

    /// Release tag (default: latest release).
    #[arg(long, conflicts_with = "tag_pattern")]
    release_tag: Option<String>,

    /// Tag pattern to match, e.g. 'v*'. The first release listed by the API
    /// whose tag matches is used.
    #[arg(long)]
    tag_pattern: Option<String>,

    /// Path to the dictionaries manifest file.
    #[arg(long, default_value = "docs/dicts-manifest.json")]
    dicts_manifest: PathBuf,

    /// Path to the layouts manifest file.
    #[arg(long, default_value = "docs/layouts-manifest.json")]
    layouts_manifest: PathBuf,

    /// Path to the dictionaries metadata mapping file.
    #[arg(long, default_value = "docs/dicts-metadata.json")]
    dicts_metadata: PathBuf,

    /// Root of the GitHub REST API.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: Url,

    /// API token, sent as basic auth with an empty username.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let metadata = DictMetadata::load(&cli.dicts_metadata);
    if metadata.is_empty() {
        info!("metadata: no dictionary metadata loaded from {}", cli.dicts_metadata.display());
    }
    let selector = ReleaseSelector::from_args(cli.release_tag, cli.tag_pattern.as_deref())?;

    let config = GithubConfig::new(cli.api_url, cli.token);
    let client = GithubClient::new(config, &cli.owner, &cli.repo)?;
    let release = client
        .resolve(&selector)
        .await
        .with_context(|| format!("fetch {selector} of {}/{}", cli.owner, cli.repo))?;

    let targets = [
        (MetadataPolicy::Dictionary(&metadata), cli.dicts_manifest.as_path()),
        (MetadataPolicy::Layout, cli.layouts_manifest.as_path()),
    ];
    sync_manifests(&release, &targets, &HttpAssetFetcher::new(), Utc::now()).await
}

/// Reconcile every target against `release`, then write the results.
///
/// Everything is reconciled before anything is written, so a failed download
/// leaves every manifest untouched. A kind with no assets in the release
/// keeps its file as it is.
async fn sync_manifests(
    release: &Release,
    targets: &[(MetadataPolicy<'_>, &Path)],
    fetcher: &dyn AssetFetcher,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut pending = Vec::new();
    for &(policy, path) in targets {
        let kind = policy.kind();
        if !release.assets().iter().any(|a| kind.matches(a.filename())) {
            info!("{kind}: no {kind} assets found");
            continue;
        }

        let base = load_manifest(path);
        let out = reconcile(&base, release.tag_name(), release.assets(), policy, fetcher, now)
            .await
            .with_context(|| format!("reconcile {kind} assets of {}", release.tag_name()))?;
        pending.push((kind, path, out));
    }

    for (kind, path, out) in pending {
        save_manifest(path, &out.manifest).with_context(|| format!("write {}", path.display()))?;
        info!(
            "manifest: updated {} with {} {kind} items ({} new, {} refreshed)",
            path.display(),
            out.manifest.items().len(),
            out.added,
            out.updated
        );
        if !out.unlisted.is_empty() {
            info!(
                "metadata: {} new {kind} items have no metadata entry: {}",
                out.unlisted.len(),
                out.unlisted.join(", ")
            );
        }
    }

    Ok(())
}
