//! Refreshing a recipe's version pin and checksums from its upstream.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use reqwest::Client;
use rforge_schema::Recipe;
use tracing::{info, warn};

use crate::config::DEFAULT_GITHUB_API;
use crate::forges::traits::{ItemOutcome, ReleaseSource};
use crate::forges::{GitHubSource, VendorSource, parse_owner_repo};

/// Settings for one update run.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    /// Fallback owner when the recipe's `about.repository` cannot be parsed.
    pub owner: Option<String>,
    /// Fallback repository name, paired with `owner`.
    pub repo: Option<String>,
    /// Write the updated recipe back; otherwise only render it.
    pub write: bool,
    pub api_base: String,
    pub token: Option<String>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            write: false,
            api_base: DEFAULT_GITHUB_API.to_string(),
            token: None,
        }
    }
}

/// What happened to one recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Version and checksums were refreshed.
    Updated {
        from: Option<String>,
        to: String,
        /// Whether the file on disk was rewritten.
        written: bool,
        /// The rendered recipe, for previews.
        rendered: String,
    },
    /// The recipe already pins the latest version.
    UpToDate(String),
    /// The recipe could not be checked, with the reason.
    Skipped(String),
}

fn release_source(recipe: &Recipe, opts: &UpdateOptions) -> Option<Box<dyn ReleaseSource>> {
    if let Some(base) = recipe.vendor_manifest() {
        return Some(Box::new(VendorSource::new(base)));
    }
    let (owner, repo) = recipe.repository().and_then(parse_owner_repo).or_else(|| {
        opts.owner
            .clone()
            .zip(opts.repo.clone())
            .filter(|(o, r)| !o.is_empty() && !r.is_empty())
    })?;
    Some(Box::new(
        GitHubSource::new(owner, repo)
            .with_api_base(&opts.api_base)
            .with_token(opts.token.clone()),
    ))
}

/// Check one recipe against its upstream and refresh it.
///
/// Items whose asset or checksum cannot be resolved keep their old checksum
/// and are logged.
///
/// # Errors
///
/// Returns an error if the recipe cannot be read, parsed or written, or if
/// the upstream release lookup fails.
pub async fn update_recipe(
    client: &Client,
    recipe_path: &Path,
    opts: &UpdateOptions,
) -> Result<UpdateOutcome> {
    let text = fs::read_to_string(recipe_path)
        .with_context(|| format!("Failed to read {}", recipe_path.display()))?;
    let mut recipe = Recipe::parse(&text)
        .with_context(|| format!("Failed to parse {}", recipe_path.display()))?;

    let Some(source) = release_source(&recipe, opts) else {
        return Ok(UpdateOutcome::Skipped(
            "no owner/repo in about.repository and none given".to_string(),
        ));
    };
    info!("{}: checking {}", recipe_path.display(), source.key());

    let release = source.latest_release(client).await?;
    let Some(latest) = release.version().map(str::to_string) else {
        return Ok(UpdateOutcome::Skipped(format!(
            "{} has no tagged release",
            source.key()
        )));
    };

    let current = recipe.version();
    if current.as_deref() == Some(latest.as_str()) {
        return Ok(UpdateOutcome::UpToDate(latest));
    }
    info!(
        "{}: {} -> {latest}",
        recipe_path.display(),
        current.as_deref().unwrap_or("<none>")
    );

    recipe.set_version(&latest)?;
    for item in recipe.source_items() {
        match source.resolve_item(client, &release, &item).await? {
            ItemOutcome::Resolved { asset, checksum } => {
                info!(
                    "  {}: {asset} sha256 {} ({})",
                    item.location, checksum.digest, checksum.strategy
                );
                recipe.set_sha256(item.location, &checksum.digest)?;
            }
            ItemOutcome::Skipped(reason) => warn!("  {}: {reason}", item.location),
        }
    }

    let rendered = recipe.render()?;
    if opts.write {
        fs::write(recipe_path, &rendered)
            .with_context(|| format!("Failed to write {}", recipe_path.display()))?;
    }
    Ok(UpdateOutcome::Updated {
        from: current,
        to: latest,
        written: opts.write,
        rendered,
    })
}
