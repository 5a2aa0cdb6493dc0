//! `rforge-update` - refresh recipe versions and checksums.
//!
//! Looks up the latest upstream release of each recipe's project and, when it
//! is newer than the pinned version, rewrites `context.version` and every
//! resolvable `sha256`. Dry run unless `--apply` is given.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rforge_core::config;
use rforge_core::http::build_client;
use rforge_core::walk::find_recipes;
use rforge_core::{UpdateOptions, UpdateOutcome, update_recipe};

#[derive(Parser, Debug)]
#[command(author, version, about = "Refresh recipe versions and checksums from upstream releases", long_about = None)]
struct Args {
    /// Update a single recipe file instead of every recipes/*/recipe.yaml
    #[arg(long)]
    recipe: Option<PathBuf>,

    /// Upstream owner, used when about.repository cannot be parsed
    #[arg(long)]
    owner: Option<String>,

    /// Upstream repository, used when about.repository cannot be parsed
    #[arg(long)]
    repo: Option<String>,

    /// Write changes back to the recipe files
    #[arg(long)]
    apply: bool,

    /// Only print the updated recipes (the default; overrides --apply)
    #[arg(long)]
    dry_run: bool,

    /// Directory holding one subdirectory per recipe
    #[arg(long, default_value = "recipes")]
    recipes_dir: PathBuf,
}

#[derive(Debug, Default)]
struct Summary {
    updated: usize,
    up_to_date: usize,
    skipped: usize,
    failed: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let opts = UpdateOptions {
        owner: args.owner.clone(),
        repo: args.repo.clone(),
        write: args.apply && !args.dry_run,
        api_base: config::github_api_url(),
        token: config::github_token(),
    };
    let client = build_client()?;

    let single = args.recipe.is_some();
    let recipes = match &args.recipe {
        Some(path) => vec![path.clone()],
        None => find_recipes(&args.recipes_dir, false)?,
    };

    let mut summary = Summary::default();
    for path in &recipes {
        match update_recipe(&client, path, &opts).await {
            Ok(UpdateOutcome::Updated {
                from,
                to,
                written,
                rendered,
            }) => {
                summary.updated += 1;
                let from = from.as_deref().unwrap_or("<none>");
                if written {
                    info!("{}: updated {from} -> {to}", path.display());
                } else {
                    info!("{}: {from} -> {to} (dry run)", path.display());
                    println!("--- Updated recipe preview ---");
                    print!("{rendered}");
                    println!("--- end preview ---");
                }
            }
            Ok(UpdateOutcome::UpToDate(version)) => {
                summary.up_to_date += 1;
                info!("{}: already at version {version}", path.display());
            }
            Ok(UpdateOutcome::Skipped(reason)) => {
                summary.skipped += 1;
                warn!("{}: skipped: {reason}", path.display());
            }
            Err(e) if single => return Err(e),
            Err(e) => {
                summary.failed += 1;
                error!("{}: {e:#}", path.display());
            }
        }
    }

    println!(
        "Summary: {} updated, {} up to date, {} skipped, {} failed",
        summary.updated, summary.up_to_date, summary.skipped, summary.failed
    );
    Ok(())
}
