//! `rforge-build` - generate, build and publish recipes.
//!
//! For every recipe and target platform this writes a generated copy of the
//! recipe, optionally skips versions that already exist, runs the external
//! build tool and uploads the resulting artifact to the channel. Output is
//! grouped with GitHub Actions workflow commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rforge_core::config::{self, DEFAULT_BUILD_TOOL};
use rforge_core::http::build_client;
use rforge_core::walk::find_recipes;
use rforge_core::{BuildOptions, BuildOutcome, PublishGuard, RattlerBuild, cook_recipe};
use rforge_schema::TargetPlatform;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate, build and publish rattler-build recipes", long_about = None)]
struct Args {
    /// Cook a single recipe instead of every recipe under --recipes-dir
    #[arg(long)]
    recipe_path: Option<PathBuf>,

    /// Channel to upload to and check for existing packages
    #[arg(long, default_value = "longred-forge")]
    channel: String,

    /// Target platforms to build for
    #[arg(long, num_args = 1.., default_value = TargetPlatform::DEFAULT)]
    target_platforms: Vec<TargetPlatform>,

    /// Do not upload built artifacts
    #[arg(long, alias = "skip-upload")]
    no_upload: bool,

    /// Only write generated recipes, do not run the build tool
    #[arg(long, alias = "skip-build")]
    no_build: bool,

    /// Skip versions already in the output directory or the channel
    /// (also enabled by SKIP_EXISTING=1/true)
    #[arg(long)]
    skip_existing: bool,

    /// Directory searched (recursively) for recipe.yaml files
    #[arg(long, default_value = "recipes")]
    recipes_dir: PathBuf,

    /// Build tool output directory
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Channels the build resolves dependencies from
    #[arg(long = "build-channel", default_value = "conda-forge")]
    build_channels: Vec<String>,

    /// Build tool binary
    #[arg(long, env = "RFORGE_BUILD_TOOL", default_value = DEFAULT_BUILD_TOOL)]
    tool: PathBuf,
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
    let skip_existing = args.skip_existing
        || std::env::var("SKIP_EXISTING").is_ok_and(|v| config::is_truthy(&v));

    let recipes = match &args.recipe_path {
        Some(path) => vec![path.clone()],
        None if !args.recipes_dir.is_dir() => {
            info!("{} does not exist, nothing to build", args.recipes_dir.display());
            Vec::new()
        }
        None => find_recipes(&args.recipes_dir, true)?,
    };
    if recipes.is_empty() {
        info!("no recipes found under {}", args.recipes_dir.display());
        return Ok(());
    }

    let opts = BuildOptions {
        channel: args.channel.clone(),
        build_channels: args.build_channels.clone(),
        build: !args.no_build,
        upload: !args.no_upload,
        skip_existing,
        prefix_token: config::prefix_token(),
        step_summary: config::step_summary_path(),
    };
    let tool = RattlerBuild::new(&args.tool);
    let guard = PublishGuard::new(build_client()?, &config::repo_base_url(), &args.output_dir);

    for recipe in &recipes {
        for platform in &args.target_platforms {
            cook_grouped(&tool, &guard, recipe, platform, &opts).await?;
        }
    }
    Ok(())
}

/// Cook one recipe/platform pair inside a workflow log group.
async fn cook_grouped(
    tool: &RattlerBuild,
    guard: &PublishGuard,
    recipe: &Path,
    platform: &TargetPlatform,
    opts: &BuildOptions,
) -> Result<()> {
    let name = rforge_core::builder::recipe_name(recipe).unwrap_or_else(|| "recipe".to_string());
    println!("::group::{name}-{platform}");

    let result = cook_recipe(tool, guard, recipe, platform, opts).await;
    match &result {
        Ok(BuildOutcome::Generated) => info!("{name} ({platform}): generated"),
        Ok(BuildOutcome::AlreadyPublished(_)) => info!("{name} ({platform}): up to date"),
        Ok(BuildOutcome::Built) => info!("{name} ({platform}): built"),
        Ok(BuildOutcome::Uploaded(path)) => info!("{name} ({platform}): published {}", path.display()),
        Err(_) => println!("::error title={}::recipe failed to cook", recipe.display()),
    }

    println!("::endgroup::");
    result
        .map(|_| ())
        .with_context(|| format!("Failed to cook {} for {platform}", recipe.display()))
}
