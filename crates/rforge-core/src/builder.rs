//! Cooking a recipe: generate, guard, build, upload.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rforge_schema::{Recipe, TargetPlatform};
use tracing::{info, warn};

use crate::channel::{PublishGuard, Published, first_match};
use crate::tool::BuildTool;

/// Name of the per-recipe directory that holds generated recipes.
pub const GENERATED_DIR: &str = "generated";

/// Settings shared by every recipe/platform pair in a run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Channel uploads go to and the publish guard checks.
    pub channel: String,
    /// Channels the build resolves dependencies from.
    pub build_channels: Vec<String>,
    pub build: bool,
    pub upload: bool,
    pub skip_existing: bool,
    /// Upload key; uploads are skipped without one.
    pub prefix_token: Option<String>,
    /// CI step-summary file to append published artifacts to.
    pub step_summary: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            channel: "longred-forge".to_string(),
            build_channels: vec!["conda-forge".to_string()],
            build: true,
            upload: true,
            skip_existing: false,
            prefix_token: None,
            step_summary: None,
        }
    }
}

/// What happened to one recipe/platform pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Only the generated recipe was written.
    Generated,
    /// Skipped because the version already exists.
    AlreadyPublished(Published),
    /// Built but not uploaded.
    Built,
    /// Uploaded this artifact.
    Uploaded(PathBuf),
}

/// Write `recipe` to `<recipe dir>/generated/<platform>/recipe.yaml`,
/// clearing whatever a previous run left there.
///
/// # Errors
///
/// Returns an error if the directory cannot be recreated or written.
pub fn write_generated_recipe(
    recipe_path: &Path,
    recipe: &Recipe,
    platform: &TargetPlatform,
) -> Result<PathBuf> {
    let recipe_dir = recipe_path.parent().unwrap_or_else(|| Path::new("."));
    let out_dir = recipe_dir.join(GENERATED_DIR).join(platform.as_str());
    if out_dir.exists() {
        fs::remove_dir_all(&out_dir)
            .with_context(|| format!("Failed to clear {}", out_dir.display()))?;
    }
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let generated = out_dir.join("recipe.yaml");
    fs::write(&generated, recipe.render()?)
        .with_context(|| format!("Failed to write {}", generated.display()))?;
    Ok(generated)
}

/// Recipe name: the name of the directory holding the recipe file.
pub fn recipe_name(recipe_path: &Path) -> Option<String> {
    recipe_path
        .parent()?
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
}

/// Generate, optionally build and optionally upload one recipe for one platform.
///
/// # Errors
///
/// Returns an error if the recipe cannot be read, parsed or generated, or
/// if the build or upload subprocess fails.
pub async fn cook_recipe(
    tool: &dyn BuildTool,
    guard: &PublishGuard,
    recipe_path: &Path,
    platform: &TargetPlatform,
    opts: &BuildOptions,
) -> Result<BuildOutcome> {
    let name = recipe_name(recipe_path)
        .with_context(|| format!("Cannot derive a recipe name from {}", recipe_path.display()))?;
    let text = fs::read_to_string(recipe_path)
        .with_context(|| format!("Failed to read {}", recipe_path.display()))?;
    let recipe = Recipe::parse(&text)
        .with_context(|| format!("Failed to parse {}", recipe_path.display()))?;
    let Some(version) = recipe.version() else {
        bail!("{} has no context.version", recipe_path.display());
    };

    let generated = write_generated_recipe(recipe_path, &recipe, platform)?;
    info!("generated {}", generated.display());

    if !opts.build {
        return Ok(BuildOutcome::Generated);
    }

    if opts.skip_existing {
        if let Some(found) = guard
            .check(&opts.channel, platform.as_str(), &name, &version)
            .await
        {
            match &found {
                Published::Local(path) => info!(
                    "{name} {version} ({platform}) already built at {}, skipping",
                    path.display()
                ),
                Published::Channel => info!(
                    "{name} {version} ({platform}) already published to {}, skipping",
                    opts.channel
                ),
            }
            return Ok(BuildOutcome::AlreadyPublished(found));
        }
    }

    tool.build(&generated, platform.as_str(), &opts.build_channels)?;
    let done = BuildOutcome::Built;

    if !opts.upload {
        return Ok(done);
    }
    let Some(token) = opts.prefix_token.as_deref() else {
        warn!("no PREFIX_API_KEY or PREFIX_TOKEN set, skipping upload of {name}");
        return Ok(done);
    };
    let Some(artifact) = find_artifact(guard.output_dir(), platform, &name, &version) else {
        warn!(
            "no {name}-{version} artifact for {platform} in {}, skipping upload",
            guard.output_dir().display()
        );
        return Ok(done);
    };

    tool.upload(&artifact, &opts.channel, token)?;
    info!("uploaded {} to {}", artifact.display(), opts.channel);

    if let Some(summary) = &opts.step_summary {
        if let Err(e) = append_summary(summary, platform, &artifact) {
            warn!("failed to write step summary {}: {e}", summary.display());
        }
    }
    Ok(BuildOutcome::Uploaded(artifact))
}

/// The built artifact `<output>/<platform>/<name>-<version>-*_0.conda`.
pub fn find_artifact(
    output_dir: &Path,
    platform: &TargetPlatform,
    name: &str,
    version: &str,
) -> Option<PathBuf> {
    let pattern = format!(
        "{}/{}/{}-{}-*_0.conda",
        glob::Pattern::escape(&output_dir.to_string_lossy()),
        glob::Pattern::escape(platform.as_str()),
        glob::Pattern::escape(name),
        glob::Pattern::escape(version),
    );
    first_match(&pattern)
}

fn append_summary(summary: &Path, platform: &TargetPlatform, artifact: &Path) -> std::io::Result<()> {
    let file_name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut f = OpenOptions::new().create(true).append(true).open(summary)?;
    writeln!(f, "- :rocket: `{platform}/{file_name}`: **published**")
}
