//! Recipe directory traversal utilities.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::builder::GENERATED_DIR;

/// File name every recipe is stored under.
pub const RECIPE_FILE: &str = "recipe.yaml";

/// Find recipe files under `recipes_dir`, sorted by path.
///
/// Non-recursive mode looks only at `<dir>/*/recipe.yaml`. Recursive mode
/// descends into every subdirectory except `generated/` output trees. A
/// `recipe.yaml` directly inside `recipes_dir` is not a recipe.
///
/// # Errors
///
/// Returns an error if `recipes_dir` or any directory below it cannot be read.
pub fn find_recipes(recipes_dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    fs::read_dir(recipes_dir)
        .with_context(|| format!("Failed to read {}", recipes_dir.display()))?;

    let max_depth = if recursive { usize::MAX } else { 2 };
    let walker = WalkDir::new(recipes_dir)
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == GENERATED_DIR));

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {}", recipes_dir.display()))?;
        if entry.depth() >= 2
            && entry.file_type().is_file()
            && entry.file_name() == RECIPE_FILE
        {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}
