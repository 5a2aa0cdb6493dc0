//! End-to-end checks of the `rforge-build` binary.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn build_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_rforge-build"));
    cmd.current_dir(cwd);
    for var in ["PREFIX_API_KEY", "PREFIX_TOKEN", "SKIP_EXISTING", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_command() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let output = build_cmd(dir.path())
        .arg("--help")
        .output()
        .expect("failed to run rforge-build");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--target-platforms"));
}

#[test]
fn test_generate_only_run() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let recipe_dir = dir.path().join("recipes/tool");
    fs::create_dir_all(&recipe_dir).unwrap();
    fs::write(
        recipe_dir.join("recipe.yaml"),
        "context:\n  version: 0.3.0\npackage:\n  name: tool\n",
    )
    .unwrap();

    let output = build_cmd(dir.path())
        .args([
            "--no-build",
            "--skip-upload",
            "--target-platforms",
            "linux-64",
            "osx-arm64",
        ])
        .output()
        .expect("failed to run rforge-build");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("::group::tool-linux-64"));
    assert!(stdout.contains("::group::tool-osx-arm64"));
    assert!(stdout.contains("::endgroup::"));

    for platform in ["linux-64", "osx-arm64"] {
        let generated = recipe_dir.join("generated").join(platform).join("recipe.yaml");
        let text = fs::read_to_string(generated).unwrap();
        assert!(text.starts_with("# yaml-language-server: $schema="));
    }
}

#[test]
fn test_broken_recipe_aborts_with_error_marker() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let recipe_dir = dir.path().join("recipes/broken");
    fs::create_dir_all(&recipe_dir).unwrap();
    fs::write(recipe_dir.join("recipe.yaml"), "package:\n  name: broken\n").unwrap();

    let output = build_cmd(dir.path())
        .args(["--no-build", "--no-upload"])
        .output()
        .expect("failed to run rforge-build");
    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("::error title="));
    assert!(stdout.contains("recipe failed to cook"));
}

#[test]
fn test_missing_recipes_dir_is_empty_run() {
    let dir = TempDir::new().expect("failed to create temp dir");
    let output = build_cmd(dir.path())
        .args(["--no-build", "--no-upload", "--recipes-dir", "nowhere"])
        .output()
        .expect("failed to run rforge-build");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("::group::"));
    assert!(!dir.path().join("nowhere").exists());
}
