//! Process environment consumed at startup.
//!
//! Tokens and endpoint overrides are read from the environment (optionally
//! seeded from a `.env` file in the working directory). Nothing here is
//! cached; callers read once and pass values down.

use std::path::PathBuf;

/// Tokens for the source-hosting API, in lookup order.
pub const GITHUB_TOKEN_VARS: &[&str] = &["GH_TOKEN", "GITHUB_TOKEN", "GITHUB_API_TOKEN"];

/// Tokens for the package index upload, in lookup order.
pub const PREFIX_TOKEN_VARS: &[&str] = &["PREFIX_API_KEY", "PREFIX_TOKEN"];

/// Default base URL of the package index hosting the channels.
pub const DEFAULT_REPO_BASE: &str = "https://prefix.dev";

/// Default base URL of the GitHub REST API.
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Default external build tool.
pub const DEFAULT_BUILD_TOOL: &str = "rattler-build";

/// Load `.env` from the working directory, if present.
///
/// Variables already set in the process environment take precedence.
pub fn load_dotenv() {
    match dotenv::dotenv() {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring unreadable .env file: {e}"),
    }
}

/// Return the first variable in `names` that is set to a non-empty value.
pub fn first_non_empty<F>(names: &[&str], lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// API token for the source-hosting API (`GH_TOKEN`, `GITHUB_TOKEN`, `GITHUB_API_TOKEN`).
pub fn github_token() -> Option<String> {
    first_non_empty(GITHUB_TOKEN_VARS, env_var)
}

/// API key for uploading to the package index (`PREFIX_API_KEY`, `PREFIX_TOKEN`).
pub fn prefix_token() -> Option<String> {
    first_non_empty(PREFIX_TOKEN_VARS, env_var)
}

/// CI step-summary file appended to after a successful upload.
pub fn step_summary_path() -> Option<PathBuf> {
    first_non_empty(&["GITHUB_STEP_SUMMARY"], env_var).map(PathBuf::from)
}

/// Base URL of the package index (`PREFIX_DEV_REPO_BASE`), without a trailing slash.
pub fn repo_base_url() -> String {
    first_non_empty(&["PREFIX_DEV_REPO_BASE"], env_var)
        .unwrap_or_else(|| DEFAULT_REPO_BASE.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Base URL of the GitHub REST API (`GITHUB_API_URL`), without a trailing slash.
pub fn github_api_url() -> String {
    first_non_empty(&["GITHUB_API_URL"], env_var)
        .unwrap_or_else(|| DEFAULT_GITHUB_API.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Interpret a boolean-ish environment value (`1`, `true`, `yes`).
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}
