//! Publish guard: has this package version already been built or published?
//!
//! Checks the local output directory first, then the channel's package index
//! (`repodata.json`). Index failures never block a build; they are logged and
//! treated as "not published".

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glob::Pattern;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::METADATA_TIMEOUT;

/// Where an existing package was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    /// A matching artifact in the local output directory.
    Local(PathBuf),
    /// A matching record in the remote channel index.
    Channel,
}

/// Channel index. Records are kept as raw JSON so one malformed entry only
/// drops that entry, not the whole index.
#[derive(Debug, Default, Deserialize)]
struct RepoData {
    #[serde(default)]
    packages: HashMap<String, Value>,
    #[serde(default, rename = "packages.conda")]
    packages_conda: HashMap<String, Value>,
}

impl RepoData {
    fn contains(&self, name: &str, version: &str) -> bool {
        self.packages
            .values()
            .chain(self.packages_conda.values())
            .any(|record| {
                record.get("name").and_then(Value::as_str) == Some(name)
                    && record.get("version").and_then(Value::as_str) == Some(version)
            })
    }
}

/// Checks a package/version/platform triple against local output and a channel.
#[derive(Debug, Clone)]
pub struct PublishGuard {
    client: Client,
    base_url: String,
    output_dir: PathBuf,
}

impl PublishGuard {
    pub fn new(client: Client, base_url: &str, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Local check first, then the remote index.
    pub async fn check(
        &self,
        channel: &str,
        platform: &str,
        name: &str,
        version: &str,
    ) -> Option<Published> {
        if let Some(path) = self.exists_locally(platform, name, version) {
            return Some(Published::Local(path));
        }
        self.exists_in_channel(channel, platform, name, version)
            .await
            .then_some(Published::Channel)
    }

    /// First artifact matching `<output>/<platform>/<name>-<version>-*.conda`.
    pub fn exists_locally(&self, platform: &str, name: &str, version: &str) -> Option<PathBuf> {
        if [platform, name, version].iter().any(|s| s.is_empty()) {
            return None;
        }
        let pattern = format!(
            "{}/{}/{}-{}-*.conda",
            Pattern::escape(&self.output_dir.to_string_lossy()),
            Pattern::escape(platform),
            Pattern::escape(name),
            Pattern::escape(version),
        );
        first_match(&pattern)
    }

    /// Whether `<base>/channels/<channel>/<platform>/repodata.json` lists the package.
    pub async fn exists_in_channel(
        &self,
        channel: &str,
        platform: &str,
        name: &str,
        version: &str,
    ) -> bool {
        if [channel, platform, name, version].iter().any(|s| s.is_empty()) {
            return false;
        }
        let url = format!(
            "{}/channels/{channel}/{platform}/repodata.json",
            self.base_url
        );
        debug!("checking {url} for {name} {version}");

        let resp = match self.client.get(&url).timeout(METADATA_TIMEOUT).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!("failed to query {url}: {e}");
                return false;
            }
        };
        if !resp.status().is_success() {
            warn!("{url} returned {}", resp.status());
            return false;
        }
        match resp.json::<RepoData>().await {
            Ok(repodata) => repodata.contains(name, version),
            Err(e) => {
                warn!("failed to parse {url}: {e}");
                false
            }
        }
    }
}

/// First path matching a glob pattern, in sorted order.
pub(crate) fn first_match(pattern: &str) -> Option<PathBuf> {
    let mut matches: Vec<PathBuf> = glob::glob(pattern).ok()?.filter_map(Result::ok).collect();
    matches.sort();
    matches.into_iter().next()
}
