use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use rforge_schema::{ReleaseInfo, SourceItem};
use tracing::debug;

use crate::checksum::resolve_checksum;
use crate::config::DEFAULT_GITHUB_API;
use crate::forges::traits::{ItemOutcome, ReleaseSource};
use crate::http::METADATA_TIMEOUT;
use crate::naming::resolve_asset_name;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Releases of one GitHub repository.
#[derive(Debug, Clone)]
pub struct GitHubSource {
    owner: String,
    repo: String,
    api_base: String,
    token: Option<String>,
}

impl GitHubSource {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_GITHUB_API.to_string(),
            token: None,
        }
    }

    /// Point at a different API root (GitHub Enterprise, test servers).
    #[must_use]
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    /// Authenticate API calls with `token`. Only the release listing carries it;
    /// asset downloads go to public URLs.
    #[must_use]
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }
}

#[async_trait]
impl ReleaseSource for GitHubSource {
    fn key(&self) -> String {
        format!("github:{}/{}", self.owner, self.repo)
    }

    async fn latest_release(&self, client: &Client) -> Result<ReleaseInfo> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_base, self.owner, self.repo
        );
        debug!("fetching {url}");

        let mut req = client
            .get(&url)
            .header(ACCEPT, GITHUB_ACCEPT)
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .timeout(METADATA_TIMEOUT);
        if let Some(token) = &self.token {
            req = req.header(AUTHORIZATION, format!("token {token}"));
        }

        let release: ReleaseInfo = req
            .send()
            .await
            .with_context(|| format!("Failed to fetch latest release for {}", self.key()))?
            .error_for_status()
            .with_context(|| format!("GitHub API error for {}", self.key()))?
            .json()
            .await
            .with_context(|| format!("Failed to parse release JSON for {}", self.key()))?;
        Ok(release)
    }

    async fn resolve_item(
        &self,
        client: &Client,
        release: &ReleaseInfo,
        item: &SourceItem,
    ) -> Result<ItemOutcome> {
        let Some(version) = release.version() else {
            return Ok(ItemOutcome::Skipped("release has no tag".to_string()));
        };

        let Some((name, rule)) = resolve_asset_name(item, version, Some(self.repo.as_str())) else {
            return Ok(ItemOutcome::Skipped(format!(
                "Could not determine asset name for url: {}",
                item.url
            )));
        };
        debug!("{} ({}) -> {name} via {rule:?}", item.location, item.predicate);

        let Some(asset) = release.find_asset(&name) else {
            return Ok(ItemOutcome::Skipped(format!(
                "No matching asset found for {name}"
            )));
        };

        match resolve_checksum(client, release, asset).await {
            Ok(checksum) => Ok(ItemOutcome::Resolved {
                asset: name,
                checksum,
            }),
            Err(e) => Ok(ItemOutcome::Skipped(format!(
                "Failed to compute sha for {name}: {e}"
            ))),
        }
    }
}

/// Extract `(owner, repo)` from a repository URL.
///
/// Accepts `git@host:owner/repo(.git)` and any `scheme://host/owner/repo/...`
/// URL; the first two path segments are taken.
pub fn parse_owner_repo(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else {
        url.split_once("://")?.1.split_once('/')?.1
    };
    let path = path.split(['?', '#']).next()?;

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
