use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use rforge_schema::{ReleaseInfo, SourceItem};

use crate::checksum::ResolvedChecksum;

/// Result of resolving one recipe source item against a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// A checksum was found for the item.
    Resolved {
        /// Asset name (or vendor platform key) the checksum belongs to.
        asset: String,
        checksum: ResolvedChecksum,
    },
    /// The item is left unchanged, with a reason for the log.
    Skipped(String),
}

/// An upstream that publishes releases and checksums for their files.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Unique identifier for this source instance (e.g. "github:owner/repo")
    fn key(&self) -> String;

    /// Fetch the latest release.
    async fn latest_release(&self, client: &Client) -> Result<ReleaseInfo>;

    /// Resolve the checksum for one source item of a recipe.
    ///
    /// Per-item misses come back as [`ItemOutcome::Skipped`]. An `Err` means
    /// the source itself failed and the rest of the recipe cannot proceed.
    async fn resolve_item(
        &self,
        client: &Client,
        release: &ReleaseInfo,
        item: &SourceItem,
    ) -> Result<ItemOutcome>;
}
