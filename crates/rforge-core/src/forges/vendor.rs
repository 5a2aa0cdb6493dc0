//! Vendor-hosted release buckets.
//!
//! Some projects publish outside GitHub releases: a bucket exposes the latest
//! version at `<base>/latest` and a manifest per version at
//! `<base>/<version>/manifest.json` with one checksum per platform key.
//! Checksums come straight from the manifest, so no asset is downloaded.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use rforge_schema::{ArchVariant, OsVariant, PlatformPredicate, ReleaseInfo, Sha256Digest, SourceItem};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::checksum::{ChecksumStrategy, ResolvedChecksum};
use crate::forges::traits::{ItemOutcome, ReleaseSource};
use crate::http::{METADATA_TIMEOUT, fetch_text};

#[derive(Debug, Deserialize)]
struct VendorManifest {
    #[serde(default)]
    platforms: HashMap<String, PlatformEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PlatformEntry {
    Checksum(String),
    Detailed {
        #[serde(default)]
        checksum: Option<String>,
    },
}

impl PlatformEntry {
    fn checksum(&self) -> Option<&str> {
        match self {
            Self::Checksum(c) => Some(c),
            Self::Detailed { checksum } => checksum.as_deref(),
        }
    }
}

/// Map a predicate to the bucket's platform key (`linux-x64`, `darwin-arm64`, ...).
pub fn platform_key(predicate: &PlatformPredicate) -> Option<String> {
    let os = match predicate.os()? {
        OsVariant::Linux => "linux",
        OsVariant::MacOS => "darwin",
        OsVariant::Windows => "win32",
    };
    let arch = match predicate.arch()? {
        ArchVariant::X86_64 => "x64",
        ArchVariant::Arm64 => "arm64",
    };
    Some(format!("{os}-{arch}"))
}

/// A vendor bucket with per-version manifests, cached for the run.
#[derive(Debug)]
pub struct VendorSource {
    base_url: String,
    manifests: Mutex<HashMap<String, Arc<VendorManifest>>>,
}

impl VendorSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            manifests: Mutex::new(HashMap::new()),
        }
    }

    async fn manifest(&self, client: &Client, version: &str) -> Result<Arc<VendorManifest>> {
        let mut cache = self.manifests.lock().await;
        if let Some(manifest) = cache.get(version) {
            return Ok(Arc::clone(manifest));
        }

        let url = format!("{}/{version}/manifest.json", self.base_url);
        debug!("fetching vendor manifest {url}");
        let manifest: VendorManifest = client
            .get(&url)
            .timeout(METADATA_TIMEOUT)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {url}"))?
            .error_for_status()
            .with_context(|| format!("Vendor manifest error for {url}"))?
            .json()
            .await
            .with_context(|| format!("Failed to parse {url}"))?;

        let manifest = Arc::new(manifest);
        cache.insert(version.to_string(), Arc::clone(&manifest));
        Ok(manifest)
    }
}

#[async_trait]
impl ReleaseSource for VendorSource {
    fn key(&self) -> String {
        format!("vendor:{}", self.base_url)
    }

    async fn latest_release(&self, client: &Client) -> Result<ReleaseInfo> {
        let url = format!("{}/latest", self.base_url);
        let body = fetch_text(client, &url)
            .await
            .with_context(|| format!("Failed to fetch {url}"))?;
        let tag = body.trim();
        Ok(ReleaseInfo {
            tag_name: (!tag.is_empty()).then(|| tag.to_string()),
            assets: Vec::new(),
        })
    }

    async fn resolve_item(
        &self,
        client: &Client,
        release: &ReleaseInfo,
        item: &SourceItem,
    ) -> Result<ItemOutcome> {
        let Some(version) = release.tag_name.as_deref() else {
            return Ok(ItemOutcome::Skipped("release has no tag".to_string()));
        };
        let manifest = self.manifest(client, version).await?;

        let Some(key) = platform_key(&item.predicate) else {
            return Ok(ItemOutcome::Skipped(format!(
                "No vendor platform key for predicate '{}'",
                item.predicate
            )));
        };
        let Some(raw) = manifest.platforms.get(&key).and_then(PlatformEntry::checksum) else {
            return Ok(ItemOutcome::Skipped(format!(
                "No checksum for {key} in manifest {version}"
            )));
        };
        match Sha256Digest::new(raw) {
            Ok(digest) => Ok(ItemOutcome::Resolved {
                asset: key,
                checksum: ResolvedChecksum {
                    digest,
                    strategy: ChecksumStrategy::VendorManifest,
                },
            }),
            Err(e) => Ok(ItemOutcome::Skipped(format!("Bad checksum for {key}: {e}"))),
        }
    }
}
