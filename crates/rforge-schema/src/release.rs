//! Release records as served by an upstream release API.

use serde::{Deserialize, Serialize};

use crate::hash::Sha256Digest;

/// Represents a release found in a remote source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    /// Version tag, optionally `v`-prefixed. Missing on malformed responses.
    #[serde(default)]
    pub tag_name: Option<String>,
    /// Downloadable files attached to the release.
    #[serde(default)]
    pub assets: Vec<AssetInfo>,
}

/// Represents an asset attached to a release
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// File name of the asset.
    pub name: String,
    /// Public download URL.
    #[serde(rename = "browser_download_url", default)]
    pub download_url: Option<String>,
    /// Content-addressed digest (e.g. `sha256:<hex>`), when the API provides one.
    ///
    /// Kept raw: an unparsable digest must not fail the whole release.
    #[serde(default)]
    pub digest: Option<String>,
}

impl ReleaseInfo {
    /// The tag with leading `v`s removed (`v1.2.3` -> `1.2.3`).
    pub fn version(&self) -> Option<&str> {
        self.tag_name
            .as_deref()
            .map(|t| t.trim_start_matches('v'))
            .filter(|v| !v.is_empty())
    }

    /// Find an asset by exact file name.
    pub fn find_asset(&self, name: &str) -> Option<&AssetInfo> {
        self.assets.iter().find(|a| a.name == name)
    }
}

impl AssetInfo {
    /// The inline digest, if present and labelled as SHA-256.
    pub fn inline_digest(&self) -> Option<Sha256Digest> {
        self.digest.as_deref().and_then(Sha256Digest::from_prefixed)
    }
}
