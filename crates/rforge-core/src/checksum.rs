//! SHA-256 resolution for release assets.
//!
//! Strategies run in priority order and the first success wins:
//!
//! 1. the asset's inline `digest` field (`sha256:<hex>`),
//! 2. a sidecar file named `<asset><suffix>` for a known suffix,
//! 3. any other release asset whose name mentions `sha` or `checksum`,
//! 4. downloading the asset and hashing it.
//!
//! Stages 2 and 3 swallow their own failures (logged at `warn`) and fall
//! through. Only stage 4 can fail the resolution.

use reqwest::Client;
use rforge_schema::{AssetInfo, ReleaseInfo, Sha256Digest};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::http::{DOWNLOAD_TIMEOUT, fetch_text};

/// Sidecar checksum suffixes, tried in order.
pub const SIDECAR_SUFFIXES: &[&str] = &[".sha256", ".sha256sum", ".sha256.txt", ".sha256sums"];

#[derive(Error, Debug)]
pub enum ChecksumError {
    #[error("asset '{0}' has no download url")]
    NoDownloadUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// The strategy that produced a checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumStrategy {
    /// The asset record's own `digest` field.
    Inline,
    /// A sidecar file, by name.
    Sidecar(String),
    /// A shared checksum listing, by name.
    ChecksumFile(String),
    /// Downloaded and hashed locally.
    Download,
    /// A vendor release manifest.
    VendorManifest,
}

impl std::fmt::Display for ChecksumStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline => write!(f, "inline digest"),
            Self::Sidecar(name) => write!(f, "sidecar {name}"),
            Self::ChecksumFile(name) => write!(f, "checksum file {name}"),
            Self::Download => write!(f, "download"),
            Self::VendorManifest => write!(f, "vendor manifest"),
        }
    }
}

/// A checksum together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChecksum {
    pub digest: Sha256Digest,
    pub strategy: ChecksumStrategy,
}

/// Resolve the SHA-256 of `asset`, a member of `release`.
///
/// # Errors
///
/// Returns an error only when every cheaper strategy missed and the final
/// download fails or the asset has no download URL.
pub async fn resolve_checksum(
    client: &Client,
    release: &ReleaseInfo,
    asset: &AssetInfo,
) -> Result<ResolvedChecksum, ChecksumError> {
    // Priority 1: inline digest
    if let Some(digest) = asset.inline_digest() {
        return Ok(ResolvedChecksum {
            digest,
            strategy: ChecksumStrategy::Inline,
        });
    }
    if let Some(raw) = &asset.digest {
        debug!("ignoring non-sha256 digest '{raw}' on {}", asset.name);
    }

    // Priority 2: sidecar files named after the asset
    let mut tried = Vec::new();
    for suffix in SIDECAR_SUFFIXES {
        let sidecar_name = format!("{}{suffix}", asset.name);
        let Some(sidecar) = release.find_asset(&sidecar_name) else {
            continue;
        };
        tried.push(sidecar_name.clone());
        if let Some(digest) = digest_from_listing(client, sidecar, &asset.name, true).await {
            return Ok(ResolvedChecksum {
                digest,
                strategy: ChecksumStrategy::Sidecar(sidecar_name),
            });
        }
    }

    // Priority 3: any checksum listing in the release
    for candidate in &release.assets {
        if candidate.name == asset.name || tried.contains(&candidate.name) {
            continue;
        }
        if !looks_like_checksum_file(&candidate.name) {
            continue;
        }
        if let Some(digest) = digest_from_listing(client, candidate, &asset.name, false).await {
            return Ok(ResolvedChecksum {
                digest,
                strategy: ChecksumStrategy::ChecksumFile(candidate.name.clone()),
            });
        }
    }

    // Priority 4: download and hash
    let url = asset
        .download_url
        .as_deref()
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ChecksumError::NoDownloadUrl(asset.name.clone()))?;
    let digest = download_and_hash(client, url).await?;
    Ok(ResolvedChecksum {
        digest,
        strategy: ChecksumStrategy::Download,
    })
}

/// True for asset names that look like checksum listings.
pub fn looks_like_checksum_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("sha") || lower.contains("checksum")
}

/// Fetch a checksum listing and look up `asset_filename` in it.
///
/// Network and parse failures are logged and reported as a miss.
async fn digest_from_listing(
    client: &Client,
    listing: &AssetInfo,
    asset_filename: &str,
    allow_bare: bool,
) -> Option<Sha256Digest> {
    let url = listing.download_url.as_deref().filter(|u| !u.is_empty())?;
    debug!("fetching checksums from {url}");
    let text = match fetch_text(client, url).await {
        Ok(text) => text,
        Err(e) => {
            warn!("failed to fetch {}: {e}", listing.name);
            return None;
        }
    };
    let found = scan_text_for_hash(&text, asset_filename, allow_bare);
    if found.is_none() {
        debug!("{} has no entry for {asset_filename}", listing.name);
    }
    found
}

/// Stream-download `url` and compute its SHA-256.
///
/// # Errors
///
/// Returns the underlying HTTP error on connection failure, timeout or a
/// non-2xx status.
pub async fn download_and_hash(client: &Client, url: &str) -> Result<Sha256Digest, ChecksumError> {
    debug!("downloading {url} to hash it");
    let mut resp = client
        .get(url)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?
        .error_for_status()?;
    let mut hasher = Sha256::new();
    while let Some(chunk) = resp.chunk().await? {
        hasher.update(&chunk);
    }
    Ok(sha256_from_hasher(hasher))
}

fn sha256_from_hasher(hasher: Sha256) -> Sha256Digest {
    let bytes: [u8; 32] = hasher.finalize().into();
    Sha256Digest::from_bytes(&bytes)
}

/// Find the hash paired with `asset_filename` in a checksum listing.
///
/// Understands `<hash>  <file>`, `<hash> *<file>`, `<file> <hash>`,
/// `<hash>: <file>` and BSD-style `SHA256 (<file>) = <hash>` lines. With
/// `allow_bare`, a listing that is only a hash (a sidecar file) matches too.
pub fn scan_text_for_hash(text: &str, asset_filename: &str, allow_bare: bool) -> Option<Sha256Digest> {
    let text = text.trim();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(hash) = parse_bsd_line(line, asset_filename) {
            return Some(hash);
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [single] if allow_bare => {
                if let Ok(hash) = Sha256Digest::new(*single) {
                    return Some(hash);
                }
            }
            [first, rest @ ..] if !rest.is_empty() => {
                if let Some(hash) = find_hash_in_parts(first, rest, asset_filename) {
                    return Some(hash);
                }
                // Check if reversed (filename hash)
                let last = parts[parts.len() - 1];
                let head = &parts[..parts.len() - 1];
                if head.iter().any(|f| file_matches(f, asset_filename)) {
                    if let Ok(hash) = Sha256Digest::new(last) {
                        return Some(hash);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

fn find_hash_in_parts(hash: &str, files: &[&str], asset_filename: &str) -> Option<Sha256Digest> {
    // Check for common separators like ':' at the end of the hash
    let hash = Sha256Digest::new(hash.trim_end_matches(':')).ok()?;
    files
        .iter()
        .any(|f| file_matches(f, asset_filename))
        .then_some(hash)
}

fn parse_bsd_line(line: &str, asset_filename: &str) -> Option<Sha256Digest> {
    let rest = line.strip_prefix("SHA256 (")?;
    let (file, hash) = rest.split_once(") = ")?;
    if file_matches(file, asset_filename) {
        Sha256Digest::new(hash).ok()
    } else {
        None
    }
}

fn file_matches(candidate: &str, asset_filename: &str) -> bool {
    let file = candidate.trim_start_matches('*');
    file == asset_filename || file.ends_with(&format!("/{asset_filename}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const HASH_A: &str = "a8f5f167f44f4964e6c998dee827110c976e3f55c5ec3ce2332e98c96ec7263b";
    const HASH_B: &str = "1234567890abcdef1234567890abcdef1234567890abcdef1234567890abcdef";
    // sha256("hello world")
    const HELLO_SHA: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    fn asset(name: &str, url: String, digest: Option<&str>) -> AssetInfo {
        AssetInfo {
            name: name.to_string(),
            download_url: Some(url),
            digest: digest.map(String::from),
        }
    }

    #[test]
    fn test_scan_text_for_hash() {
        let text = format!(
            "
            not a hash
            {HASH_A}  test.tar.gz
            invalid_hash  other.tar.gz
            {HASH_B} *dist/other.zip
        "
        );
        assert_eq!(
            scan_text_for_hash(&text, "test.tar.gz", false).map(|d| d.to_string()),
            Some(HASH_A.to_string())
        );
        assert_eq!(
            scan_text_for_hash(&text, "other.zip", false).map(|d| d.to_string()),
            Some(HASH_B.to_string())
        );
        assert_eq!(scan_text_for_hash(&text, "test.tar", false), None);
        assert_eq!(scan_text_for_hash(&text, "missing.tar.gz", false), None);
    }

    #[test]
    fn scan_handles_reversed_and_bsd_lines() {
        let reversed = format!("tool.zip {HASH_A}\n");
        assert_eq!(
            scan_text_for_hash(&reversed, "tool.zip", false).map(|d| d.to_string()),
            Some(HASH_A.to_string())
        );

        let bsd = format!("SHA256 (tool.tar.gz) = {HASH_B}\n");
        assert_eq!(
            scan_text_for_hash(&bsd, "tool.tar.gz", false).map(|d| d.to_string()),
            Some(HASH_B.to_string())
        );
    }

    #[test]
    fn bare_hash_only_accepted_for_sidecars() {
        let bare = format!("{}\n", HASH_A.to_uppercase());
        assert_eq!(
            scan_text_for_hash(&bare, "tool.tar.gz", true).map(|d| d.to_string()),
            Some(HASH_A.to_string())
        );
        assert_eq!(scan_text_for_hash(&bare, "tool.tar.gz", false), None);
    }

    #[test]
    fn checksum_file_detection() {
        assert!(looks_like_checksum_file("checksums.txt"));
        assert!(looks_like_checksum_file("SHA256SUMS"));
        assert!(looks_like_checksum_file("tool.tar.gz.sha256"));
        assert!(!looks_like_checksum_file("tool.tar.gz"));
    }

    #[tokio::test]
    async fn inline_digest_wins_without_network() {
        let mut server = Server::new_async().await;
        let sidecar = server
            .mock("GET", "/tool.tar.gz.sha256")
            .expect(0)
            .create_async()
            .await;
        let download = server
            .mock("GET", "/tool.tar.gz")
            .expect(0)
            .create_async()
            .await;

        let target = asset(
            "tool.tar.gz",
            format!("{}/tool.tar.gz", server.url()),
            Some(&format!("sha256:{HASH_A}")),
        );
        let release = ReleaseInfo {
            tag_name: Some("v1.0.0".into()),
            assets: vec![
                target.clone(),
                asset(
                    "tool.tar.gz.sha256",
                    format!("{}/tool.tar.gz.sha256", server.url()),
                    None,
                ),
            ],
        };

        let client = Client::new();
        let resolved = resolve_checksum(&client, &release, &target).await.unwrap();
        assert_eq!(resolved.digest.as_str(), HASH_A);
        assert_eq!(resolved.strategy, ChecksumStrategy::Inline);

        sidecar.assert_async().await;
        download.assert_async().await;
    }

    #[tokio::test]
    async fn sidecar_preferred_over_download() {
        let mut server = Server::new_async().await;
        let sidecar = server
            .mock("GET", "/tool.tar.gz.sha256sum")
            .with_status(200)
            .with_body(format!("{HASH_B}  tool.tar.gz\n"))
            .create_async()
            .await;
        let download = server
            .mock("GET", "/tool.tar.gz")
            .expect(0)
            .create_async()
            .await;

        let target = asset("tool.tar.gz", format!("{}/tool.tar.gz", server.url()), None);
        let release = ReleaseInfo {
            tag_name: Some("v1.0.0".into()),
            assets: vec![
                target.clone(),
                asset(
                    "tool.tar.gz.sha256sum",
                    format!("{}/tool.tar.gz.sha256sum", server.url()),
                    None,
                ),
            ],
        };

        let resolved = resolve_checksum(&Client::new(), &release, &target)
            .await
            .unwrap();
        assert_eq!(resolved.digest.as_str(), HASH_B);
        assert_eq!(
            resolved.strategy,
            ChecksumStrategy::Sidecar("tool.tar.gz.sha256sum".into())
        );
        sidecar.assert_async().await;
        download.assert_async().await;
    }

    #[tokio::test]
    async fn failing_sidecar_falls_through_to_checksum_listing() {
        let mut server = Server::new_async().await;
        let _sidecar = server
            .mock("GET", "/tool.tar.gz.sha256")
            .with_status(500)
            .create_async()
            .await;
        let _listing = server
            .mock("GET", "/checksums.txt")
            .with_status(200)
            .with_body(format!("{HASH_B}  other.tar.gz\n{HASH_A}  tool.tar.gz\n"))
            .create_async()
            .await;
        let download = server
            .mock("GET", "/tool.tar.gz")
            .expect(0)
            .create_async()
            .await;

        let target = asset("tool.tar.gz", format!("{}/tool.tar.gz", server.url()), None);
        let release = ReleaseInfo {
            tag_name: Some("v1.0.0".into()),
            assets: vec![
                target.clone(),
                asset(
                    "tool.tar.gz.sha256",
                    format!("{}/tool.tar.gz.sha256", server.url()),
                    None,
                ),
                asset("checksums.txt", format!("{}/checksums.txt", server.url()), None),
            ],
        };

        let resolved = resolve_checksum(&Client::new(), &release, &target)
            .await
            .unwrap();
        assert_eq!(resolved.digest.as_str(), HASH_A);
        assert_eq!(
            resolved.strategy,
            ChecksumStrategy::ChecksumFile("checksums.txt".into())
        );
        download.assert_async().await;
    }

    #[tokio::test]
    async fn downloads_when_nothing_else_found() {
        let mut server = Server::new_async().await;
        let download = server
            .mock("GET", "/tool.tar.gz")
            .with_status(200)
            .with_body("hello world")
            .expect(1)
            .create_async()
            .await;

        let target = asset(
            "tool.tar.gz",
            format!("{}/tool.tar.gz", server.url()),
            Some("sha512:deadbeef"),
        );
        let release = ReleaseInfo {
            tag_name: Some("v1.0.0".into()),
            assets: vec![target.clone(), asset("README.md", server.url(), None)],
        };

        let resolved = resolve_checksum(&Client::new(), &release, &target)
            .await
            .unwrap();
        assert_eq!(resolved.digest.as_str(), HELLO_SHA);
        assert_eq!(resolved.strategy, ChecksumStrategy::Download);
        download.assert_async().await;
    }

    #[tokio::test]
    async fn download_failure_is_an_error() {
        let mut server = Server::new_async().await;
        let _download = server
            .mock("GET", "/tool.tar.gz")
            .with_status(404)
            .create_async()
            .await;

        let target = asset("tool.tar.gz", format!("{}/tool.tar.gz", server.url()), None);
        let release = ReleaseInfo {
            tag_name: Some("v1.0.0".into()),
            assets: vec![target.clone()],
        };

        let err = resolve_checksum(&Client::new(), &release, &target)
            .await
            .unwrap_err();
        assert!(matches!(err, ChecksumError::Http(_)));

        let no_url = AssetInfo {
            name: "x".into(),
            download_url: None,
            digest: None,
        };
        let err = resolve_checksum(&Client::new(), &release, &no_url)
            .await
            .unwrap_err();
        assert!(matches!(err, ChecksumError::NoDownloadUrl(_)));
    }
}
