//! Shared HTTP client and request timeouts.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;

/// Timeout for metadata fetches (release listings, checksum files, indexes).
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for downloading a release asset to hash it.
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the client used for every request in a run.
///
/// No default timeout is set on the client; each request picks
/// [`METADATA_TIMEOUT`] or [`DOWNLOAD_TIMEOUT`] explicitly.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialized.
pub fn build_client() -> Result<Client> {
    let client = Client::builder().user_agent(crate::USER_AGENT).build()?;
    Ok(client)
}

/// GET `url` and return the body as text, failing on non-success status.
///
/// # Errors
///
/// Returns the underlying [`reqwest::Error`] on connection failure, timeout,
/// or a non-2xx status.
pub async fn fetch_text(client: &Client, url: &str) -> Result<String, reqwest::Error> {
    client
        .get(url)
        .timeout(METADATA_TIMEOUT)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}
