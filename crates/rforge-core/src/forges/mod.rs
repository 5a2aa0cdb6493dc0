//! Upstream release sources.

/// GitHub releases API adapter.
pub mod github;
/// Shared traits and types for release sources.
pub mod traits;
/// Vendor-hosted release manifests.
pub mod vendor;

pub use github::{GitHubSource, parse_owner_repo};
pub use vendor::VendorSource;
