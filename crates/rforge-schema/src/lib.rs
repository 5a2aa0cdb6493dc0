//! Shared data model for the rforge recipe toolkit.
//!
//! Everything in this crate is pure: parsing, classification and
//! serialization only. Network and filesystem access live in `rforge-core`.

pub mod hash;
pub mod platform;
pub mod recipe;
pub mod release;

// Re-exports
pub use hash::{InvalidDigest, Sha256Digest};
pub use platform::{ArchVariant, OsVariant, PlatformPredicate, TargetPlatform};
pub use recipe::{Recipe, RecipeError, SourceItem, SourceLocation};
pub use release::{AssetInfo, ReleaseInfo};

/// Comment written as the first line of every recipe this toolkit emits.
///
/// Editors use it to pick up the recipe-format JSON schema.
pub const SCHEMA_HEADER: &str = "# yaml-language-server: $schema=https://raw.githubusercontent.com/prefix-dev/recipe-format/main/schema.json";
