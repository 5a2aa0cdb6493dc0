//! SHA-256 digest newtype shared by the checksum resolver and recipe editor.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Error returned when a string is not a usable SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid SHA256 digest: {reason} in '{input}'")]
pub struct InvalidDigest {
    /// The rejected input, as given.
    pub input: String,
    /// Short description of what was wrong with it.
    pub reason: &'static str,
}

/// A validated SHA256 digest (64 lowercase hex characters).
///
/// Every checksum written into a recipe goes through this type, so a value
/// that reaches the YAML has always been validated and normalized. Invalid
/// candidates from checksum files or API fields are rejected here and the
/// caller moves on to its next source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Sha256Digest(String);

impl Sha256Digest {
    /// Create a new `Sha256Digest`, validating the input.
    ///
    /// Accepts strings with or without a `sha256:` prefix. Surrounding
    /// whitespace is ignored and the stored value is lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidDigest`] if the hex portion is not exactly 64 ASCII
    /// hex characters.
    pub fn new(s: impl Into<String>) -> Result<Self, InvalidDigest> {
        let s = s.into();
        let trimmed = s.trim();
        let hex = strip_algorithm_prefix(trimmed).unwrap_or(trimmed);

        if hex.len() != 64 {
            return Err(InvalidDigest {
                input: s,
                reason: "expected 64 hex characters",
            });
        }

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidDigest {
                input: s,
                reason: "contains non-hex characters",
            });
        }

        Ok(Self(hex.to_ascii_lowercase()))
    }

    /// Parse a content-addressed value of the form `sha256:<hex>`.
    ///
    /// Release APIs label digests with their algorithm. Anything that is not
    /// explicitly SHA-256 (a bare hex string, `sha512:...`) yields `None`.
    pub fn from_prefixed(s: &str) -> Option<Self> {
        let hex = strip_algorithm_prefix(s.trim())?;
        Self::new(hex).ok()
    }

    /// Wrap a raw 32-byte hash output. Infallible: the hex encoding of 32
    /// bytes is always a valid digest.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Get the digest as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Strip a case-insensitive `sha256:` (or `sha-256:`) label.
fn strip_algorithm_prefix(s: &str) -> Option<&str> {
    let lower = s.to_ascii_lowercase();
    ["sha256:", "sha-256:"]
        .iter()
        .find(|p| lower.starts_with(*p))
        .map(|p| s[p.len()..].trim_start())
}

impl<'de> Deserialize<'de> for Sha256Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sha256Digest {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Sha256Digest {
    type Err = InvalidDigest;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
