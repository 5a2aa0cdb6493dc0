//! Platform matching for recipe source selectors and build targets.
//! Handles naming inconsistencies across recipes: osx/darwin/macos, arm64/aarch64, etc.

use serde::{Deserialize, Serialize};

/// Operating system named by a platform predicate.
///
/// Recipes and vendors use inconsistent naming (`osx`, `darwin`, `macos`),
/// so every Apple spelling collapses onto [`OsVariant::MacOS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsVariant {
    /// Linux-based operating systems.
    Linux,
    /// Apple macOS (`osx`, `darwin`, `macos`).
    MacOS,
    /// Microsoft Windows.
    Windows,
}

/// CPU architecture named by a platform predicate.
///
/// `arm64`/`aarch64` are the same architecture, as are `x86_64`/`amd64`/`x64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchVariant {
    /// Intel/AMD 64-bit.
    X86_64,
    /// ARM 64-bit.
    Arm64,
}

/// A recipe `if:` selector, with the OS and architecture it mentions.
///
/// The raw text is kept verbatim; `os` and `arch` are keyword matches over
/// it. An empty predicate marks an unconditional source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPredicate {
    raw: String,
    os: Option<OsVariant>,
    arch: Option<ArchVariant>,
}

impl PlatformPredicate {
    /// Classify a selector string such as `linux and x86_64`.
    pub fn parse(raw: &str) -> Self {
        let p = raw.to_lowercase();

        // "darwin" contains "win", so Apple spellings are checked first.
        let os = if p.contains("linux") {
            Some(OsVariant::Linux)
        } else if p.contains("osx") || p.contains("darwin") || p.contains("macos") {
            Some(OsVariant::MacOS)
        } else if p.contains("win") {
            Some(OsVariant::Windows)
        } else {
            None
        };

        let arch = if p.contains("arm64") || p.contains("aarch64") {
            Some(ArchVariant::Arm64)
        } else if p.contains("x86_64") || p.contains("amd64") || p.contains("x64") {
            Some(ArchVariant::X86_64)
        } else {
            None
        };

        Self {
            raw: raw.trim().to_string(),
            os,
            arch,
        }
    }

    /// The predicate used for a source entry without an `if:` selector.
    pub fn unconditional() -> Self {
        Self::parse("")
    }

    /// True when the source applies to every platform.
    pub fn is_unconditional(&self) -> bool {
        self.raw.is_empty()
    }

    /// Operating system mentioned by the predicate, if any.
    pub fn os(&self) -> Option<OsVariant> {
        self.os
    }

    /// Architecture mentioned by the predicate, if any.
    pub fn arch(&self) -> Option<ArchVariant> {
        self.arch
    }

    /// The selector text as written in the recipe.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for PlatformPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.raw.is_empty() {
            write!(f, "<unconditional>")
        } else {
            write!(f, "{}", self.raw)
        }
    }
}

/// A conda target platform ("subdir") such as `linux-64` or `osx-arm64`.
///
/// Passed straight through to the build tool and used to lay out output and
/// generated-recipe directories, so it must be a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetPlatform(String);

impl TargetPlatform {
    /// The platform the builder targets when none is requested.
    pub const DEFAULT: &'static str = "linux-64";

    /// Return the subdir string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TargetPlatform {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl std::fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TargetPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let valid = !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("Invalid target platform: '{s}'"))
        }
    }
}

impl TryFrom<String> for TargetPlatform {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TargetPlatform> for String {
    fn from(p: TargetPlatform) -> Self {
        p.0
    }
}
