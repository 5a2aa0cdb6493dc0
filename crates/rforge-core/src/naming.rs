//! Expected release-asset filenames per platform.
//!
//! Upstream projects name their release archives however they like, and no
//! general grammar covers them. Resolution therefore goes, in order:
//!
//! 1. [`NAMING_CONVENTIONS`]: an explicit per-project table, grown one
//!    project at a time.
//! 2. The recipe's own URL template with the version substituted, when no
//!    other placeholder is left in it.
//! 3. For an unconditional source, the last path segment of the URL as
//!    written.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use rforge_schema::{ArchVariant, OsVariant, PlatformPredicate, SourceItem};

/// One row of the naming table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingConvention {
    /// Upstream project identifier (the repository name), matched case-insensitively.
    pub project: &'static str,
    /// Operating system the predicate must mention.
    pub os: OsVariant,
    /// Architecture the predicate must mention.
    pub arch: ArchVariant,
    /// Asset filename; `{version}` is replaced by the version without its `v`.
    pub template: &'static str,
}

impl NamingConvention {
    const fn new(
        project: &'static str,
        os: OsVariant,
        arch: ArchVariant,
        template: &'static str,
    ) -> Self {
        Self {
            project,
            os,
            arch,
            template,
        }
    }

    /// Render the filename for `version`.
    pub fn render(&self, version: &str) -> String {
        self.template.replace("{version}", version)
    }
}

use ArchVariant::{Arm64, X86_64};
use OsVariant::{Linux, MacOS};

/// Known per-project asset naming conventions.
pub const NAMING_CONVENTIONS: &[NamingConvention] = &[
    // hatchet_<version>_<OS>_<ARCH>.tar.gz
    NamingConvention::new("hatchet", Linux, X86_64, "hatchet_{version}_Linux_x86_64.tar.gz"),
    NamingConvention::new("hatchet", Linux, Arm64, "hatchet_{version}_Linux_arm64.tar.gz"),
    NamingConvention::new("hatchet", MacOS, X86_64, "hatchet_{version}_Darwin_x86_64.tar.gz"),
    NamingConvention::new("hatchet", MacOS, Arm64, "hatchet_{version}_Darwin_arm64.tar.gz"),
    // copilot-<os>-<arch>.tar.gz, unversioned
    NamingConvention::new("copilot-cli", Linux, X86_64, "copilot-linux-x64.tar.gz"),
    NamingConvention::new("copilot-cli", Linux, Arm64, "copilot-linux-arm64.tar.gz"),
    NamingConvention::new("copilot-cli", MacOS, X86_64, "copilot-darwin-x64.tar.gz"),
    NamingConvention::new("copilot-cli", MacOS, Arm64, "copilot-darwin-arm64.tar.gz"),
    // opencode ships zips for macOS
    NamingConvention::new("opencode", Linux, X86_64, "opencode-linux-x64.tar.gz"),
    NamingConvention::new("opencode", Linux, Arm64, "opencode-linux-arm64.tar.gz"),
    NamingConvention::new("opencode", MacOS, X86_64, "opencode-darwin-x64.zip"),
    NamingConvention::new("opencode", MacOS, Arm64, "opencode-darwin-arm64.zip"),
    // radar_v<version>_<os>_<arch>.tar.gz
    NamingConvention::new("radar", Linux, X86_64, "radar_v{version}_linux_amd64.tar.gz"),
    NamingConvention::new("radar", Linux, Arm64, "radar_v{version}_linux_arm64.tar.gz"),
    NamingConvention::new("radar", MacOS, X86_64, "radar_v{version}_darwin_amd64.tar.gz"),
    NamingConvention::new("radar", MacOS, Arm64, "radar_v{version}_darwin_arm64.tar.gz"),
];

static VERSION_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{\s*version\s*\}\}").expect("version placeholder regex is valid")
});

/// Which rule produced an asset name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameSource {
    /// A [`NAMING_CONVENTIONS`] row.
    Convention,
    /// The recipe URL with the version substituted.
    UrlTemplate,
    /// The literal last segment of an unconditional source URL.
    LiteralUrl,
}

/// Look up the naming table for `project` and the predicate's OS/arch.
pub fn conventional_asset_name(
    project: Option<&str>,
    predicate: &PlatformPredicate,
    version: &str,
) -> Option<String> {
    let project = project?;
    let (os, arch) = (predicate.os()?, predicate.arch()?);
    NAMING_CONVENTIONS
        .iter()
        .find(|c| c.project.eq_ignore_ascii_case(project) && c.os == os && c.arch == arch)
        .map(|c| c.render(version))
}

/// Substitute `version` into a `${{ version }}` URL template and return its filename.
///
/// Returns `None` when any other `{...}` placeholder survives substitution:
/// guessing a value for an unknown variable would point at the wrong file.
pub fn asset_name_from_template(url: &str, version: &str) -> Option<String> {
    let resolved = VERSION_PLACEHOLDER.replace_all(url.trim(), NoExpand(version));
    if resolved.contains('{') {
        return None;
    }
    asset_name_from_url(&resolved)
}

/// The trailing path segment of a URL, ignoring any query or fragment.
pub fn asset_name_from_url(url: &str) -> Option<String> {
    let path = url.trim().split(['?', '#']).next()?;
    let (prefix, name) = path.rsplit_once('/')?;
    // "https://host" has no path segment to take.
    if name.is_empty() || prefix.ends_with('/') {
        return None;
    }
    Some(name.to_string())
}

/// Resolve the expected asset filename for one recipe source item.
pub fn resolve_asset_name(
    item: &SourceItem,
    version: &str,
    project: Option<&str>,
) -> Option<(String, NameSource)> {
    if let Some(name) = conventional_asset_name(project, &item.predicate, version) {
        return Some((name, NameSource::Convention));
    }
    if let Some(name) = asset_name_from_template(&item.url, version) {
        return Some((name, NameSource::UrlTemplate));
    }
    if item.predicate.is_unconditional() {
        return asset_name_from_url(&item.url).map(|n| (n, NameSource::LiteralUrl));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rforge_schema::Recipe;

    fn item(predicate: &str, url: &str) -> SourceItem {
        let yaml = if predicate.is_empty() {
            format!("source:\n  url: \"{url}\"\n")
        } else {
            format!("source:\n  - if: {predicate}\n    then:\n      - url: \"{url}\"\n")
        };
        Recipe::parse(&yaml).unwrap().source_items().remove(0)
    }

    #[test]
    fn convention_table_linux_x86_64() {
        let p = PlatformPredicate::parse("linux and x86_64");
        assert_eq!(
            conventional_asset_name(Some("hatchet"), &p, "0.70.1").as_deref(),
            Some("hatchet_0.70.1_Linux_x86_64.tar.gz")
        );
        assert_eq!(
            conventional_asset_name(Some("Radar"), &p, "1.2.0").as_deref(),
            Some("radar_v1.2.0_linux_amd64.tar.gz")
        );
        assert_eq!(
            conventional_asset_name(Some("copilot-cli"), &p, "0.0.330").as_deref(),
            Some("copilot-linux-x64.tar.gz")
        );
    }

    #[test]
    fn convention_table_accepts_aarch64_spelling() {
        let p = PlatformPredicate::parse("linux and aarch64");
        assert_eq!(
            conventional_asset_name(Some("opencode"), &p, "1.0.0").as_deref(),
            Some("opencode-linux-arm64.tar.gz")
        );
        let p = PlatformPredicate::parse("osx and arm64");
        assert_eq!(
            conventional_asset_name(Some("opencode"), &p, "1.0.0").as_deref(),
            Some("opencode-darwin-arm64.zip")
        );
    }

    #[test]
    fn convention_table_misses() {
        let p = PlatformPredicate::parse("linux and x86_64");
        assert_eq!(conventional_asset_name(Some("unknown"), &p, "1.0"), None);
        assert_eq!(conventional_asset_name(None, &p, "1.0"), None);
        let win = PlatformPredicate::parse("win and x86_64");
        assert_eq!(conventional_asset_name(Some("hatchet"), &win, "1.0"), None);
    }

    #[test]
    fn template_substitutes_version() {
        let url = "https://github.com/o/tool/releases/download/v${{ version }}/tool_${{version}}_linux_amd64.tar.gz";
        assert_eq!(
            asset_name_from_template(url, "2.3.4").as_deref(),
            Some("tool_2.3.4_linux_amd64.tar.gz")
        );
    }

    #[test]
    fn template_with_other_placeholder_yields_nothing() {
        let url = "https://github.com/o/tool/releases/download/v${{ version }}/tool-${{ target }}.tar.gz";
        assert_eq!(asset_name_from_template(url, "2.3.4"), None);
    }

    #[test]
    fn url_trailing_segment() {
        assert_eq!(
            asset_name_from_url("https://example.com/dl/gemini.js?raw=1").as_deref(),
            Some("gemini.js")
        );
        assert_eq!(asset_name_from_url("https://example.com"), None);
        assert_eq!(asset_name_from_url("https://example.com/dir/"), None);
    }

    #[test]
    fn resolution_order() {
        let conditional = item(
            "linux and x86_64",
            "https://github.com/h/hatchet/releases/download/v${{ version }}/whatever.tar.gz",
        );
        assert_eq!(
            resolve_asset_name(&conditional, "0.1.0", Some("hatchet")),
            Some((
                "hatchet_0.1.0_Linux_x86_64.tar.gz".to_string(),
                NameSource::Convention
            ))
        );
        assert_eq!(
            resolve_asset_name(&conditional, "0.1.0", Some("other")),
            Some(("whatever.tar.gz".to_string(), NameSource::UrlTemplate))
        );
    }

    #[test]
    fn unconditional_source_returns_segment_unchanged() {
        let single = item("", "https://github.com/o/cli/releases/download/v1.0.0/cli.js");
        assert_eq!(
            resolve_asset_name(&single, "1.0.0", Some("cli")),
            Some(("cli.js".to_string(), NameSource::UrlTemplate))
        );

        let literal = item("", "https://example.com/${{ channel }}/cli-bundle.js");
        assert_eq!(
            resolve_asset_name(&literal, "1.0.0", Some("cli")),
            Some((
                "cli-bundle.js".to_string(),
                NameSource::LiteralUrl
            ))
        );
    }

    #[test]
    fn conditional_with_unknown_placeholder_is_unresolved() {
        let conditional = item(
            "linux and x86_64",
            "https://example.com/${{ target }}/tool.tar.gz",
        );
        assert_eq!(resolve_asset_name(&conditional, "1.0.0", Some("tool")), None);
    }
}
