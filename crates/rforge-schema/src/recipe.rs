//! The recipe document: a `rattler-build` recipe as read from and written
//! back to YAML.
//!
//! Only a handful of fields are interpreted (`context.version`,
//! `package.name`, `about.repository`, `extra.vendor-manifest`, `source`).
//! The rest of the document is carried through untouched and in its original
//! key order, so a rewrite only changes the fields the updater sets.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::SCHEMA_HEADER;
use crate::hash::Sha256Digest;
use crate::platform::PlatformPredicate;

/// Errors raised while reading or editing a recipe document.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// The text is not valid YAML.
    #[error("Parse error: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// The document could not be serialized back to YAML.
    #[error("Serialize error: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// The top level of the document is not a mapping.
    #[error("recipe root is not a mapping")]
    NotAMapping,

    /// A source location no longer points at a mapping with a `url`.
    #[error("no source item at {0}")]
    MissingSource(SourceLocation),
}

/// Where a source item lives inside the `source` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    entry: Option<usize>,
    branch: Branch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    /// The entry itself carries `url`/`sha256`.
    Direct,
    /// The item sits under the entry's `then`, at an index when `then` is a list.
    Then(Option<usize>),
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source")?;
        if let Some(i) = self.entry {
            write!(f, "[{i}]")?;
        }
        match self.branch {
            Branch::Direct => Ok(()),
            Branch::Then(None) => write!(f, ".then"),
            Branch::Then(Some(i)) => write!(f, ".then[{i}]"),
        }
    }
}

/// A URL-bearing source item together with the selector that guards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    /// Position of the item in the document, for writing the checksum back.
    pub location: SourceLocation,
    /// The `if:` selector of the enclosing entry (empty when unconditional).
    pub predicate: PlatformPredicate,
    /// The declared URL, usually containing a `${{ version }}` placeholder.
    pub url: String,
    /// The currently pinned checksum, if any.
    pub sha256: Option<String>,
}

/// A parsed recipe document.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    doc: Value,
}

impl Recipe {
    /// Parse a recipe from YAML text.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::Parse`] for invalid YAML and
    /// [`RecipeError::NotAMapping`] when the document root is not a mapping.
    pub fn parse(text: &str) -> Result<Self, RecipeError> {
        let doc: Value = serde_yaml::from_str(text).map_err(RecipeError::Parse)?;
        if !doc.is_mapping() {
            return Err(RecipeError::NotAMapping);
        }
        Ok(Self { doc })
    }

    /// The pinned version from `context.version`.
    ///
    /// Numeric YAML scalars (`version: 1.2`) are returned in string form.
    pub fn version(&self) -> Option<String> {
        match self.doc.get("context")?.get("version")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Set `context.version`, creating `context` if needed.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::NotAMapping`] if the document root is not a mapping.
    pub fn set_version(&mut self, version: &str) -> Result<(), RecipeError> {
        let root = self.doc.as_mapping_mut().ok_or(RecipeError::NotAMapping)?;
        let has_context = root.get("context").is_some_and(Value::is_mapping);
        if !has_context {
            root.insert(Value::from("context"), Value::Mapping(Mapping::new()));
        }
        if let Some(Value::Mapping(context)) = root.get_mut("context") {
            context.insert(Value::from("version"), Value::from(version));
        }
        Ok(())
    }

    /// `package.name`.
    pub fn package_name(&self) -> Option<&str> {
        self.doc.get("package")?.get("name")?.as_str()
    }

    /// `about.repository`, the upstream project URL.
    pub fn repository(&self) -> Option<&str> {
        self.doc.get("about")?.get("repository")?.as_str()
    }

    /// `extra.vendor-manifest`, the base URL of a vendor release bucket.
    pub fn vendor_manifest(&self) -> Option<&str> {
        self.doc
            .get("extra")?
            .get("vendor-manifest")?
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Every source item that declares a `url`, in document order.
    ///
    /// `source` may be a single mapping or a list; each entry is either a
    /// plain `{url, sha256}` item or a conditional `{if, then}` whose `then`
    /// is a list of items (or a single item).
    pub fn source_items(&self) -> Vec<SourceItem> {
        let mut items = Vec::new();
        match self.doc.get("source") {
            Some(Value::Sequence(entries)) => {
                for (i, entry) in entries.iter().enumerate() {
                    collect_entry(entry, Some(i), &mut items);
                }
            }
            Some(entry @ Value::Mapping(_)) => collect_entry(entry, None, &mut items),
            _ => {}
        }
        items
    }

    /// Write a checksum into the source item at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::MissingSource`] if `location` does not point at
    /// a mapping (the document was edited since the items were listed).
    pub fn set_sha256(
        &mut self,
        location: SourceLocation,
        digest: &Sha256Digest,
    ) -> Result<(), RecipeError> {
        let item = self
            .item_mut(location)
            .and_then(Value::as_mapping_mut)
            .ok_or(RecipeError::MissingSource(location))?;
        item.insert(Value::from("sha256"), Value::from(digest.as_str()));
        Ok(())
    }

    /// Serialize the document with the schema header on the first line.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeError::Serialize`] if YAML serialization fails.
    pub fn render(&self) -> Result<String, RecipeError> {
        let body = serde_yaml::to_string(&self.doc).map_err(RecipeError::Serialize)?;
        Ok(format!("{SCHEMA_HEADER}\n{body}"))
    }

    fn item_mut(&mut self, location: SourceLocation) -> Option<&mut Value> {
        let source = self.doc.get_mut("source")?;
        let entry = match location.entry {
            Some(i) => source.get_mut(i)?,
            None => source,
        };
        match location.branch {
            Branch::Direct => Some(entry),
            Branch::Then(None) => entry.get_mut("then"),
            Branch::Then(Some(i)) => entry.get_mut("then")?.get_mut(i),
        }
    }
}

fn collect_entry(entry: &Value, index: Option<usize>, out: &mut Vec<SourceItem>) {
    let Some(map) = entry.as_mapping() else {
        return;
    };

    let Some(then) = map.get("then") else {
        push_item(
            entry,
            SourceLocation {
                entry: index,
                branch: Branch::Direct,
            },
            &PlatformPredicate::unconditional(),
            out,
        );
        return;
    };

    let predicate = PlatformPredicate::parse(map.get("if").and_then(Value::as_str).unwrap_or(""));
    match then {
        Value::Sequence(items) => {
            for (i, item) in items.iter().enumerate() {
                let location = SourceLocation {
                    entry: index,
                    branch: Branch::Then(Some(i)),
                };
                push_item(item, location, &predicate, out);
            }
        }
        Value::Mapping(_) => {
            let location = SourceLocation {
                entry: index,
                branch: Branch::Then(None),
            };
            push_item(then, location, &predicate, out);
        }
        _ => {}
    }
}

fn push_item(
    item: &Value,
    location: SourceLocation,
    predicate: &PlatformPredicate,
    out: &mut Vec<SourceItem>,
) {
    let Some(url) = item.get("url").and_then(Value::as_str) else {
        return;
    };
    if url.trim().is_empty() {
        return;
    }
    out.push(SourceItem {
        location,
        predicate: predicate.clone(),
        url: url.to_string(),
        sha256: item.get("sha256").and_then(Value::as_str).map(String::from),
    });
}
