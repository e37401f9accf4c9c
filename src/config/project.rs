//! Project manifest description (manifest.toml)
//!
//! Describes a manifest the way a build would configure it: main attributes,
//! named sections and ordered merge sources, plus optional `[format]` and
//! `[merge]` tables that form layer 3 of the tool configuration.
//!
//! ```toml
//! [attributes]
//! Implementation-Title = "demo"
//! Implementation-Version = "1.2.0"
//!
//! [sections.demo-api]
//! Sealed = true
//!
//! [[from]]
//! path = "base.mf"
//! include_sections = ["demo-api"]
//! override = false
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::effective::ConfigError;
use super::merge::toml_to_json;
use crate::attributes::{AttrValue, AttributeError};
use crate::error::{ManifestError, Scope};
use crate::manifest::Manifest;
use crate::merge::{MergeSpec, SourceLocation};

fn default_override() -> bool {
    true
}

/// One `[[from]]` merge source
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FromEntry {
    /// Location of the manifest to merge, relative to the project file
    pub path: String,

    /// Sections to merge (default: all)
    #[serde(default)]
    pub include_sections: Option<Vec<String>>,

    /// Sections never merged from this source
    #[serde(default)]
    pub exclude_sections: Vec<String>,

    /// Keys dropped from this source
    #[serde(default)]
    pub exclude_keys: Vec<String>,

    /// Whether this source overrides existing values (default: true)
    #[serde(default = "default_override", rename = "override")]
    pub override_on_collision: bool,
}

impl FromEntry {
    pub fn to_spec(&self) -> MergeSpec {
        let mut spec = MergeSpec::new();
        if let Some(ref sections) = self.include_sections {
            spec = spec.include_only(sections.iter().cloned());
        }
        for section in &self.exclude_sections {
            spec = spec.exclude_section(section.clone());
        }
        for key in &self.exclude_keys {
            spec = spec.exclude_key(key.clone());
        }
        if !self.override_on_collision {
            spec = spec.keep_existing();
        }
        spec
    }
}

/// Parsed manifest.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    /// Format settings (config layer 3)
    #[serde(default)]
    pub format: Option<toml::Table>,

    /// Merge settings (config layer 3)
    #[serde(default)]
    pub merge: Option<toml::Table>,

    /// Main attributes, in document order
    #[serde(default)]
    pub attributes: IndexMap<String, toml::Value>,

    /// Named sections, in document order
    #[serde(default)]
    pub sections: IndexMap<String, IndexMap<String, toml::Value>>,

    /// Merge sources in registration order
    #[serde(default)]
    pub from: Vec<FromEntry>,

    /// File this project was loaded from
    #[serde(skip)]
    pub path: Option<PathBuf>,

    /// SHA-256 digest of the raw file bytes
    #[serde(skip)]
    pub digest: Option<String>,
}

impl ProjectFile {
    /// Load and parse a project file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;
        let mut project = Self::from_str(&contents)?;
        project.path = Some(path.to_path_buf());
        project.digest = Some(digest);
        Ok(project)
    }

    /// Parse a project from a TOML string
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))
    }

    /// Directory relative `[[from]]` paths resolve against
    pub fn base_dir(&self) -> Option<&Path> {
        self.path.as_deref().and_then(Path::parent)
    }

    /// The `[format]` and `[merge]` tables as a config layer
    pub fn config_layer(&self) -> Option<Value> {
        let mut layer = serde_json::Map::new();
        if let Some(ref format) = self.format {
            layer.insert("format".to_string(), toml_to_json(toml::Value::Table(format.clone())));
        }
        if let Some(ref merge) = self.merge {
            layer.insert("merge".to_string(), toml_to_json(toml::Value::Table(merge.clone())));
        }
        if layer.is_empty() {
            None
        } else {
            Some(Value::Object(layer))
        }
    }

    /// Add this project's attributes, sections and merge sources to
    /// `manifest`.
    pub fn apply_to(&self, manifest: &mut Manifest) -> Result<(), ManifestError> {
        if !self.attributes.is_empty() {
            manifest.attributes(to_attr_values(&Scope::Main, &self.attributes)?)?;
        }
        for (name, attrs) in &self.sections {
            manifest.section_attributes(to_attr_values(&Scope::section(name), attrs)?, name)?;
        }
        for entry in &self.from {
            manifest.merge_from_with(SourceLocation::new(entry.path.clone()), entry.to_spec());
        }
        Ok(())
    }
}

/// Strings are concrete text; other scalars render through their display
/// form at merge time. Arrays and tables are not attribute values.
fn to_attr_values(
    scope: &Scope,
    attrs: &IndexMap<String, toml::Value>,
) -> Result<Vec<(String, AttrValue)>, ManifestError> {
    attrs
        .iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => AttrValue::text(s.clone()),
                toml::Value::Integer(i) => AttrValue::display(*i),
                toml::Value::Float(f) => AttrValue::display(*f),
                toml::Value::Boolean(b) => AttrValue::display(*b),
                toml::Value::Datetime(dt) => AttrValue::display(dt.clone()),
                toml::Value::Array(_) | toml::Value::Table(_) => {
                    return Err(ManifestError::attribute(
                        scope.clone(),
                        AttributeError::InvalidValue {
                            key: key.clone(),
                            reason: "arrays and tables are not attribute values".to_string(),
                        },
                    ));
                }
            };
            Ok((key.clone(), value))
        })
        .collect()
}
