//! Effective configuration with full provenance
//!
//! The effective config captures the merged settings plus information about
//! where each layer came from.

use manifest_format::{FormatOptions, LineEnding};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::{merge_layers, toml_to_json};
use super::project::ProjectFile;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    User,
    Project,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    /// Origin of this source
    pub origin: ConfigOrigin,

    /// File path (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for builtin/cli)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Typed view of the merged settings
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Settings {
    format: FormatSettings,
    merge: MergeSettings,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FormatSettings {
    line_width: usize,
    max_key_length: usize,
    line_ending: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MergeSettings {
    parallel: bool,
}

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    /// Format options for reading and writing manifests
    pub format: FormatOptions,

    /// Resolve merge sources concurrently
    pub parallel: bool,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers
    pub fn build(
        user_config_path: Option<&Path>,
        project: Option<&ProjectFile>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: User config
        if let Some(path) = user_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::User,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 3: Project file
        if let Some(project) = project {
            if let Some(value) = project.config_layer() {
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Project,
                    path: project.path.as_ref().map(|p| p.to_string_lossy().to_string()),
                    digest: project.digest.clone(),
                });
            }
        }

        // Layer 4: CLI overrides
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        let (format, parallel) = Self::validate_config(&merged)?;

        tracing::debug!(
            layers = sources.len(),
            line_width = format.line_width,
            parallel,
            "built effective config"
        );

        Ok(Self {
            format,
            parallel,
            config: merged,
            sources,
        })
    }

    /// Default location of the user config file
    pub fn default_user_config_path() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os("XDG_CONFIG_HOME").filter(|d| !d.is_empty()) {
            return Some(PathBuf::from(dir).join("manifest-merge/config.toml"));
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/manifest-merge/config.toml"))
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        // Compute digest
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        // Parse TOML
        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    /// Validate configuration values
    fn validate_config(config: &Value) -> Result<(FormatOptions, bool), ConfigError> {
        let settings: Settings = serde_json::from_value(config.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        let line_ending = LineEnding::parse(&settings.format.line_ending).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "format.line_ending must be \"crlf\" or \"lf\" (got {:?})",
                settings.format.line_ending
            ))
        })?;

        let format = FormatOptions {
            line_width: settings.format.line_width,
            max_key_length: settings.format.max_key_length,
            line_ending,
        };
        format
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok((format, settings.merge.parallel))
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Get a config value as u64
    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    /// Get a config value as string
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None, None).unwrap();

        assert_eq!(config.format, FormatOptions::default());
        assert!(config.parallel);
        assert_eq!(config.get_u64("format.line_width"), Some(72));
        assert_eq!(config.get_str("format.line_ending"), Some("crlf"));
    }

    #[test]
    fn test_build_with_cli_override() {
        let cli = serde_json::json!({
            "format": {"line_width": 100, "line_ending": "lf"}
        });

        let config = EffectiveConfig::build(None, None, Some(cli)).unwrap();

        assert_eq!(config.format.line_width, 100);
        assert_eq!(config.format.line_ending, LineEnding::Lf);
        assert_eq!(config.format.max_key_length, 70);
    }

    #[test]
    fn test_validation_line_width() {
        let cli = serde_json::json!({
            "format": {"line_width": 3}
        });

        let result = EffectiveConfig::build(None, None, Some(cli));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("line_width"));
    }

    #[test]
    fn test_validation_line_ending() {
        let cli = serde_json::json!({
            "format": {"line_ending": "cr"}
        });

        let result = EffectiveConfig::build(None, None, Some(cli));
        assert!(result.unwrap_err().to_string().contains("line_ending"));
    }

    #[test]
    fn test_unknown_setting_rejected() {
        let cli = serde_json::json!({
            "format": {"line_wdith": 80}
        });

        assert!(EffectiveConfig::build(None, None, Some(cli)).is_err());
    }

    #[test]
    fn test_load_user_toml_file() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[format]").unwrap();
        writeln!(temp, "line_width = 90").unwrap();
        writeln!(temp, "[merge]").unwrap();
        writeln!(temp, "parallel = false").unwrap();

        let config = EffectiveConfig::build(Some(temp.path()), None, None).unwrap();

        assert_eq!(config.format.line_width, 90);
        assert!(!config.parallel);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].origin, ConfigOrigin::User);
        assert_eq!(config.sources[1].digest.as_ref().map(String::len), Some(64));
    }

    #[test]
    fn test_missing_user_file_skipped() {
        let config =
            EffectiveConfig::build(Some(Path::new("/nonexistent/config.toml")), None, None).unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_project_layer_between_user_and_cli() {
        let mut temp = NamedTempFile::new().unwrap();
        writeln!(temp, "[format]\nline_width = 90\nline_ending = \"lf\"").unwrap();
        let project = ProjectFile::from_str("[format]\nline_width = 100\n").unwrap();
        let cli = serde_json::json!({"merge": {"parallel": false}});

        let config = EffectiveConfig::build(Some(temp.path()), Some(&project), Some(cli)).unwrap();

        assert_eq!(config.format.line_width, 100);
        assert_eq!(config.format.line_ending, LineEnding::Lf);
        assert!(!config.parallel);
        let origins: Vec<_> = config.sources.iter().map(|s| s.origin.clone()).collect();
        assert_eq!(
            origins,
            vec![
                ConfigOrigin::Builtin,
                ConfigOrigin::User,
                ConfigOrigin::Project,
                ConfigOrigin::Cli
            ]
        );
    }
}
