//! Tool configuration
//!
//! Implements the 4-layer configuration merge:
//! 1. Built-in defaults
//! 2. User config ($XDG_CONFIG_HOME/manifest-merge/config.toml)
//! 3. Project file (`[format]` and `[merge]` tables of manifest.toml)
//! 4. CLI flags
//!
//! The project file also carries the manifest content itself: attributes,
//! sections and merge sources.

mod defaults;
mod effective;
mod merge;
mod project;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers, toml_to_json};
pub use project::{FromEntry, ProjectFile};
