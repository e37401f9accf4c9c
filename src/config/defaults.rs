//! Built-in defaults (layer 1)
//!
//! Hardcoded defaults for all configuration values.

use manifest_format::{LineEnding, DEFAULT_LINE_WIDTH, DEFAULT_MAX_KEY_LENGTH};
use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Physical line budget in bytes (default: 72)
    pub line_width: usize,

    /// Maximum key length in bytes (default: 70)
    pub max_key_length: usize,

    /// Line terminator (default: crlf)
    pub line_ending: LineEnding,

    /// Resolve merge sources concurrently (default: true)
    pub parallel: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            line_ending: LineEnding::Crlf,
            parallel: true,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "format": {
                "line_width": self.line_width,
                "max_key_length": self.max_key_length,
                "line_ending": self.line_ending,
            },
            "merge": {
                "parallel": self.parallel
            }
        })
    }
}
