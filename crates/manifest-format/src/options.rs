//! Writer and reader options.

use serde::{Deserialize, Serialize};

use crate::error::FormatError;
use crate::{DEFAULT_LINE_WIDTH, DEFAULT_MAX_KEY_LENGTH, MIN_LINE_WIDTH};

/// Line terminator used by the writer. The reader accepts both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\r\n`, as written by archive tooling.
    Crlf,
    /// `\n`
    Lf,
}

impl LineEnding {
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::Crlf => b"\r\n",
            Self::Lf => b"\n",
        }
    }

    /// Parse a config spelling (`crlf` or `lf`, any case).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "crlf" => Some(Self::Crlf),
            "lf" => Some(Self::Lf),
            _ => None,
        }
    }
}

/// Byte budgets and line terminator of the manifest format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Maximum physical line length in bytes, excluding the terminator
    pub line_width: usize,

    /// Maximum attribute key length in bytes
    pub max_key_length: usize,

    /// Terminator written after every physical line
    pub line_ending: LineEnding,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            line_ending: LineEnding::Crlf,
        }
    }
}

impl FormatOptions {
    pub fn with_line_width(mut self, line_width: usize) -> Self {
        self.line_width = line_width;
        self
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn validate(&self) -> Result<(), FormatError> {
        if self.line_width < MIN_LINE_WIDTH {
            return Err(FormatError::InvalidOptions(format!(
                "line_width must be at least {} (got {})",
                MIN_LINE_WIDTH, self.line_width
            )));
        }
        if self.max_key_length == 0 {
            return Err(FormatError::InvalidOptions(
                "max_key_length must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
