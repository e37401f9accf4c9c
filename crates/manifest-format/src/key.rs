//! Attribute key grammar
//!
//! Keys are ASCII alphanumerics plus `-` and `_`, non-empty and bounded in
//! length. General keys are case-sensitive. The reserved header keys compare
//! case-insensitively so `manifest-version` and `Manifest-Version` collide.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::FormatError;
use crate::DEFAULT_MAX_KEY_LENGTH;

/// Keys compared without regard to ASCII case.
const CASE_INSENSITIVE_KEYS: &[&str] = &[
    "Manifest-Version",
    "Signature-Version",
    "Created-By",
    "Name",
];

/// A validated attribute key.
///
/// The original spelling is preserved for output; equality and hashing use
/// the canonical spelling for reserved keys.
#[derive(Debug, Clone)]
pub struct Key {
    name: String,
}

impl Key {
    /// Validate `name` against the key grammar with the default length limit.
    pub fn new(name: impl Into<String>) -> Result<Self, FormatError> {
        Self::with_max_length(name, DEFAULT_MAX_KEY_LENGTH)
    }

    /// Validate `name` against the key grammar with a custom length limit.
    pub fn with_max_length(name: impl Into<String>, max_length: usize) -> Result<Self, FormatError> {
        let name = name.into();
        validate_key(&name, max_length)?;
        Ok(Self { name })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Whether this key is one of the case-insensitive reserved keys.
    pub fn is_reserved(&self) -> bool {
        reserved_spelling(&self.name).is_some()
    }

    /// Whether this key is the `Name` record that opens a section.
    pub fn is_section_header(&self) -> bool {
        self.name.eq_ignore_ascii_case(crate::SECTION_NAME_KEY)
    }

    fn canonical(&self) -> &str {
        reserved_spelling(&self.name).unwrap_or(&self.name)
    }
}

fn reserved_spelling(name: &str) -> Option<&'static str> {
    CASE_INSENSITIVE_KEYS
        .iter()
        .copied()
        .find(|reserved| reserved.eq_ignore_ascii_case(name))
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Key::new(name).map_err(serde::de::Error::custom)
    }
}

fn check_grammar(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("key must not be empty".to_string());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(format!("character {:?} is not allowed", bad));
    }
    Ok(())
}

/// Validate an attribute key: `[A-Za-z0-9_-]+`, at most `max_length` bytes.
pub fn validate_key(name: &str, max_length: usize) -> Result<(), FormatError> {
    check_grammar(name).map_err(|reason| FormatError::InvalidKey {
        key: name.to_string(),
        reason,
    })?;
    if name.len() > max_length {
        return Err(FormatError::InvalidKey {
            key: name.to_string(),
            reason: format!("length {} exceeds {} bytes", name.len(), max_length),
        });
    }
    Ok(())
}

/// Validate a section name: the key grammar without the length limit.
pub fn validate_section_name(name: &str) -> Result<(), FormatError> {
    check_grammar(name).map_err(|reason| FormatError::InvalidKey {
        key: name.to_string(),
        reason: format!("section name: {}", reason),
    })
}

/// Validate a rendered value. Values may hold any UTF-8 text except line
/// breaks and NUL, which the line format cannot carry.
pub fn validate_value(value: &str) -> Result<(), &'static str> {
    if value.contains('\n') || value.contains('\r') {
        return Err("value contains a line break");
    }
    if value.contains('\0') {
        return Err("value contains NUL");
    }
    Ok(())
}
