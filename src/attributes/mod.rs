//! Ordered attribute sets
//!
//! An [`AttributeSet`] maps validated keys to caller-supplied values in
//! insertion order. Overwriting a key keeps its original position. Values
//! are rendered to text only by [`AttributeSet::render`].

mod value;

pub use value::{AttrValue, RenderError};

use indexmap::IndexMap;
use manifest_format::{validate_value, Attributes, Key, DEFAULT_MAX_KEY_LENGTH};

/// Errors raised by attribute set operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("null value for key {key:?}")]
    NullValue { key: String },

    #[error("duplicate key {key:?}")]
    DuplicateKey { key: String },

    #[error("invalid value for key {key:?}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("failed to evaluate {key:?}: {message}")]
    Evaluation { key: String, message: String },
}

impl AttributeError {
    /// The key the error refers to.
    pub fn key(&self) -> &str {
        match self {
            Self::InvalidKey { key, .. }
            | Self::NullValue { key }
            | Self::DuplicateKey { key }
            | Self::InvalidValue { key, .. }
            | Self::Evaluation { key, .. } => key,
        }
    }
}

/// What happens when a merged-in key already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverridePolicy {
    /// The incoming value replaces the existing one (position is kept)
    Override,
    /// The existing value is kept
    KeepExisting,
}

/// Ordered mapping of validated keys to values.
#[derive(Debug, Clone)]
pub struct AttributeSet {
    entries: IndexMap<Key, AttrValue>,
    max_key_length: usize,
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::with_max_key_length(DEFAULT_MAX_KEY_LENGTH)
    }
}

impl AttributeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_key_length(max_key_length: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            max_key_length,
        }
    }

    /// Build a set from already rendered attributes.
    pub fn from_rendered(attrs: &Attributes, max_key_length: usize) -> Self {
        let entries = attrs
            .iter()
            .map(|(key, value)| (key.clone(), AttrValue::Text(value.clone())))
            .collect();
        Self {
            entries,
            max_key_length,
        }
    }

    /// Validate and insert one attribute. An existing key is overwritten in
    /// place.
    pub fn put(&mut self, key: &str, value: impl Into<AttrValue>) -> Result<(), AttributeError> {
        let (key, value) = self.validate_entry(key, value.into())?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Apply [`put`](Self::put) for each entry in iteration order.
    ///
    /// Stops at the first failure; entries put before it remain (partial
    /// application on error).
    pub fn put_all<I, K, V>(&mut self, entries: I) -> Result<(), AttributeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        for (key, value) in entries {
            self.put(key.as_ref(), value)?;
        }
        Ok(())
    }

    /// Check a key and value without inserting.
    pub(crate) fn validate_entry(&self, key: &str, value: AttrValue) -> Result<(Key, AttrValue), AttributeError> {
        let parsed = Key::with_max_length(key, self.max_key_length).map_err(|e| match e {
            manifest_format::FormatError::InvalidKey { reason, .. } => AttributeError::InvalidKey {
                key: key.to_string(),
                reason,
            },
            other => AttributeError::InvalidKey {
                key: key.to_string(),
                reason: other.to_string(),
            },
        })?;
        if parsed.is_section_header() {
            return Err(AttributeError::InvalidKey {
                key: key.to_string(),
                reason: "Name is reserved for section headers".to_string(),
            });
        }

        match &value {
            AttrValue::Null => {
                return Err(AttributeError::NullValue {
                    key: key.to_string(),
                })
            }
            AttrValue::Text(text) => {
                validate_value(text).map_err(|reason| AttributeError::InvalidValue {
                    key: key.to_string(),
                    reason: reason.to_string(),
                })?;
            }
            AttrValue::Deferred(_) => {}
        }

        Ok((parsed, value))
    }

    pub(crate) fn insert_validated(&mut self, key: Key, value: AttrValue) {
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        let key = Key::with_max_length(key, usize::MAX).ok()?;
        self.entries.get(&key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        let key = Key::with_max_length(key, usize::MAX).ok()?;
        self.entries.shift_remove(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_key_length(&self) -> usize {
        self.max_key_length
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &AttrValue)> {
        self.entries.iter()
    }

    /// Evaluate every value, in insertion order.
    pub fn render(&self) -> Result<Attributes, AttributeError> {
        let mut rendered = Attributes::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            let text = value.render().map_err(|e| AttributeError::Evaluation {
                key: key.to_string(),
                message: e.to_string(),
            })?;
            validate_value(&text).map_err(|reason| AttributeError::Evaluation {
                key: key.to_string(),
                message: format!("rendered {}", reason),
            })?;
            rendered.insert(key.clone(), text);
        }
        Ok(rendered)
    }

    /// A new set holding `self`'s entries with `other`'s applied on top.
    ///
    /// Keys new to `self` are appended in `other`'s order. Colliding keys
    /// follow `policy`.
    pub fn merge(&self, other: &AttributeSet, policy: OverridePolicy) -> AttributeSet {
        let mut merged = self.clone();
        for (key, value) in &other.entries {
            if let Some(existing) = merged.entries.get_mut(key) {
                if policy == OverridePolicy::Override {
                    tracing::trace!(key = %key, "merged value overrides existing");
                    *existing = value.clone();
                } else {
                    tracing::trace!(key = %key, "existing value kept");
                }
            } else {
                merged.entries.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}
