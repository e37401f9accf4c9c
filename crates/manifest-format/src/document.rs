//! Plain-string manifest document
//!
//! The shape both the writer and the reader work on: main attributes plus
//! named sections, every value already rendered to text.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::key::Key;

/// Ordered attributes with rendered values.
pub type Attributes = IndexMap<Key, String>;

/// A fully rendered manifest: main attributes and named sections, both in
/// insertion order.
///
/// Equality is order-sensitive: two documents are equal only if they would
/// serialize to the same records in the same order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Attributes of the main (unnamed) section
    pub main: Attributes,

    /// Named sections; the main section is never an entry here
    pub sections: IndexMap<String, Attributes>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.sections.is_empty()
    }

    /// Look up a main attribute by key spelling.
    pub fn main_value(&self, key: &str) -> Option<&str> {
        lookup(&self.main, key)
    }

    /// Look up an attribute of a named section.
    pub fn section_value(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section).and_then(|attrs| lookup(attrs, key))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.main.iter().eq(other.main.iter())
            && self.sections.len() == other.sections.len()
            && self
                .sections
                .iter()
                .zip(&other.sections)
                .all(|((name, attrs), (other_name, other_attrs))| {
                    name == other_name && attrs.iter().eq(other_attrs.iter())
                })
    }
}

impl Eq for Document {}

fn lookup<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a str> {
    // Unbounded length: a lookup for an over-long key simply misses.
    let key = Key::with_max_length(key, usize::MAX).ok()?;
    attrs.get(&key).map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let mut doc = Document::new();
        doc.main
            .insert(Key::new("Manifest-Version").unwrap(), "1.0".to_string());
        let mut section = Attributes::new();
        section.insert(Key::new("Sealed").unwrap(), "true".to_string());
        doc.sections.insert("pkg".to_string(), section);

        assert_eq!(doc.main_value("manifest-version"), Some("1.0"));
        assert_eq!(doc.section_value("pkg", "Sealed"), Some("true"));
        assert_eq!(doc.section_value("pkg", "sealed"), None);
        assert_eq!(doc.main_value("not a key"), None);
        assert!(!doc.is_empty());
    }

    fn attrs(entries: &[(&str, &str)]) -> Attributes {
        entries
            .iter()
            .map(|(k, v)| (Key::new(*k).unwrap(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_equality_respects_order() {
        let mut a = Document::new();
        a.main = attrs(&[("A", "1"), ("B", "2")]);
        let mut b = Document::new();
        b.main = attrs(&[("B", "2"), ("A", "1")]);
        assert_ne!(a, b);

        b.main = attrs(&[("A", "1"), ("B", "2")]);
        assert_eq!(a, b);

        a.sections.insert("x".to_string(), attrs(&[("K", "v")]));
        a.sections.insert("y".to_string(), attrs(&[("K", "v")]));
        b.sections.insert("y".to_string(), attrs(&[("K", "v")]));
        b.sections.insert("x".to_string(), attrs(&[("K", "v")]));
        assert_ne!(a, b);
    }
}
