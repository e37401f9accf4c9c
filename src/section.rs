//! Named sections
//!
//! The section table never holds the main section; that is a separate field
//! of the manifest.

use indexmap::IndexMap;
use manifest_format::validate_section_name;

use crate::attributes::AttributeSet;
use crate::error::ManifestError;

/// Mapping from section name to its attributes, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    sections: IndexMap<String, AttributeSet>,
}

impl SectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a section name against the key grammar (no length limit).
    pub fn validate_name(name: &str) -> Result<(), ManifestError> {
        validate_section_name(name).map_err(|e| ManifestError::InvalidSectionName {
            name: name.to_string(),
            reason: match e {
                manifest_format::FormatError::InvalidKey { reason, .. } => reason,
                other => other.to_string(),
            },
        })
    }

    /// Get the named section, creating an empty one if absent.
    pub fn get_or_create(&mut self, name: &str, max_key_length: usize) -> Result<&mut AttributeSet, ManifestError> {
        if !self.sections.contains_key(name) {
            Self::validate_name(name)?;
        }
        Ok(self
            .sections
            .entry(name.to_string())
            .or_insert_with(|| AttributeSet::with_max_key_length(max_key_length)))
    }

    /// Insert or replace a whole section.
    pub fn insert(&mut self, name: &str, attrs: AttributeSet) -> Result<(), ManifestError> {
        Self::validate_name(name)?;
        self.sections.insert(name.to_string(), attrs);
        Ok(())
    }

    pub(crate) fn insert_validated(&mut self, name: String, attrs: AttributeSet) {
        self.sections.insert(name, attrs);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSet> {
        self.sections.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeSet)> {
        self.sections.iter().map(|(name, attrs)| (name.as_str(), attrs))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_keeps_order() {
        let mut table = SectionTable::new();
        table.get_or_create("b", 70).unwrap().put("X", "1").unwrap();
        table.get_or_create("a", 70).unwrap();
        table.get_or_create("b", 70).unwrap().put("Y", "2").unwrap();

        assert_eq!(table.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(table.get("b").unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_section_name() {
        let mut table = SectionTable::new();
        let err = table.get_or_create("com/example", 70).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidSectionName { ref name, .. } if name == "com/example"));
        assert!(table.is_empty());
    }

    #[test]
    fn test_section_names_are_case_sensitive() {
        let mut table = SectionTable::new();
        table.get_or_create("foo", 70).unwrap();
        table.get_or_create("Foo", 70).unwrap();
        assert_eq!(table.len(), 2);
    }
}
