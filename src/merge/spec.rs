//! Per-source merge configuration.

use manifest_format::Key;
use std::collections::BTreeSet;

use crate::attributes::OverridePolicy;

/// Which sections of a source take part in a merge. The main section
/// always does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SectionFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

/// How one merge source combines with the accumulated manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSpec {
    /// Sections to include (default: all)
    pub include_sections: SectionFilter,

    /// Sections dropped after `include_sections` is applied
    pub exclude_sections: BTreeSet<String>,

    /// Keys dropped from every section of this source
    pub exclude_keys: BTreeSet<String>,

    /// Whether this source's values replace existing ones (default: true)
    pub override_on_collision: bool,
}

impl Default for MergeSpec {
    fn default() -> Self {
        Self {
            include_sections: SectionFilter::All,
            exclude_sections: BTreeSet::new(),
            exclude_keys: BTreeSet::new(),
            override_on_collision: true,
        }
    }
}

impl MergeSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only merge the named sections.
    pub fn include_only<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_sections = SectionFilter::Only(sections.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude_section(mut self, section: impl Into<String>) -> Self {
        self.exclude_sections.insert(section.into());
        self
    }

    pub fn exclude_key(mut self, key: impl Into<String>) -> Self {
        self.exclude_keys.insert(key.into());
        self
    }

    /// Keep the accumulated value when this source collides with it.
    pub fn keep_existing(mut self) -> Self {
        self.override_on_collision = false;
        self
    }

    pub fn includes_section(&self, name: &str) -> bool {
        let included = match &self.include_sections {
            SectionFilter::All => true,
            SectionFilter::Only(names) => names.contains(name),
        };
        included && !self.exclude_sections.contains(name)
    }

    /// Whether `key` is dropped. Reserved keys match in any case.
    pub fn excludes_key(&self, key: &Key) -> bool {
        self.exclude_keys.iter().any(|excluded| {
            Key::with_max_length(excluded.as_str(), usize::MAX)
                .map(|excluded| &excluded == key)
                .unwrap_or(false)
        })
    }

    pub fn override_policy(&self) -> OverridePolicy {
        if self.override_on_collision {
            OverridePolicy::Override
        } else {
            OverridePolicy::KeepExisting
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_includes_everything() {
        let spec = MergeSpec::default();
        assert!(spec.includes_section("anything"));
        assert_eq!(spec.override_policy(), OverridePolicy::Override);
    }

    #[test]
    fn test_include_then_exclude() {
        let spec = MergeSpec::new()
            .include_only(["a", "b"])
            .exclude_section("b");
        assert!(spec.includes_section("a"));
        assert!(!spec.includes_section("b"));
        assert!(!spec.includes_section("c"));
    }

    #[test]
    fn test_exclude_keys() {
        let spec = MergeSpec::new()
            .exclude_key("Main-Class")
            .exclude_key("created-by");
        assert!(spec.excludes_key(&Key::new("Main-Class").unwrap()));
        assert!(!spec.excludes_key(&Key::new("main-class").unwrap()));
        assert!(spec.excludes_key(&Key::new("Created-By").unwrap()));
    }

    #[test]
    fn test_keep_existing() {
        let spec = MergeSpec::new().keep_existing();
        assert_eq!(spec.override_policy(), OverridePolicy::KeepExisting);
    }
}
