//! Manifest model
//!
//! A [`Manifest`] owns its main attributes and section table and keeps an
//! ordered list of merge sources. Nothing merges eagerly: the sources are
//! resolved and folded every time the effective manifest is requested or
//! the manifest is written.

use manifest_format::{FormatOptions, Key, MANIFEST_VERSION_KEY};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::attributes::{AttrValue, AttributeError, AttributeSet};
use crate::effective::EffectiveManifest;
use crate::error::{ManifestError, Scope};
use crate::merge::{self, Link, MergeSource, MergeSpec, Merged, RegisteredSource};
use crate::resolve::SourceResolver;
use crate::section::SectionTable;

/// Default value of the `Manifest-Version` header.
pub const DEFAULT_MANIFEST_VERSION: &str = "1.0";

/// A mutable manifest: main attributes, named sections and merge sources.
///
/// Not synchronized; wrap it in a [`SharedManifest`] to share it or to use
/// it as a merge source of other manifests.
#[derive(Debug)]
pub struct Manifest {
    main: AttributeSet,
    sections: SectionTable,
    sources: Vec<RegisteredSource>,
    resolver: Option<Arc<dyn SourceResolver>>,
    options: FormatOptions,
    parallel: bool,
    /// Allocation of the owning `SharedManifest`, if any
    handle_id: Option<usize>,
}

impl Default for Manifest {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Manifest {
    fn clone(&self) -> Self {
        // A clone is a new manifest, not the one behind the handle
        Self {
            main: self.main.clone(),
            sections: self.sections.clone(),
            sources: self.sources.clone(),
            resolver: self.resolver.clone(),
            options: self.options,
            parallel: self.parallel,
            handle_id: None,
        }
    }
}

impl Manifest {
    /// An empty manifest with default format options.
    pub fn new() -> Self {
        Self {
            main: AttributeSet::new(),
            sections: SectionTable::new(),
            sources: Vec::new(),
            resolver: None,
            options: FormatOptions::default(),
            parallel: true,
            handle_id: None,
        }
    }

    /// A manifest whose main attributes start with `Manifest-Version: 1.0`.
    pub fn with_default_version() -> Self {
        let mut manifest = Self::new();
        if let Ok(key) = Key::new(MANIFEST_VERSION_KEY) {
            manifest
                .main
                .insert_validated(key, AttrValue::text(DEFAULT_MANIFEST_VERSION));
        }
        manifest
    }

    pub(crate) fn from_parts(main: AttributeSet, sections: SectionTable, options: FormatOptions) -> Self {
        Self {
            main,
            sections,
            options,
            ..Self::new()
        }
    }

    /// Parse serialized manifest text into a manifest without merge sources.
    pub fn parse(bytes: &[u8], options: &FormatOptions) -> Result<Self, ManifestError> {
        Ok(EffectiveManifest::parse(bytes, options)?.into_manifest_with(*options))
    }

    /// Set the format options used for key limits, parsing and writing.
    ///
    /// Call before adding attributes; existing attributes keep the key limit
    /// they were validated with.
    pub fn with_options(mut self, options: FormatOptions) -> Self {
        let mut main = AttributeSet::with_max_key_length(options.max_key_length);
        for (key, value) in self.main.iter() {
            main.insert_validated(key.clone(), value.clone());
        }
        self.main = main;
        self.options = options;
        self
    }

    /// Set the resolver used for [`MergeSource::Location`] sources.
    pub fn with_resolver(mut self, resolver: Arc<dyn SourceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Resolve merge sources concurrently (default) or one after another.
    /// The fold order is the registration order either way.
    pub fn with_parallel_resolution(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn main_attributes(&self) -> &AttributeSet {
        &self.main
    }

    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    pub fn merge_sources(&self) -> &[RegisteredSource] {
        &self.sources
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn resolver(&self) -> Option<&Arc<dyn SourceResolver>> {
        self.resolver.as_ref()
    }

    pub fn parallel_resolution(&self) -> bool {
        self.parallel
    }

    /// Add attributes to the main section.
    ///
    /// The whole batch is validated before anything is inserted: an invalid
    /// key, a null value or the same key twice within one call fails the call
    /// and leaves the manifest unchanged. Keys set by earlier calls are
    /// overwritten in place.
    pub fn attributes<I, K, V>(&mut self, attributes: I) -> Result<&mut Self, ManifestError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        let staged = stage(&self.main, attributes).map_err(|e| ManifestError::attribute(Scope::Main, e))?;
        for (key, value) in staged {
            self.main.insert_validated(key, value);
        }
        Ok(self)
    }

    /// Add attributes to a named section, creating it if absent. Same
    /// validation rules as [`attributes`](Self::attributes).
    pub fn section_attributes<I, K, V>(&mut self, attributes: I, section: &str) -> Result<&mut Self, ManifestError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttrValue>,
    {
        SectionTable::validate_name(section)?;
        let max_key_length = self.options.max_key_length;
        let template = AttributeSet::with_max_key_length(
            self.sections
                .get(section)
                .map_or(max_key_length, AttributeSet::max_key_length),
        );
        let staged =
            stage(&template, attributes).map_err(|e| ManifestError::attribute(Scope::section(section), e))?;

        let target = self.sections.get_or_create(section, max_key_length)?;
        for (key, value) in staged {
            target.insert_validated(key, value);
        }
        Ok(self)
    }

    /// Register a merge source with the default spec. No I/O happens here.
    pub fn merge_from(&mut self, source: impl Into<MergeSource>) -> &mut Self {
        self.merge_from_with(source, MergeSpec::default())
    }

    /// Register several sources; they fold left to right.
    pub fn merge_from_all<I, S>(&mut self, sources: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MergeSource>,
    {
        for source in sources {
            self.merge_from(source);
        }
        self
    }

    /// Register a merge source with an explicit spec.
    pub fn merge_from_with(&mut self, source: impl Into<MergeSource>, spec: MergeSpec) -> &mut Self {
        self.sources.push(RegisteredSource {
            source: source.into(),
            spec,
        });
        self
    }

    /// Resolve all sources, merge and render. Every call re-resolves.
    pub fn effective_manifest(&self) -> Result<EffectiveManifest, ManifestError> {
        Ok(self.merge()?.manifest)
    }

    /// Like [`effective_manifest`](Self::effective_manifest), with a record of
    /// what each source contributed.
    pub fn merge(&self) -> Result<Merged, ManifestError> {
        merge::merge(self, &[Link::root(self.handle_id)])
    }

    /// Merge and write the manifest to `sink`.
    ///
    /// The output is fully built before the first byte is written. If
    /// writing fails, whatever reached the sink must be treated as corrupt.
    pub fn write_to<W: Write>(&self, mut sink: W) -> Result<(), ManifestError> {
        let bytes = self.effective_manifest()?.to_bytes(&self.options)?;
        sink.write_all(&bytes)
            .and_then(|()| sink.flush())
            .map_err(|e| ManifestError::io("writing manifest", e))
    }

    /// Merge and write atomically to `path`: the bytes go to `<path>.tmp`,
    /// which is then renamed over `path`.
    pub fn write_to_path(&self, path: &Path) -> Result<(), ManifestError> {
        let bytes = self.effective_manifest()?.to_bytes(&self.options)?;

        let mut temp_path = path.as_os_str().to_owned();
        temp_path.push(".tmp");
        let temp_path = PathBuf::from(temp_path);
        fs::write(&temp_path, &bytes)
            .map_err(|e| ManifestError::io(format!("writing {}", temp_path.display()), e))?;
        if let Err(e) = fs::rename(&temp_path, path) {
            let _ = fs::remove_file(&temp_path);
            return Err(ManifestError::io(format!("renaming to {}", path.display()), e));
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote manifest");
        Ok(())
    }
}

/// Validate a batch against `target`'s key limit, rejecting keys repeated
/// within the batch.
fn stage<I, K, V>(target: &AttributeSet, attributes: I) -> Result<Vec<(Key, AttrValue)>, AttributeError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<AttrValue>,
{
    let mut seen = HashSet::new();
    let mut staged = Vec::new();
    for (key, value) in attributes {
        let (key, value) = target.validate_entry(key.as_ref(), value.into())?;
        if !seen.insert(key.clone()) {
            return Err(AttributeError::DuplicateKey {
                key: key.to_string(),
            });
        }
        staged.push((key, value));
    }
    Ok(staged)
}

/// Shared handle to a manifest, usable as a merge source of other
/// manifests. The handle's allocation is its identity for cycle detection.
#[derive(Debug, Clone)]
pub struct SharedManifest(Arc<RwLock<Manifest>>);

impl SharedManifest {
    pub fn new(manifest: Manifest) -> Self {
        let inner = Arc::new(RwLock::new(manifest));
        let id = Arc::as_ptr(&inner) as *const () as usize;
        inner.write().unwrap_or_else(PoisonError::into_inner).handle_id = Some(id);
        Self(inner)
    }

    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Manifest> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Manifest> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn ptr_eq(&self, other: &SharedManifest) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn effective_manifest(&self) -> Result<EffectiveManifest, ManifestError> {
        self.read().effective_manifest()
    }

    /// A copy of the current manifest, detached from this handle.
    pub fn snapshot(&self) -> Manifest {
        self.read().clone()
    }
}

impl From<Manifest> for SharedManifest {
    fn from(manifest: Manifest) -> Self {
        Self::new(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeError;

    #[test]
    fn test_new_is_empty() {
        let manifest = Manifest::new();
        assert!(manifest.main_attributes().is_empty());
        assert!(manifest.sections().is_empty());
        assert!(manifest.merge_sources().is_empty());
    }

    #[test]
    fn test_default_version() {
        let manifest = Manifest::with_default_version();
        let effective = manifest.effective_manifest().unwrap();
        assert_eq!(effective.main_value("Manifest-Version"), Some("1.0"));
    }

    #[test]
    fn test_attributes_chain() {
        let mut manifest = Manifest::new();
        manifest
            .attributes([("A", "1")])
            .unwrap()
            .attributes([("B", "2")])
            .unwrap();
        assert_eq!(manifest.main_attributes().len(), 2);
    }

    #[test]
    fn test_attributes_is_all_or_nothing() {
        let mut manifest = Manifest::new();
        let err = manifest
            .attributes(vec![("A", "1"), ("bad key", "2")])
            .unwrap_err();

        assert_eq!(err.scope(), Some(&Scope::Main));
        assert!(matches!(
            err.attribute_error(),
            Some(AttributeError::InvalidKey { key, .. }) if key == "bad key"
        ));
        assert!(manifest.main_attributes().is_empty());
    }

    #[test]
    fn test_duplicate_within_one_call_rejected() {
        let mut manifest = Manifest::new();
        let err = manifest
            .attributes(vec![("Manifest-Version", "1.0"), ("manifest-version", "2.0")])
            .unwrap_err();
        assert!(matches!(
            err.attribute_error(),
            Some(AttributeError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_repeat_across_calls_overwrites() {
        let mut manifest = Manifest::new();
        manifest.attributes([("A", "1"), ("B", "2")]).unwrap();
        manifest.attributes([("A", "3")]).unwrap();

        let effective = manifest.effective_manifest().unwrap();
        let keys: Vec<&str> = effective.main_attributes().keys().map(Key::as_str).collect();
        assert_eq!(keys, vec!["A", "B"]);
        assert_eq!(effective.main_value("A"), Some("3"));
    }

    #[test]
    fn test_null_value_names_section_and_key() {
        let mut manifest = Manifest::new();
        let err = manifest
            .section_attributes([("Sealed", None::<&str>)], "pkg")
            .unwrap_err();

        assert_eq!(err.scope(), Some(&Scope::section("pkg")));
        assert_eq!(err.attribute_error().map(AttributeError::key), Some("Sealed"));
        // the failed call does not create the section
        assert!(!manifest.sections().contains("pkg"));
    }

    #[test]
    fn test_invalid_section_name() {
        let mut manifest = Manifest::new();
        let err = manifest
            .section_attributes([("A", "1")], "not valid")
            .unwrap_err();
        assert!(matches!(err, ManifestError::InvalidSectionName { .. }));
    }

    #[test]
    fn test_custom_key_limit_from_options() {
        let options = FormatOptions {
            max_key_length: 4,
            ..FormatOptions::default()
        };
        let mut manifest = Manifest::new().with_options(options);
        assert!(manifest.attributes([("Four", "x")]).is_ok());
        assert!(manifest.attributes([("Fives", "x")]).is_err());
        assert!(manifest.section_attributes([("Fives", "x")], "s").is_err());
    }

    #[test]
    fn test_merge_from_is_bookkeeping_only() {
        let mut manifest = Manifest::new();
        manifest.merge_from("does/not/exist.mf");
        assert_eq!(manifest.merge_sources().len(), 1);

        // resolution happens (and fails) only on demand
        let err = manifest.effective_manifest().unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }

    #[test]
    fn test_write_to_sink() {
        let mut manifest = Manifest::with_default_version();
        manifest.section_attributes([("X", "1")], "foo").unwrap();

        let mut out = Vec::new();
        manifest.write_to(&mut out).unwrap();
        assert_eq!(out, b"Manifest-Version: 1.0\r\n\r\nName: foo\r\nX: 1\r\n\r\n");
    }

    #[test]
    fn test_clone_is_detached_from_handle() {
        let shared = SharedManifest::new(Manifest::new());
        assert!(shared.read().handle_id.is_some());
        assert!(shared.snapshot().handle_id.is_none());
    }

    #[test]
    fn test_parse_keeps_options() {
        let options = FormatOptions::default().with_line_width(20);
        let manifest = Manifest::parse(b"Implementation-Title: x\n", &options).unwrap();
        assert_eq!(manifest.options().line_width, 20);
        assert_eq!(manifest.main_attributes().len(), 1);
    }
}
