//! Merge sources
//!
//! A source is either a shared in-memory manifest or an opaque location
//! handed to the manifest's [`SourceResolver`](crate::SourceResolver).
//! Registering a source does no I/O.

use std::fmt;
use std::path::{Path, PathBuf};

use super::spec::MergeSpec;
use crate::manifest::{Manifest, SharedManifest};

/// Opaque location of manifest content, interpreted by a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation(String);

impl SourceLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something to merge into a manifest.
#[derive(Debug, Clone)]
pub enum MergeSource {
    Manifest(SharedManifest),
    Location(SourceLocation),
}

impl MergeSource {
    /// Short description used in logs and error chains.
    pub fn describe(&self) -> String {
        match self {
            Self::Manifest(_) => "in-memory manifest".to_string(),
            Self::Location(location) => location.to_string(),
        }
    }
}

impl From<SharedManifest> for MergeSource {
    fn from(manifest: SharedManifest) -> Self {
        Self::Manifest(manifest)
    }
}

impl From<&SharedManifest> for MergeSource {
    fn from(manifest: &SharedManifest) -> Self {
        Self::Manifest(manifest.clone())
    }
}

impl From<Manifest> for MergeSource {
    fn from(manifest: Manifest) -> Self {
        Self::Manifest(SharedManifest::new(manifest))
    }
}

impl From<SourceLocation> for MergeSource {
    fn from(location: SourceLocation) -> Self {
        Self::Location(location)
    }
}

impl From<&str> for MergeSource {
    fn from(location: &str) -> Self {
        Self::Location(SourceLocation::new(location))
    }
}

impl From<String> for MergeSource {
    fn from(location: String) -> Self {
        Self::Location(SourceLocation::new(location))
    }
}

impl From<&Path> for MergeSource {
    fn from(path: &Path) -> Self {
        Self::Location(SourceLocation::new(path.to_string_lossy()))
    }
}

impl From<PathBuf> for MergeSource {
    fn from(path: PathBuf) -> Self {
        Self::from(path.as_path())
    }
}

/// A source together with the spec it was registered with.
#[derive(Debug, Clone)]
pub struct RegisteredSource {
    pub source: MergeSource,
    pub spec: MergeSpec,
}
