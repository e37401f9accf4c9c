//! Source-location resolution
//!
//! Turning a [`SourceLocation`] into manifest content belongs to the
//! caller. The merge engine only calls the resolver and interprets what it
//! returns.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::manifest::SharedManifest;
use crate::merge::SourceLocation;

/// What a location resolves to.
#[derive(Debug, Clone)]
pub enum ResolvedSource {
    /// Serialized manifest text, parsed by the engine
    Bytes(Vec<u8>),
    /// An in-memory manifest, merged through its own effective manifest
    Manifest(SharedManifest),
}

/// Resolves merge-source locations. Called concurrently when parallel
/// resolution is enabled.
pub trait SourceResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, location: &SourceLocation) -> io::Result<ResolvedSource>;
}

/// Reads manifest files from disk, resolving relative locations against a
/// base directory.
#[derive(Debug, Clone)]
pub struct FsResolver {
    base_dir: PathBuf,
}

impl FsResolver {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn current_dir() -> io::Result<Self> {
        Ok(Self::new(std::env::current_dir()?))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn path_for(&self, location: &SourceLocation) -> PathBuf {
        let path = Path::new(location.as_str());
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

impl SourceResolver for FsResolver {
    fn resolve(&self, location: &SourceLocation) -> io::Result<ResolvedSource> {
        let path = self.path_for(location);
        let bytes = fs::read(&path)
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
        Ok(ResolvedSource::Bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_location_uses_base_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("base.mf"), b"A: 1\r\n\r\n").unwrap();

        let resolver = FsResolver::new(dir.path());
        match resolver.resolve(&SourceLocation::new("base.mf")).unwrap() {
            ResolvedSource::Bytes(bytes) => assert_eq!(bytes, b"A: 1\r\n\r\n"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_absolute_location() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abs.mf");
        fs::write(&path, b"B: 2\n").unwrap();

        let resolver = FsResolver::new("/nonexistent");
        let location = SourceLocation::new(path.to_string_lossy());
        assert_eq!(resolver.path_for(&location), path);
        assert!(resolver.resolve(&location).is_ok());
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = TempDir::new().unwrap();
        let resolver = FsResolver::new(dir.path());
        let err = resolver.resolve(&SourceLocation::new("missing.mf")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(err.to_string().contains("missing.mf"));
    }
}
