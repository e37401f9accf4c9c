//! Manifest Merge - layered manifest composition
//!
//! This crate builds line-wrapped `Key: Value` manifests out of directly-set
//! attributes, named sections and any number of other manifests merged in
//! registration order. Sources resolve lazily, concurrently when allowed,
//! and merge cycles are reported instead of recursing forever.

pub mod attributes;
pub mod config;
pub mod effective;
pub mod error;
pub mod manifest;
pub mod merge;
pub mod resolve;
pub mod section;

pub use attributes::{AttrValue, AttributeError, AttributeSet, OverridePolicy, RenderError};
pub use config::{ConfigError, EffectiveConfig, ProjectFile};
pub use effective::EffectiveManifest;
pub use error::{ManifestError, Scope};
pub use manifest::{Manifest, SharedManifest, DEFAULT_MANIFEST_VERSION};
pub use merge::{MergeSource, MergeSpec, Merged, SectionFilter, SourceLocation, SourceRecord};
pub use resolve::{FsResolver, ResolvedSource, SourceResolver};
pub use section::SectionTable;

pub use manifest_format;
pub use manifest_format::{FormatOptions, Key, LineEnding};
