//! Archive manifest text format
//!
//! Owns the persisted `Key: value` format consumed by archive tooling:
//! - key grammar and the reserved, case-insensitive keys
//! - the hard byte-budget line wrapper used when writing
//! - the strict reader that rebuilds main attributes and sections
//!
//! The format is byte-exact: the same [`Document`] written with the same
//! [`FormatOptions`] always produces the same bytes.

pub mod document;
pub mod error;
pub mod key;
pub mod options;
pub mod reader;
pub mod writer;

pub use document::{Attributes, Document};
pub use error::FormatError;
pub use key::{validate_key, validate_section_name, validate_value, Key};
pub use options::{FormatOptions, LineEnding};
pub use reader::parse_document;
pub use writer::{write_document, write_record};

/// Historical physical line budget of archive manifests, in bytes.
pub const DEFAULT_LINE_WIDTH: usize = 72;

/// Maximum attribute key length, in bytes.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 70;

/// Smallest accepted line width. A continuation line needs room for the
/// leading space plus one complete 4-byte UTF-8 character.
pub const MIN_LINE_WIDTH: usize = 8;

/// Record that opens every section.
pub const SECTION_NAME_KEY: &str = "Name";

/// Conventional version header of the main section.
pub const MANIFEST_VERSION_KEY: &str = "Manifest-Version";
