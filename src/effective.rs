//! Effective manifests
//!
//! The immutable result of a merge: every value is plain text and there are
//! no merge sources left. This is what gets written and what parsed
//! manifest files turn into.

use indexmap::IndexMap;
use manifest_format::{parse_document, write_document, Attributes, Document, FormatOptions};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::attributes::AttributeSet;
use crate::error::ManifestError;
use crate::manifest::Manifest;
use crate::section::SectionTable;

/// Fully merged, fully rendered manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EffectiveManifest {
    #[serde(flatten)]
    doc: Document,
}

impl EffectiveManifest {
    pub(crate) fn from_document(doc: Document) -> Self {
        Self { doc }
    }

    /// Parse serialized manifest text.
    pub fn parse(bytes: &[u8], options: &FormatOptions) -> Result<Self, ManifestError> {
        let doc = parse_document(bytes, options).map_err(|source| ManifestError::Malformed {
            origin: "<input>".to_string(),
            source,
        })?;
        Ok(Self { doc })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn main_attributes(&self) -> &Attributes {
        &self.doc.main
    }

    pub fn sections(&self) -> &IndexMap<String, Attributes> {
        &self.doc.sections
    }

    pub fn main_value(&self, key: &str) -> Option<&str> {
        self.doc.main_value(key)
    }

    pub fn section_value(&self, section: &str, key: &str) -> Option<&str> {
        self.doc.section_value(section, key)
    }

    /// Serialize to the line-wrapped manifest format.
    pub fn to_bytes(&self, options: &FormatOptions) -> Result<Vec<u8>, ManifestError> {
        Ok(write_document(&self.doc, options)?)
    }

    /// SHA-256 of the serialized bytes, hex encoded.
    pub fn sha256(&self, options: &FormatOptions) -> Result<String, ManifestError> {
        let bytes = self.to_bytes(options)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// A mutable manifest holding these attributes as text values.
    pub fn into_manifest(self) -> Manifest {
        self.into_manifest_with(FormatOptions::default())
    }

    pub(crate) fn into_manifest_with(self, options: FormatOptions) -> Manifest {
        let main = AttributeSet::from_rendered(&self.doc.main, options.max_key_length);
        let mut sections = SectionTable::new();
        for (name, attrs) in &self.doc.sections {
            // Names were validated when the document was parsed or merged
            sections.insert_validated(
                name.clone(),
                AttributeSet::from_rendered(attrs, options.max_key_length),
            );
        }
        Manifest::from_parts(main, sections, options)
    }
}
