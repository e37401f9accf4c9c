//! Error taxonomy for manifest mutation, merging and output.

use manifest_format::FormatError;
use std::fmt;
use std::io;

use crate::attributes::AttributeError;
use crate::config::ConfigError;

/// Which attribute set an error refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Main,
    Section(String),
}

impl Scope {
    pub fn section(name: impl Into<String>) -> Self {
        Self::Section(name.into())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main attributes"),
            Self::Section(name) => write!(f, "section {:?}", name),
        }
    }
}

/// Errors surfaced by [`Manifest`](crate::Manifest) operations.
///
/// Mutation errors are returned from the call that introduced the bad data.
/// Evaluation errors and cycles only surface when the effective manifest is
/// computed or written.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Invalid key, null value, duplicate key or failed evaluation
    #[error("{scope}: {error}")]
    Attribute {
        scope: Scope,
        #[source]
        error: AttributeError,
    },

    #[error("invalid section name {name:?}: {reason}")]
    InvalidSectionName { name: String, reason: String },

    #[error("cyclic merge: {}", chain.join(" -> "))]
    CyclicMerge { chain: Vec<String> },

    #[error("malformed manifest from {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: FormatError,
    },

    /// Failure inside a merge source's own effective manifest
    #[error("merge source {origin}: {source}")]
    Source {
        origin: String,
        #[source]
        source: Box<ManifestError>,
    },

    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ManifestError {
    pub(crate) fn attribute(scope: Scope, error: AttributeError) -> Self {
        Self::Attribute { scope, error }
    }

    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Attribute the error to the merge source `origin`. Cycles already
    /// carry the full chain and are returned unchanged.
    pub(crate) fn in_source(self, origin: impl Into<String>) -> Self {
        match self {
            Self::CyclicMerge { .. } => self,
            other => Self::Source {
                origin: origin.into(),
                source: Box::new(other),
            },
        }
    }

    /// The error with every merge-source wrapper removed.
    pub fn innermost(&self) -> &ManifestError {
        match self {
            Self::Source { source, .. } => source.innermost(),
            other => other,
        }
    }

    /// Merge-source labels from the outermost source inwards.
    pub fn source_path(&self) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self;
        while let Self::Source { origin, source } = current {
            path.push(origin.as_str());
            current = &**source;
        }
        path
    }

    /// The underlying attribute error, if this is one.
    pub fn attribute_error(&self) -> Option<&AttributeError> {
        match self {
            Self::Attribute { error, .. } => Some(error),
            _ => None,
        }
    }

    /// The scope of an attribute error, if this is one.
    pub fn scope(&self) -> Option<&Scope> {
        match self {
            Self::Attribute { scope, .. } => Some(scope),
            _ => None,
        }
    }
}
