use manifest_format::{parse_document, Attributes, Document};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::io;
use std::thread;

use super::source::{MergeSource, RegisteredSource};
use super::spec::MergeSpec;
use crate::attributes::AttributeSet;
use crate::effective::EffectiveManifest;
use crate::error::{ManifestError, Scope};
use crate::manifest::{Manifest, SharedManifest};
use crate::resolve::ResolvedSource;

/// Kind of a merge source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Manifest,
    Location,
}

/// What one merge source contributed.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRecord {
    /// Registration index
    pub index: usize,

    pub kind: SourceKind,

    /// Location, or a description for in-memory manifests
    pub origin: String,

    /// SHA-256 of the resolved bytes (locations only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,

    /// Number of the source's sections that took part
    pub sections_merged: usize,
}

/// Result of a merge: the effective manifest plus per-source provenance.
#[derive(Debug, Clone)]
pub struct Merged {
    pub manifest: EffectiveManifest,
    pub sources: Vec<SourceRecord>,
}

/// One manifest on the current resolution path.
#[derive(Debug, Clone)]
pub(crate) struct Link {
    pub id: Option<usize>,
    pub label: String,
}

impl Link {
    pub(crate) fn root(id: Option<usize>) -> Self {
        Self {
            id,
            label: "manifest".to_string(),
        }
    }
}

struct Resolved {
    doc: Document,
    sha256: Option<String>,
}

/// Compute the effective manifest of `base`. `chain` is the resolution
/// path ending at `base`.
pub(crate) fn merge(base: &Manifest, chain: &[Link]) -> Result<Merged, ManifestError> {
    let registered = base.merge_sources();
    let resolved = resolve_all(base, registered, chain)?;

    let max_key_length = base.options().max_key_length;
    let mut main = base.main_attributes().clone();
    let mut sections = base.sections().clone();
    let mut records = Vec::with_capacity(registered.len());

    // Fold strictly in registration order, however the sources were resolved
    for (index, (entry, resolved)) in registered.iter().zip(resolved).enumerate() {
        let policy = entry.spec.override_policy();

        main = main.merge(&filtered(&resolved.doc.main, &entry.spec, max_key_length), policy);

        let mut sections_merged = 0;
        for (name, attrs) in &resolved.doc.sections {
            if !entry.spec.includes_section(name) {
                tracing::trace!(index, section = %name, "section excluded by merge spec");
                continue;
            }
            let incoming = filtered(attrs, &entry.spec, max_key_length);
            let target = sections.get_or_create(name, max_key_length)?;
            *target = target.merge(&incoming, policy);
            sections_merged += 1;
        }

        tracing::debug!(
            index,
            source = %entry.source.describe(),
            sections_merged,
            "folded merge source"
        );

        records.push(SourceRecord {
            index,
            kind: match entry.source {
                MergeSource::Manifest(_) => SourceKind::Manifest,
                MergeSource::Location(_) => SourceKind::Location,
            },
            origin: entry.source.describe(),
            sha256: resolved.sha256,
            sections_merged,
        });
    }

    let mut doc = Document::new();
    doc.main = main
        .render()
        .map_err(|e| ManifestError::attribute(Scope::Main, e))?;
    for (name, attrs) in sections.iter() {
        let rendered = attrs
            .render()
            .map_err(|e| ManifestError::attribute(Scope::section(name), e))?;
        doc.sections.insert(name.to_string(), rendered);
    }

    Ok(Merged {
        manifest: EffectiveManifest::from_document(doc),
        sources: records,
    })
}

fn filtered(attrs: &Attributes, spec: &MergeSpec, max_key_length: usize) -> AttributeSet {
    if spec.exclude_keys.is_empty() {
        return AttributeSet::from_rendered(attrs, max_key_length);
    }
    let kept: Attributes = attrs
        .iter()
        .filter(|(key, _)| !spec.excludes_key(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    AttributeSet::from_rendered(&kept, max_key_length)
}

/// Resolve every source. Results come back in registration order; the
/// first failing source (by registration order) is reported.
fn resolve_all(
    base: &Manifest,
    registered: &[RegisteredSource],
    chain: &[Link],
) -> Result<Vec<Resolved>, ManifestError> {
    if !base.parallel_resolution() || registered.len() < 2 {
        return registered
            .iter()
            .enumerate()
            .map(|(index, entry)| resolve_one(base, index, &entry.source, chain))
            .collect();
    }

    let results: Vec<Result<Resolved, ManifestError>> = thread::scope(|scope| {
        let handles: Vec<_> = registered
            .iter()
            .enumerate()
            .map(|(index, entry)| scope.spawn(move || resolve_one(base, index, &entry.source, chain)))
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect()
    });

    results.into_iter().collect()
}

fn resolve_one(
    base: &Manifest,
    index: usize,
    source: &MergeSource,
    chain: &[Link],
) -> Result<Resolved, ManifestError> {
    let label = format!("from[{}] {}", index, source.describe());

    let location = match source {
        MergeSource::Manifest(shared) => {
            let doc = resolve_shared(shared, label, chain)?;
            return Ok(Resolved { doc, sha256: None });
        }
        MergeSource::Location(location) => location,
    };

    let context = format!("resolving merge source {}", location);
    let resolver = base.resolver().ok_or_else(|| {
        ManifestError::io(
            context.clone(),
            io::Error::new(io::ErrorKind::NotFound, "no source resolver configured"),
        )
    })?;

    match resolver.resolve(location).map_err(|e| ManifestError::io(context, e))? {
        ResolvedSource::Bytes(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let sha256 = hex::encode(hasher.finalize());

            let doc = parse_document(&bytes, base.options()).map_err(|source| ManifestError::Malformed {
                origin: location.to_string(),
                source,
            })?;

            tracing::debug!(index, location = %location, sha256 = %sha256, "resolved merge source");
            Ok(Resolved {
                doc,
                sha256: Some(sha256),
            })
        }
        ResolvedSource::Manifest(shared) => {
            let doc = resolve_shared(&shared, label, chain)?;
            Ok(Resolved { doc, sha256: None })
        }
    }
}

fn resolve_shared(shared: &SharedManifest, label: String, chain: &[Link]) -> Result<Document, ManifestError> {
    let id = shared.id();
    if chain.iter().any(|link| link.id == Some(id)) {
        let mut labels: Vec<String> = chain.iter().map(|link| link.label.clone()).collect();
        labels.push(label);
        return Err(ManifestError::CyclicMerge { chain: labels });
    }

    let mut path = chain.to_vec();
    path.push(Link {
        id: Some(id),
        label: label.clone(),
    });

    let manifest = shared.read();
    let merged = merge(&manifest, &path).map_err(|e| e.in_source(label))?;
    Ok(merged.manifest.into_document())
}
