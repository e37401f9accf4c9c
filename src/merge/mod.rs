//! Merge engine
//!
//! Folds registered merge sources into a base manifest:
//! 1. Start from a copy of the base manifest's own attributes and sections
//! 2. Resolve every source to its own effective manifest (concurrently when
//!    enabled), then fold them in registration order
//! 3. Render every value to text
//!
//! Later sources win on key collisions, and every source wins over the
//! base manifest's directly-set attributes unless its spec keeps existing
//! values.

mod engine;
mod source;
mod spec;

pub use engine::{Merged, SourceKind, SourceRecord};
pub use source::{MergeSource, RegisteredSource, SourceLocation};
pub use spec::{MergeSpec, SectionFilter};

pub(crate) use engine::{merge, Link};
