//! Data model shared by every stage of interpretation.
//!
//! ```text
//! tokens ──▶ Ngram leaves ──▶ Mapping (forest) ──▶ Mapping with a QUERY tree
//! ```

mod entity;
mod mapping;
mod ngram;

pub use entity::{DataType, Entity, ForeignRef};
pub use mapping::Mapping;
pub use ngram::{AnnotationKind, Ngram, NodeKind, Span};
