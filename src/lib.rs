//! # parlance
//!
//! Translates natural-language questions over a data warehouse into
//! analytical SQL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        "average revenue by city in 1997"                 │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [segment]  catalog synonyms
//! ┌─────────────────────────────────────────────────────────┐
//! │   Fragments (leaf ngrams over token spans)               │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [mapping]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Mappings (non-overlapping fragment sequences)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [grammar]
//! ┌─────────────────────────────────────────────────────────┐
//! │   Best QUERY tree                                        │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [semantic]  infer + validate
//! ┌─────────────────────────────────────────────────────────┐
//! │   Annotated QUERY tree                                   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [sql]  joins from the catalog
//! ┌─────────────────────────────────────────────────────────┐
//! │   SELECT ... FROM fact FT INNER JOIN ... WHERE ...       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! [`Interpreter`] runs the whole pipeline; [`InterpretService`] runs it
//! under a deadline from async code.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod grammar;
pub mod interpret;
pub mod mapping;
pub mod model;
pub mod segment;
pub mod semantic;
pub mod service;
pub mod sql;

pub use catalog::{Catalog, CatalogError, InMemoryCatalog, SqliteCatalog};
pub use config::{InterpretSettings, Settings, SettingsError};
pub use interpret::{CompiledQuery, Diagnostic, InterpretStats, Interpreter, QueryParts};
pub use model::{AnnotationKind, DataType, Entity, Mapping, Ngram, NodeKind, Span};
pub use semantic::{InterpretError, InterpretResult};
pub use service::{InterpretService, ServiceError};
pub use sql::{SqlQuery, NO_QUERY};
