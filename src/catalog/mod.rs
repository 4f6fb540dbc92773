//! Read-only access to warehouse metadata.
//!
//! The [`Catalog`] trait abstracts over the store holding the warehouse
//! description: schema elements, their synonyms, measure/operator
//! compatibility, member domains and join columns. Two implementations ship
//! with the crate:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Catalog                             │
//! │  synonyms()              operators_for_measure()             │
//! │  predicate()             level_of_member()                   │
//! │  value_domain()          attributes_for_value()              │
//! │  year_attributes()       fact_table()      join_path()       │
//! └──────────────────────────────────────────────────────────────┘
//!            │                                     │
//!            ▼                                     ▼
//!   InMemoryCatalog (TOML / builder)     SqliteCatalog (relational store)
//! ```
//!
//! Synonym scoring and caching live in [`crate::cache::SynonymCache`], which
//! reads the raw rows exposed by [`Catalog::synonyms`].

mod memory;
pub mod sample;
mod sqlite;

pub use memory::{
    CatalogSpec, FactSpec, HierarchySpec, InMemoryCatalog, LevelSpec, MeasureSpec, MemberSpec,
    PredicateSpec, TableSpec,
};
pub use sqlite::SqliteCatalog;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::Entity;

/// Names of the catalog tables an entity can come from.
pub mod tables {
    pub const TABLE: &str = "table";
    pub const COLUMN: &str = "column";
    pub const RELATIONSHIP: &str = "relationship";
    pub const FACT: &str = "fact";
    pub const HIERARCHY: &str = "hierarchy";
    pub const LEVEL: &str = "level";
    pub const MEMBER: &str = "member";
    pub const MEASURE: &str = "measure";
    pub const GROUP_BY_OPERATOR: &str = "groupbyoperator";
    pub const GROUP_BY_OPERATOR_OF_MEASURE: &str = "groupbyoperator_of_measure";
    pub const SYNONYM: &str = "synonym";
    pub const LANGUAGE_PREDICATE: &str = "language_predicate";
}

/// Name of the level used for the year heuristic unless configured otherwise.
pub const DEFAULT_YEAR_LEVEL: &str = "the_year";

/// Maximum number of members returned by [`Catalog::value_domain`].
pub const VALUE_DOMAIN_LIMIT: usize = 5;

/// Errors raised by catalog implementations.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Catalog file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("No fact table defined")]
    NoFactTable,

    #[error("No join path from fact {fact} to table {table}")]
    NoJoinPath { fact: i64, table: i64 },

    #[error("Invalid catalog: {0}")]
    Invalid(String),

    #[error("Catalog connection lock poisoned")]
    LockPoisoned,
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// A synonym term and the entities it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synonym {
    /// The term split into lower-case tokens.
    pub term: Vec<String>,
    pub entities: Vec<Entity>,
}

impl Synonym {
    /// Build a synonym from raw text: underscores separate tokens like spaces.
    pub fn from_text(text: &str, entities: Vec<Entity>) -> Self {
        Self {
            term: split_term(text),
            entities,
        }
    }

    pub fn text(&self) -> String {
        self.term.join(" ")
    }
}

/// Split a catalog term into lower-case tokens.
pub fn split_term(text: &str) -> Vec<String> {
    text.replace('_', " ")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect()
}

/// Stored sub-kind of a language predicate row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateKind {
    #[serde(alias = "COUNTOPERATOR")]
    CountOperator,
    Select,
    #[serde(alias = "GROUPBYOPERATOR")]
    GroupByOperator,
    #[serde(alias = "GROUPBYTERM")]
    GroupByTerm,
    #[serde(alias = "SELECTIONTERM")]
    SelectionTerm,
    Predicate,
    #[serde(alias = "BOOLEANOPERATOR")]
    BooleanOperator,
}

impl PredicateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredicateKind::CountOperator => "COUNTOPERATOR",
            PredicateKind::Select => "SELECT",
            PredicateKind::GroupByOperator => "GROUPBYOPERATOR",
            PredicateKind::GroupByTerm => "GROUPBYTERM",
            PredicateKind::SelectionTerm => "SELECTIONTERM",
            PredicateKind::Predicate => "PREDICATE",
            PredicateKind::BooleanOperator => "BOOLEANOPERATOR",
        }
    }
}

impl FromStr for PredicateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('_', "").as_str() {
            "COUNTOPERATOR" => Ok(PredicateKind::CountOperator),
            "SELECT" => Ok(PredicateKind::Select),
            "GROUPBYOPERATOR" => Ok(PredicateKind::GroupByOperator),
            "GROUPBYTERM" => Ok(PredicateKind::GroupByTerm),
            "SELECTIONTERM" => Ok(PredicateKind::SelectionTerm),
            "PREDICATE" => Ok(PredicateKind::Predicate),
            "BOOLEANOPERATOR" => Ok(PredicateKind::BooleanOperator),
            _ => Err(s.to_string()),
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A language predicate row: its raw stored kind and its literal.
///
/// The kind stays a string because the store is open-ended; it is parsed
/// with [`PredicateKind::from_str`] by the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub kind: String,
    pub literal: String,
}

/// Identity of the fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactTable {
    pub id: i64,
    pub name: String,
}

/// How a dimension table joins the fact table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPath {
    /// Dimension table name.
    pub table: String,
    /// Column shared by the fact and the dimension table.
    pub column: String,
}

/// Read-only warehouse metadata.
///
/// All lookups are side-effect free from the caller's point of view;
/// implementations may cache internally.
pub trait Catalog: Send + Sync {
    /// Every synonym term with the entities it names.
    fn synonyms(&self) -> CatalogResult<Vec<Synonym>>;

    /// Stored kind and literal of a language predicate.
    fn predicate(&self, id: i64) -> CatalogResult<Predicate>;

    /// Aggregation operators legal for a measure.
    ///
    /// An empty list means no operator is legal: an explicit operator is a
    /// mismatch and a bare measure has no default aggregation.
    fn operators_for_measure(&self, measure: &str) -> CatalogResult<Vec<Entity>>;

    /// The attribute (level) owning a member.
    fn level_of_member(&self, member: &Entity) -> CatalogResult<Entity>;

    /// Members of an attribute, at most [`VALUE_DOMAIN_LIMIT`].
    fn value_domain(&self, attribute: &str) -> CatalogResult<Vec<Entity>>;

    /// Attributes having a member with the given name.
    fn attributes_for_value(&self, value: &str) -> CatalogResult<Vec<Entity>>;

    /// Attributes holding calendar years.
    fn year_attributes(&self) -> CatalogResult<Vec<Entity>>;

    fn fact_table(&self) -> CatalogResult<FactTable>;

    /// Join of a dimension table against the fact table.
    fn join_path(&self, fact_id: i64, table_id: i64) -> CatalogResult<JoinPath>;
}
