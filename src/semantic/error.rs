//! Fatal interpretation errors.
//!
//! These mean the catalog or the grammar does not cover an input the
//! segmenter nonetheless produced. Recoverable defects are annotations on
//! the tree instead.

use crate::catalog::CatalogError;
use crate::model::DataType;

#[derive(Debug, thiserror::Error)]
pub enum InterpretError {
    #[error("Unknown boolean operator: {literal}")]
    UnknownBooleanOperator { literal: String },

    #[error("Unknown language predicate kind '{kind}' for predicate {id}")]
    UnknownPredicateKind { id: i64, kind: String },

    #[error("Entity '{entity}' comes from unknown catalog table '{table}'")]
    UnknownSourceTable { table: String, entity: String },

    #[error("Value '{value}' of type {data_type} is not attached to any attribute")]
    DanglingValue { value: String, data_type: DataType },

    #[error("Unsupported data type for value '{value}'")]
    UnsupportedDataType { value: String },

    #[error("Value '{value}' looks like a year but the catalog has no year attribute")]
    MissingYearAttribute { value: String },

    #[error("Attribute '{attribute}' has no owning table")]
    MissingTableReference { attribute: String },

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

pub type InterpretResult<T> = Result<T, InterpretError>;
