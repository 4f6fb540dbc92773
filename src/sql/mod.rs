//! SQL generation.
//!
//! - [`compiler`] - QUERY trees to structured [`SqlQuery`] values and text
//! - [`roundtrip`] - sqlparser checks over generated text

pub mod compiler;
pub mod roundtrip;

pub use compiler::{
    Aggregate, ColumnRef, Condition, JoinClause, SqlCompiler, SqlQuery, SqlValue, NO_QUERY,
};
pub use roundtrip::{referenced_names, validate_sql};
