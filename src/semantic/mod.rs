//! Semantic checks over parsed mappings.
//!
//! Both passes work on simple clauses (clauses whose children are all
//! leaves) and rebuild the trees around them:
//!
//! 1. **Infer** - complete implicit operators and attributes
//! 2. **Validate** - annotate type defects
//!
//! Recoverable defects become annotations on the clause. Inputs the catalog
//! cannot account for fail with an [`InterpretError`].

pub mod error;
pub mod infer;
pub mod validate;

pub use error::{InterpretError, InterpretResult};
pub use infer::InferenceEngine;
pub use validate::Validator;

use crate::model::{Mapping, Ngram};

/// Rebuild every non-leaf top-level ngram, passing its simple clauses through `f`.
fn map_clauses<F>(mapping: Mapping, f: &mut F) -> InterpretResult<Mapping>
where
    F: FnMut(Ngram) -> InterpretResult<Ngram>,
{
    let ngrams = mapping
        .into_ngrams()
        .into_iter()
        .map(|n| n.try_map_simple_clauses(f))
        .collect::<InterpretResult<Vec<_>>>()?;
    Ok(Mapping::new(ngrams))
}
