//! Type checking of simple clauses.
//!
//! Defects are recorded as annotations; the tree is otherwise unchanged.
//!
//! | Clause | Check | Annotation |
//! |---|---|---|
//! | `MC(OP, MEA)` | operator legal for the measure | `MDMV` + legal operators |
//! | `SC(.. ATTR .. VAL ..)` | value type and owner match the attribute | `AVM` + value domain |
//! | `GC` | none | |

use super::error::InterpretResult;
use crate::catalog::Catalog;
use crate::model::{AnnotationKind, DataType, Mapping, Ngram, NodeKind};

pub struct Validator<'a> {
    catalog: &'a dyn Catalog,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self { catalog }
    }

    /// Annotate every simple clause of every tree in the mapping.
    pub fn validate(&self, mapping: Mapping) -> InterpretResult<Mapping> {
        super::map_clauses(mapping, &mut |clause| self.check_clause(clause))
    }

    pub fn check_clause(&self, clause: Ngram) -> InterpretResult<Ngram> {
        match clause.kind {
            NodeKind::MeasureClause => self.check_measure(clause),
            NodeKind::SelectionClause => self.check_selection(clause),
            _ => Ok(clause),
        }
    }

    fn check_measure(&self, clause: Ngram) -> InterpretResult<Ngram> {
        if clause.children.len() != 2 {
            return Ok(clause);
        }
        // COUNT FACT has no operator to check.
        let (Some(op), Some(mea)) = (
            clause.child(NodeKind::Aggregation),
            clause.child(NodeKind::Measure),
        ) else {
            return Ok(clause);
        };

        let legal = self.catalog.operators_for_measure(&mea.entity.name)?;
        let allowed = legal
            .iter()
            .any(|o| o.name.eq_ignore_ascii_case(&op.entity.name));
        if allowed {
            return Ok(clause);
        }
        tracing::debug!(
            measure = %mea.entity.name,
            operator = %op.entity.name,
            "operator not legal for measure"
        );
        Ok(clause.annotate(AnnotationKind::MeasureOperatorMismatch, legal))
    }

    fn check_selection(&self, clause: Ngram) -> InterpretResult<Ngram> {
        if clause.children.len() < 2 {
            return Ok(clause);
        }
        let (Some(attr), Some(val)) = (
            clause.child(NodeKind::Attribute),
            clause.child(NodeKind::Value),
        ) else {
            return Ok(clause);
        };

        let attr_type = attr.entity.data_type();
        let mismatch = attr_type != val.entity.data_type()
            || (attr_type != DataType::Numeric && val.entity.reference_id() != attr.entity.id);
        if !mismatch {
            return Ok(clause);
        }
        let domain = self.catalog.value_domain(&attr.entity.name)?;
        Ok(clause.annotate(AnnotationKind::AttributeValueMismatch, domain))
    }
}
