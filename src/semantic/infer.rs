//! Completion of under-specified simple clauses.
//!
//! - `MC(MEA)`: add the measure's operator when exactly one is legal,
//!   otherwise annotate `MA` with the legal ones.
//! - `SC(ATTR, VAL)` in either order: becomes `SC(ATTR, =, VAL)`.
//! - `SC(VAL)`: find the attribute from the value.
//!   - NUMERIC in the year range: the catalog's year attribute.
//!   - STRING: the single attribute owning the member, `AA` when several do.
//!   - other NUMERIC values and DATE values are fatal.

use std::ops::RangeInclusive;

use super::error::{InterpretError, InterpretResult};
use crate::catalog::Catalog;
use crate::model::{AnnotationKind, DataType, Entity, Mapping, Ngram, NodeKind, Span};

/// Numbers read as calendar years when standing alone.
pub const YEAR_RANGE: RangeInclusive<f64> = 1900.0..=2155.0;

pub struct InferenceEngine<'a> {
    catalog: &'a dyn Catalog,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self { catalog }
    }

    /// Complete every simple clause of every tree in the mapping.
    pub fn infer(&self, mapping: Mapping) -> InterpretResult<Mapping> {
        super::map_clauses(mapping, &mut |clause| self.infer_clause(clause))
    }

    pub fn infer_clause(&self, clause: Ngram) -> InterpretResult<Ngram> {
        match clause.kind {
            NodeKind::MeasureClause => self.infer_operator(clause),
            NodeKind::SelectionClause => match clause.children.len() {
                1 => self.infer_attribute(clause),
                2 => Ok(add_equality(clause)),
                _ => Ok(clause),
            },
            _ => Ok(clause),
        }
    }

    fn infer_operator(&self, clause: Ngram) -> InterpretResult<Ngram> {
        if clause.children.len() != 1 || clause.children[0].kind != NodeKind::Measure {
            return Ok(clause);
        }
        let mea = &clause.children[0];
        let mut legal = self.catalog.operators_for_measure(&mea.entity.name)?;
        if legal.len() != 1 {
            return Ok(clause.annotate(AnnotationKind::MissingAggregation, legal));
        }

        let operator = legal.remove(0);
        let op = Ngram::leaf(
            operator.name.clone(),
            NodeKind::Aggregation,
            operator,
            mea.span,
        );
        let mea = mea.clone();
        Ok(clause.with_children(vec![op, mea]))
    }

    fn infer_attribute(&self, clause: Ngram) -> InterpretResult<Ngram> {
        let val = &clause.children[0];
        if val.kind != NodeKind::Value {
            return Ok(clause);
        }

        let attribute = match val.entity.data_type() {
            DataType::Numeric => {
                let number = val.tokens.replace(',', ".").parse::<f64>().ok();
                match number {
                    Some(n) if YEAR_RANGE.contains(&n) => {
                        let years = self.catalog.year_attributes()?;
                        let year = years.into_iter().next().ok_or_else(|| {
                            InterpretError::MissingYearAttribute {
                                value: val.tokens.clone(),
                            }
                        })?;
                        Some(year)
                    }
                    _ => {
                        return Err(InterpretError::DanglingValue {
                            value: val.tokens.clone(),
                            data_type: DataType::Numeric,
                        })
                    }
                }
            }
            DataType::Date => {
                return Err(InterpretError::DanglingValue {
                    value: val.tokens.clone(),
                    data_type: DataType::Date,
                })
            }
            DataType::String => {
                let mut owners = self.catalog.attributes_for_value(&val.entity.name)?;
                match owners.len() {
                    0 => None,
                    1 => Some(owners.remove(0)),
                    _ => return Ok(clause.annotate(AnnotationKind::AmbiguousAttribute, owners)),
                }
            }
            DataType::Other => {
                return Err(InterpretError::UnsupportedDataType {
                    value: val.tokens.clone(),
                })
            }
        };

        let Some(attribute) = attribute else {
            return Ok(clause);
        };
        let span = val.span;
        let attr = Ngram::leaf(attribute.name.clone(), NodeKind::Attribute, attribute, span);
        let val = val.clone();
        Ok(clause.with_children(vec![attr, equality(span), val]))
    }
}

/// Implicit `=` operator.
fn equality(span: Span) -> Ngram {
    Ngram::leaf("=", NodeKind::ComparisonOperator, Entity::named("="), span)
}

/// `SC(ATTR, VAL)` or `SC(VAL, ATTR)` becomes `SC(ATTR, =, VAL)`.
fn add_equality(clause: Ngram) -> Ngram {
    let (Some(attr), Some(val)) = (
        clause.child(NodeKind::Attribute).cloned(),
        clause.child(NodeKind::Value).cloned(),
    ) else {
        return clause;
    };
    let eq = equality(attr.span);
    clause.with_children(vec![attr, eq, val])
}
