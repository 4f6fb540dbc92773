//! Production rules of the query grammar.

use std::fmt;

use crate::model::{Ngram, NodeKind};

use crate::model::NodeKind::{
    Aggregation as OP, And as AND, Attribute as ATTR, ComparisonOperator as COP, Count as COUNT,
    Fact as FACT, GroupByClause as GC, GroupByTerm as GB, Measure as MEA, MeasureClause as MC,
    Or as OR, Query as Q, SelectionClause as SC, Value as VAL,
};

/// A production `ret ::= body[0] body[1] ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub name: &'static str,
    pub ret: NodeKind,
    pub body: &'static [NodeKind],
}

impl Rule {
    const fn new(name: &'static str, ret: NodeKind, body: &'static [NodeKind]) -> Self {
        Self { name, ret, body }
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the kinds of `ngrams` are exactly the rule body.
    pub fn matches(&self, ngrams: &[Ngram]) -> bool {
        ngrams.len() == self.body.len() && ngrams.iter().zip(self.body).all(|(n, k)| n.kind == *k)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ::=", self.name, self.ret)?;
        for kind in self.body {
            write!(f, " {}", kind)?;
        }
        Ok(())
    }
}

/// Rules tried together at each position, in priority order.
pub type RuleGroup = &'static [Rule];

pub const MEASURE_RULES: RuleGroup = &[
    Rule::new("M1", MC, &[OP, MEA]),
    Rule::new("M2", MC, &[MEA, OP]),
    Rule::new("M5", MC, &[COUNT, FACT]),
    Rule::new("M3", MC, &[MEA]),
    Rule::new("M4", MC, &[MC, MC]),
];

pub const GROUP_BY_RULES: RuleGroup = &[
    Rule::new("G1", GC, &[GB, ATTR]),
    Rule::new("G2", GC, &[GC, ATTR]),
];

pub const SELECTION_RULES: RuleGroup = &[
    Rule::new("S1", SC, &[ATTR, COP, VAL]),
    Rule::new("S2", SC, &[VAL, COP, ATTR]),
    Rule::new("S3", SC, &[ATTR, VAL]),
    Rule::new("S4", SC, &[VAL, ATTR]),
    Rule::new("S5", SC, &[SC, AND, SC]),
    Rule::new("S6", SC, &[SC, OR, SC]),
    Rule::new("S7", SC, &[VAL]),
];

pub const QUERY_RULES: RuleGroup = &[
    Rule::new("Q1", Q, &[GC, SC, MC]),
    Rule::new("Q2", Q, &[GC, MC, SC]),
    Rule::new("Q3", Q, &[SC, GC, MC]),
    Rule::new("Q4", Q, &[SC, MC, GC]),
    Rule::new("Q5", Q, &[MC, GC, SC]),
    Rule::new("Q6", Q, &[MC, SC, GC]),
    Rule::new("Q7", Q, &[MC, GC]),
    Rule::new("Q8", Q, &[GC, MC]),
    Rule::new("Q9", Q, &[MC, SC]),
    Rule::new("Q10", Q, &[SC, MC]),
    Rule::new("Q11", Q, &[MC]),
];

/// The grammar: measure, group-by, selection and query rules, in that order.
pub const GRAMMAR: &[RuleGroup] = &[MEASURE_RULES, GROUP_BY_RULES, SELECTION_RULES, QUERY_RULES];
