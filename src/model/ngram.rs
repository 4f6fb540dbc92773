//! Ngrams: typed, scored fragments of a sentence and the parse trees built from them.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::entity::Entity;

/// Semantic tag of an ngram.
///
/// Leaf kinds come from segmentation; clause kinds and [`NodeKind::Query`]
/// are produced by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeKind {
    /// A member or a literal.
    Value,
    Measure,
    /// A level of a hierarchy.
    Attribute,
    Hierarchy,
    Fact,
    /// Aggregation operator (`sum`, `avg`, ...).
    Aggregation,
    /// Group-by marker (`by`, `per`).
    GroupByTerm,
    /// Selection marker (`where`, `for`).
    SelectionTerm,
    ComparisonOperator,
    Between,
    And,
    Or,
    Not,
    Select,
    Count,
    /// Container for tokens not covered by any fragment.
    Bin,
    MeasureClause,
    GroupByClause,
    SelectionClause,
    Query,
    /// Synthetic root wrapping a whole forest.
    Root,
}

impl NodeKind {
    /// Short code used in tree renderings and comparisons.
    pub fn code(&self) -> &'static str {
        match self {
            NodeKind::Value => "VAL",
            NodeKind::Measure => "MEA",
            NodeKind::Attribute => "ATTR",
            NodeKind::Hierarchy => "H",
            NodeKind::Fact => "FACT",
            NodeKind::Aggregation => "OP",
            NodeKind::GroupByTerm => "GB",
            NodeKind::SelectionTerm => "WHR",
            NodeKind::ComparisonOperator => "COP",
            NodeKind::Between => "BETWEEN",
            NodeKind::And => "AND",
            NodeKind::Or => "OR",
            NodeKind::Not => "NOT",
            NodeKind::Select => "SELECT",
            NodeKind::Count => "COUNT",
            NodeKind::Bin => "BIN",
            NodeKind::MeasureClause => "MC",
            NodeKind::GroupByClause => "GC",
            NodeKind::SelectionClause => "SC",
            NodeKind::Query => "Q",
            NodeKind::Root => "FOO",
        }
    }

    /// Whether this kind is one of the three clause kinds.
    pub fn is_clause(&self) -> bool {
        matches!(
            self,
            NodeKind::MeasureClause | NodeKind::GroupByClause | NodeKind::SelectionClause
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Kind of semantic defect attached to a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AnnotationKind {
    /// Aggregation operator not legal for the measure (MDMV).
    MeasureOperatorMismatch,
    /// Value outside the domain of the attribute (AVM).
    AttributeValueMismatch,
    /// Measure without aggregation and no single default (MA).
    MissingAggregation,
    /// Value belonging to more than one attribute (AA).
    AmbiguousAttribute,
}

impl AnnotationKind {
    pub fn code(&self) -> &'static str {
        match self {
            AnnotationKind::MeasureOperatorMismatch => "MDMV",
            AnnotationKind::AttributeValueMismatch => "AVM",
            AnnotationKind::MissingAggregation => "MA",
            AnnotationKind::AmbiguousAttribute => "AA",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Inclusive token range `[left, right]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Span {
    pub left: usize,
    pub right: usize,
}

impl Span {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// Number of tokens covered.
    pub fn len(&self) -> usize {
        self.right - self.left + 1
    }

    /// Whether `other` lies entirely inside this span.
    pub fn contains(&self, other: &Span) -> bool {
        self.left <= other.left && other.right <= self.right
    }
}

/// A labeled span of the sentence, or a parse-tree node built over such spans.
///
/// Leaves are created by segmentation; internal nodes only by rule
/// application or inference. A node's meaning is defined by its children.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ngram {
    /// Source text covered by the ngram.
    pub tokens: String,
    pub kind: NodeKind,
    pub entity: Entity,
    /// Similarity in `[0, 1]`; the mean over leaves for internal nodes.
    pub similarity: f64,
    /// Synonym term the leaf was matched through.
    pub synonym: Option<String>,
    pub span: Span,
    pub children: Vec<Ngram>,
    pub annotations: BTreeMap<AnnotationKind, Vec<Entity>>,
}

impl Eq for Ngram {}

impl Hash for Ngram {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
        self.kind.hash(state);
        self.entity.hash(state);
        self.similarity.to_bits().hash(state);
        self.synonym.hash(state);
        self.span.hash(state);
        self.children.hash(state);
        self.annotations.hash(state);
    }
}

impl Ngram {
    /// An exact leaf match (similarity 1.0).
    pub fn leaf(tokens: impl Into<String>, kind: NodeKind, entity: Entity, span: Span) -> Self {
        Self::matched(tokens, kind, entity, 1.0, None, span)
    }

    /// A leaf matched through a synonym with the given similarity.
    pub fn matched(
        tokens: impl Into<String>,
        kind: NodeKind,
        entity: Entity,
        similarity: f64,
        synonym: Option<String>,
        span: Span,
    ) -> Self {
        Self {
            tokens: tokens.into(),
            kind,
            entity,
            similarity,
            synonym,
            span,
            children: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// An internal node over `children`.
    pub fn node(kind: NodeKind, children: Vec<Ngram>) -> Self {
        let mut node = Self {
            tokens: String::new(),
            kind,
            entity: Entity::named(kind.code()),
            similarity: 0.0,
            synonym: None,
            span: Span::new(0, 0),
            children: Vec::new(),
            annotations: BTreeMap::new(),
        };
        node.set_children(children);
        node
    }

    /// Replace the children of a node, recomputing derived fields.
    pub fn with_children(mut self, children: Vec<Ngram>) -> Self {
        self.set_children(children);
        self
    }

    fn set_children(&mut self, children: Vec<Ngram>) {
        self.children = children;
        if self.children.is_empty() {
            return;
        }
        let leaves = self.leaves();
        let tokens = leaves
            .iter()
            .map(|l| l.tokens.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let similarity = leaves.iter().map(|l| l.similarity).sum::<f64>() / leaves.len() as f64;
        let left = leaves.iter().map(|l| l.span.left).min().unwrap_or(0);
        let right = leaves.iter().map(|l| l.span.right).max().unwrap_or(0);
        self.tokens = tokens;
        self.similarity = similarity;
        self.span = Span::new(left, right);
    }

    /// Attach a diagnostic to this node.
    pub fn annotate(mut self, kind: AnnotationKind, candidates: Vec<Entity>) -> Self {
        self.annotations.insert(kind, candidates);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Leaves of the subtree in left-to-right order.
    pub fn leaves(&self) -> Vec<&Ngram> {
        let mut acc = Vec::new();
        collect_leaves(self, &mut acc);
        acc
    }

    /// Number of nodes in the subtree, self included.
    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(Ngram::count_nodes).sum::<usize>()
    }

    /// First direct child of the given kind.
    pub fn child(&self, kind: NodeKind) -> Option<&Ngram> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Whether every child is a leaf (and there is at least one).
    pub fn is_simple_clause(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(Ngram::is_leaf)
    }

    /// Simple clauses of the subtree in depth-first order.
    pub fn simple_clauses(&self) -> Vec<&Ngram> {
        let mut acc = Vec::new();
        collect_simple_clauses(self, &mut acc);
        acc
    }

    /// Rebuild the tree, passing every simple clause through `f`.
    pub fn try_map_simple_clauses<E, F>(mut self, f: &mut F) -> Result<Ngram, E>
    where
        F: FnMut(Ngram) -> Result<Ngram, E>,
    {
        if self.is_leaf() {
            return Ok(self);
        }
        if self.is_simple_clause() {
            return f(self);
        }
        let children = std::mem::take(&mut self.children)
            .into_iter()
            .map(|c| c.try_map_simple_clauses(f))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(self.with_children(children))
    }

    /// A selection clause whose only child is a value.
    pub fn is_dangling_value(&self) -> bool {
        self.kind == NodeKind::SelectionClause
            && self.children.len() == 1
            && self.children[0].kind == NodeKind::Value
    }

    /// Bracketed rendering of the subtree, one leaf per entity.
    pub fn to_string_tree(&self) -> String {
        if self.is_leaf() {
            return format!("{}:{}", self.kind, self.entity.name);
        }
        let children = self
            .children
            .iter()
            .map(Ngram::to_string_tree)
            .collect::<Vec<_>>()
            .join(" ");
        format!("{{{} {}}}", self.kind, children)
    }
}

fn collect_leaves<'a>(ngram: &'a Ngram, acc: &mut Vec<&'a Ngram>) {
    if ngram.is_leaf() {
        acc.push(ngram);
    } else {
        for child in &ngram.children {
            collect_leaves(child, acc);
        }
    }
}

fn collect_simple_clauses<'a>(ngram: &'a Ngram, acc: &mut Vec<&'a Ngram>) {
    if ngram.is_leaf() {
        return;
    }
    if ngram.is_simple_clause() {
        acc.push(ngram);
        return;
    }
    for child in &ngram.children {
        collect_simple_clauses(child, acc);
    }
}

impl fmt::Display for Ngram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_leaf() {
            return write!(
                f,
                "{}:{}[{};{}]",
                self.kind, self.entity, self.span.left, self.span.right
            );
        }
        write!(f, "{}(", self.kind)?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", child)?;
        }
        f.write_str(")")
    }
}
