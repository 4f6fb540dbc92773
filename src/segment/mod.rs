//! Sentence segmentation.
//!
//! Turns a cleaned token sequence into the sorted list of candidate
//! fragments the enumerator works on:
//!
//! ```text
//! tokens ──▶ every span of 1..=ngram_size tokens
//!              ├── numeric literal ──▶ VAL leaf (similarity 1.0)
//!              └── otherwise       ──▶ synonym candidates ──▶ typed leaves
//!        ──▶ prune spans dominated by a confident fragment
//!        ──▶ sort by (left asc, length desc)
//! ```

pub mod similarity;

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::cache::{SynonymCache, SynonymQuery};
use crate::catalog::{tables, Catalog, PredicateKind};
use crate::model::{DataType, Entity, Ngram, NodeKind, Span};
use crate::semantic::{InterpretError, InterpretResult};

/// Integers and decimals, with `.` or `,` as the separator.
static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+([.,]\d+)?$").unwrap());

/// Split a sentence into tokens.
///
/// Underscores separate tokens like spaces. Stop words are dropped unless
/// `skip_cleaning` is set; they are matched case-insensitively.
pub fn clean_sentence(sentence: &str, stop_words: &HashSet<String>, skip_cleaning: bool) -> Vec<String> {
    sentence
        .replace('_', " ")
        .split_whitespace()
        .filter(|t| skip_cleaning || !stop_words.contains(&t.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Whether a span of text is a numeric literal.
pub fn is_numeric(text: &str) -> bool {
    NUMERIC.is_match(text)
}

/// Parameters of segmentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentOptions {
    /// Longest span considered, in tokens.
    pub ngram_size: usize,
    pub synonyms: SynonymQuery,
    /// Similarity at or above which a fragment is confident.
    pub confidence: f64,
}

/// Outcome of segmenting a sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Pruned fragments sorted by left position, longest first.
    pub fragments: Vec<Ngram>,
    /// Fragments produced before pruning.
    pub matched: usize,
    /// Fragments at or above the confidence threshold.
    pub confident: usize,
}

/// Matches token spans against the catalog.
pub struct Segmenter<'a> {
    catalog: &'a dyn Catalog,
    cache: &'a SynonymCache,
    options: SegmentOptions,
}

impl<'a> Segmenter<'a> {
    pub fn new(catalog: &'a dyn Catalog, cache: &'a SynonymCache, options: SegmentOptions) -> Self {
        Self {
            catalog,
            cache,
            options,
        }
    }

    pub fn segment(&self, tokens: &[String]) -> InterpretResult<Segmentation> {
        let mut fragments = Vec::new();

        for i in 0..tokens.len() {
            for j in (1..=self.options.ngram_size).rev() {
                let end = i + j;
                if end > tokens.len() {
                    continue;
                }
                let span_tokens = &tokens[i..end];
                let text = span_tokens.join(" ");
                let span = Span::new(i, end - 1);

                if is_numeric(&text) {
                    let entity = Entity::literal(text.clone(), DataType::Numeric);
                    fragments.push(Ngram::leaf(text, NodeKind::Value, entity, span));
                    continue;
                }

                let lowered: Vec<String> = span_tokens.iter().map(|t| t.to_lowercase()).collect();
                let candidates = self
                    .cache
                    .lookup(self.catalog, &lowered, &self.options.synonyms)?;
                for candidate in candidates.iter() {
                    let kind = self.node_kind(&candidate.entity)?;
                    fragments.push(Ngram::matched(
                        text.clone(),
                        kind,
                        candidate.entity.clone(),
                        candidate.similarity,
                        Some(candidate.synonym.clone()),
                        span,
                    ));
                }
            }
        }

        let matched = fragments.len();
        let confident = fragments
            .iter()
            .filter(|n| n.similarity >= self.options.confidence)
            .count();
        let fragments = prune(fragments, self.options.confidence);

        tracing::debug!(
            tokens = tokens.len(),
            matched,
            confident,
            retained = fragments.len(),
            "segmented sentence"
        );

        Ok(Segmentation {
            fragments,
            matched,
            confident,
        })
    }

    /// Node kind of a leaf, from the catalog table its entity comes from.
    pub fn node_kind(&self, entity: &Entity) -> InterpretResult<NodeKind> {
        let id = match entity.id {
            Some(id) => id,
            None => return Ok(NodeKind::Value),
        };
        let table = entity.table.as_deref().unwrap_or_default();
        match table {
            tables::MEMBER => Ok(NodeKind::Value),
            tables::MEASURE => Ok(NodeKind::Measure),
            tables::LEVEL => Ok(NodeKind::Attribute),
            tables::HIERARCHY => Ok(NodeKind::Hierarchy),
            tables::FACT => Ok(NodeKind::Fact),
            tables::LANGUAGE_PREDICATE => self.predicate_kind(id),
            _ => Err(InterpretError::UnknownSourceTable {
                table: table.to_string(),
                entity: entity.name.clone(),
            }),
        }
    }

    fn predicate_kind(&self, id: i64) -> InterpretResult<NodeKind> {
        let predicate = self.catalog.predicate(id)?;
        let kind: PredicateKind =
            predicate
                .kind
                .parse()
                .map_err(|kind| InterpretError::UnknownPredicateKind { id, kind })?;

        let node = match kind {
            PredicateKind::CountOperator => NodeKind::Count,
            PredicateKind::Select => NodeKind::Select,
            PredicateKind::GroupByOperator => NodeKind::Aggregation,
            PredicateKind::GroupByTerm => NodeKind::GroupByTerm,
            PredicateKind::SelectionTerm => NodeKind::SelectionTerm,
            PredicateKind::Predicate if predicate.literal.eq_ignore_ascii_case("between") => {
                NodeKind::Between
            }
            PredicateKind::Predicate => NodeKind::ComparisonOperator,
            PredicateKind::BooleanOperator => match predicate.literal.to_lowercase().as_str() {
                "and" => NodeKind::And,
                "or" => NodeKind::Or,
                "not" => NodeKind::Not,
                _ => {
                    return Err(InterpretError::UnknownBooleanOperator {
                        literal: predicate.literal,
                    })
                }
            },
        };
        Ok(node)
    }
}

/// Drop fragments dominated by a confident fragment, then sort.
///
/// A fragment `n` is dominated by a confident `m` when `m`'s span contains
/// `n`'s and `n` is either shorter, or as long and not confident itself.
pub fn prune(mut fragments: Vec<Ngram>, confidence: f64) -> Vec<Ngram> {
    let confident: Vec<Ngram> = fragments
        .iter()
        .filter(|n| n.similarity >= confidence)
        .cloned()
        .collect();

    for m in &confident {
        fragments.retain(|n| {
            let dominated = m.span.contains(&n.span)
                && (n.span.len() < m.span.len()
                    || (n.span.len() == m.span.len() && n.similarity < confidence));
            n == m || !dominated
        });
    }

    fragments.sort_by(|a, b| {
        a.span
            .left
            .cmp(&b.span.left)
            .then_with(|| b.span.len().cmp(&a.span.len()))
    });
    fragments
}
