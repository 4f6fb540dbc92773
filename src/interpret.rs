//! End-to-end interpretation of a sentence.
//!
//! ```text
//! sentence ──▶ clean ──▶ segment ──▶ enumerate ──▶ parse ──▶ infer ──▶ validate ──▶ compile
//!              tokens    fragments   mappings      best Q    ─── annotated tree ───  SqlQuery
//! ```
//!
//! Absence of an interpretation is `Ok(None)`. Semantic defects travel as
//! annotations and are listed by [`CompiledQuery::diagnostics`]. Inputs the
//! catalog cannot account for are errors.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::cache::SynonymCache;
use crate::catalog::Catalog;
use crate::config::InterpretSettings;
use crate::grammar::GrammarEngine;
use crate::mapping::MappingEnumerator;
use crate::model::{AnnotationKind, Entity, Mapping, Ngram, NodeKind};
use crate::segment::{clean_sentence, Segmenter};
use crate::semantic::{InferenceEngine, InterpretResult, Validator};
use crate::sql::{SqlCompiler, SqlQuery, NO_QUERY};

/// Counters and timings of one interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InterpretStats {
    /// Tokens after cleaning, space-joined.
    pub sentence: String,
    pub matched: usize,
    pub confident: usize,
    /// Fragments left after pruning.
    pub retained: usize,
    pub mappings: usize,
    pub matching: Duration,
    pub enumeration: Duration,
    pub parsing: Duration,
}

/// A semantic defect found on a clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// Tree rendering of the annotated clause.
    pub clause: String,
    pub kind: AnnotationKind,
    /// Alternatives the catalog offers.
    pub candidates: Vec<Entity>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let candidates = self
            .candidates
            .iter()
            .map(|e| e.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} on {}: [{}]", self.kind, self.clause, candidates)
    }
}

/// `measure\group-by\selection` summary of a QUERY tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryParts {
    pub measure: String,
    pub group_by: String,
    pub selection: String,
}

impl QueryParts {
    pub fn from_query(query: &Ngram) -> Self {
        let mut parts = QueryParts::default();
        for clause in &query.children {
            match clause.kind {
                NodeKind::MeasureClause => parts.measure = measure_summary(clause),
                NodeKind::GroupByClause => {
                    parts.group_by = clause
                        .leaves()
                        .iter()
                        .filter(|l| l.kind != NodeKind::GroupByTerm)
                        .map(|l| l.entity.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                }
                NodeKind::SelectionClause => {
                    parts.selection = clause
                        .leaves()
                        .iter()
                        .map(|l| l.entity.name.as_str())
                        .collect::<Vec<_>>()
                        .join(" ");
                }
                _ => {}
            }
        }
        parts
    }
}

impl fmt::Display for QueryParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}\\{}", self.measure, self.group_by, self.selection)
    }
}

/// `op measure` for every measure of the clause.
fn measure_summary(clause: &Ngram) -> String {
    let mut out = Vec::new();
    let mut op: Option<&str> = None;
    for leaf in clause.leaves() {
        match leaf.kind {
            NodeKind::Aggregation | NodeKind::Count => op = Some(leaf.entity.name.as_str()),
            NodeKind::Measure | NodeKind::Fact => {
                let op = op.take().unwrap_or(crate::sql::compiler::DEFAULT_AGGREGATION);
                out.push(format!("{} {}", op, leaf.entity.name));
            }
            _ => {}
        }
    }
    out.join(", ")
}

/// Result of interpreting a sentence.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    /// Cleaned tokens.
    pub tokens: Vec<String>,
    /// The selected mapping after inference and validation.
    pub mapping: Mapping,
    pub query: SqlQuery,
    pub stats: InterpretStats,
}

impl CompiledQuery {
    pub fn sql(&self) -> String {
        self.query.to_sql()
    }

    /// Bracketed rendering of the QUERY tree.
    pub fn tree(&self) -> String {
        self.mapping
            .query()
            .map(Ngram::to_string_tree)
            .unwrap_or_default()
    }

    pub fn parts(&self) -> QueryParts {
        self.mapping
            .query()
            .map(QueryParts::from_query)
            .unwrap_or_default()
    }

    /// Every annotation in the mapping, in depth-first order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for ngram in self.mapping.ngrams() {
            collect_diagnostics(ngram, &mut out);
        }
        out
    }

    /// Top-level ngrams plus BIN leaves for tokens nothing matched.
    pub fn with_unmatched(&self) -> Vec<Ngram> {
        self.mapping.fill_unmatched(&self.tokens)
    }
}

fn collect_diagnostics(ngram: &Ngram, out: &mut Vec<Diagnostic>) {
    for (kind, candidates) in &ngram.annotations {
        out.push(Diagnostic {
            clause: ngram.to_string_tree(),
            kind: *kind,
            candidates: candidates.clone(),
        });
    }
    for child in &ngram.children {
        collect_diagnostics(child, out);
    }
}

/// Interprets sentences against one catalog.
pub struct Interpreter {
    catalog: Arc<dyn Catalog>,
    cache: SynonymCache,
    settings: InterpretSettings,
    stop_words: HashSet<String>,
    grammar: GrammarEngine,
}

impl Interpreter {
    pub fn new(catalog: Arc<dyn Catalog>, settings: InterpretSettings) -> Self {
        let stop_words = settings.stop_word_set();
        Self {
            catalog,
            cache: SynonymCache::new(),
            settings,
            stop_words,
            grammar: GrammarEngine::new(),
        }
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn settings(&self) -> &InterpretSettings {
        &self.settings
    }

    /// The synonym cache; invalidate it after the catalog changes.
    pub fn cache(&self) -> &SynonymCache {
        &self.cache
    }

    /// Cleaned tokens of a sentence.
    pub fn tokens(&self, sentence: &str) -> Vec<String> {
        clean_sentence(sentence, &self.stop_words, self.settings.skip_cleaning)
    }

    /// Best interpretation of the sentence, if any mapping reduces to a query.
    pub fn interpret(&self, sentence: &str) -> InterpretResult<Option<CompiledQuery>> {
        let catalog = self.catalog.as_ref();
        let tokens = self.tokens(sentence);
        let mut stats = InterpretStats {
            sentence: tokens.join(" "),
            ..InterpretStats::default()
        };

        let started = Instant::now();
        let segmenter = Segmenter::new(catalog, &self.cache, self.settings.segment_options());
        let segmentation = segmenter.segment(&tokens)?;
        stats.matching = started.elapsed();
        stats.matched = segmentation.matched;
        stats.confident = segmentation.confident;
        stats.retained = segmentation.fragments.len();

        let started = Instant::now();
        let enumerator = MappingEnumerator::new(self.settings.enumerate_options());
        let mappings = enumerator.enumerate(&segmentation.fragments, tokens.len());
        stats.enumeration = started.elapsed();
        stats.mappings = mappings.len();

        let started = Instant::now();
        let best = self.grammar.parse_all(&mappings);
        stats.parsing = started.elapsed();

        let Some(best) = best else {
            tracing::debug!(sentence = %stats.sentence, mappings = stats.mappings, "no query");
            return Ok(None);
        };

        let mapping = InferenceEngine::new(catalog).infer(best)?;
        let mapping = Validator::new(catalog).validate(mapping)?;
        let Some(tree) = mapping.query() else {
            return Ok(None);
        };
        let query = SqlCompiler::new(catalog).compile(tree)?;

        let compiled = CompiledQuery {
            tokens,
            mapping,
            query,
            stats,
        };
        let diagnostics = compiled.diagnostics();
        if !diagnostics.is_empty() {
            tracing::warn!(
                sentence = %compiled.stats.sentence,
                diagnostics = diagnostics.len(),
                first = %diagnostics[0],
                "interpretation has semantic defects"
            );
        }
        tracing::debug!(
            tree = %compiled.tree(),
            matching = ?compiled.stats.matching,
            parsing = ?compiled.stats.parsing,
            "interpreted sentence"
        );
        Ok(Some(compiled))
    }

    /// SQL for the sentence, or the no-query sentinel.
    pub fn to_sql(&self, sentence: &str) -> InterpretResult<String> {
        Ok(self
            .interpret(sentence)?
            .map(|c| c.sql())
            .unwrap_or_else(|| NO_QUERY.to_string()))
    }
}
