//! Memoized synonym lookup.
//!
//! The synonym table is read from the [`Catalog`] once, on first use, and
//! kept for the lifetime of the cache. Each distinct lookup (tokens plus
//! thresholds and limits) is scored once and memoized.
//!
//! # Selection
//!
//! ```text
//! sim(tokens, term) >= min(member_thr, metadata_thr)
//!   ├── member entities    sim >= member_thr    → best member_limit
//!   └── other entities     sim >= metadata_thr  → best metadata_limit
//! ```
//!
//! Both classes are sorted by similarity, descending. Members come first in
//! the result, and duplicates are dropped.

use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use serde::Serialize;

use crate::catalog::{tables, Catalog, CatalogError, CatalogResult, Synonym};
use crate::model::Entity;
use crate::segment::similarity::token_similarity;

/// Thresholds and limits of a synonym lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynonymQuery {
    pub member_threshold: f64,
    pub metadata_threshold: f64,
    pub member_limit: usize,
    pub metadata_limit: usize,
}

/// An entity matched by a synonym, with its similarity to the fragment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub entity: Entity,
    pub similarity: f64,
    /// Matched synonym term, space-joined.
    pub synonym: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SynonymKey {
    tokens: Vec<String>,
    member_threshold: u64,
    metadata_threshold: u64,
    member_limit: usize,
    metadata_limit: usize,
}

impl SynonymKey {
    fn new(tokens: &[String], query: &SynonymQuery) -> Self {
        Self {
            tokens: tokens.to_vec(),
            member_threshold: query.member_threshold.to_bits(),
            metadata_threshold: query.metadata_threshold.to_bits(),
            member_limit: query.member_limit,
            metadata_limit: query.metadata_limit,
        }
    }
}

/// Process-wide synonym cache, safe to share between threads.
#[derive(Default)]
pub struct SynonymCache {
    synonyms: RwLock<Option<Arc<Vec<Synonym>>>>,
    lookups: DashMap<SynonymKey, Arc<Vec<Candidate>>>,
}

impl SynonymCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Candidate entities for a token sequence.
    pub fn lookup(
        &self,
        catalog: &dyn Catalog,
        tokens: &[String],
        query: &SynonymQuery,
    ) -> CatalogResult<Arc<Vec<Candidate>>> {
        let key = SynonymKey::new(tokens, query);
        if let Some(hit) = self.lookups.get(&key) {
            return Ok(Arc::clone(hit.value()));
        }

        let synonyms = self.synonyms(catalog)?;
        let candidates = Arc::new(score(&synonyms, tokens, query));
        self.lookups.insert(key, Arc::clone(&candidates));
        Ok(candidates)
    }

    /// The synonym table, loading it on first use.
    fn synonyms(&self, catalog: &dyn Catalog) -> CatalogResult<Arc<Vec<Synonym>>> {
        {
            let guard = self
                .synonyms
                .read()
                .map_err(|_| CatalogError::LockPoisoned)?;
            if let Some(loaded) = guard.as_ref() {
                return Ok(Arc::clone(loaded));
            }
        }

        let mut guard = self
            .synonyms
            .write()
            .map_err(|_| CatalogError::LockPoisoned)?;
        // Another thread may have loaded it while we waited.
        if let Some(loaded) = guard.as_ref() {
            return Ok(Arc::clone(loaded));
        }
        let loaded = Arc::new(catalog.synonyms()?);
        tracing::debug!(terms = loaded.len(), "loaded synonym table");
        *guard = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// Drop the synonym table and every memoized lookup.
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.synonyms.write() {
            *guard = None;
        }
        self.lookups.clear();
    }

    /// Number of memoized lookups.
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

fn score(synonyms: &[Synonym], tokens: &[String], query: &SynonymQuery) -> Vec<Candidate> {
    let floor = query.member_threshold.min(query.metadata_threshold);
    let mut members = Vec::new();
    let mut metadata = Vec::new();

    for synonym in synonyms {
        let sim = token_similarity(tokens, &synonym.term);
        if sim < floor {
            continue;
        }
        for entity in &synonym.entities {
            let is_member = entity.table.as_deref() == Some(tables::MEMBER);
            let candidate = || Candidate {
                entity: entity.clone(),
                similarity: sim,
                synonym: synonym.text(),
            };
            if is_member && sim >= query.member_threshold {
                members.push(candidate());
            } else if !is_member && sim >= query.metadata_threshold {
                metadata.push(candidate());
            }
        }
    }

    members.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    members.truncate(query.member_limit);
    metadata.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    metadata.truncate(query.metadata_limit);

    let mut out: Vec<Candidate> = Vec::with_capacity(members.len() + metadata.len());
    for candidate in members.into_iter().chain(metadata) {
        if !out.contains(&candidate) {
            out.push(candidate);
        }
    }
    out
}
