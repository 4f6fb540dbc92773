//! Mappings: candidate interpretations of a sentence as a forest of ngrams.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use super::entity::Entity;
use super::ngram::{Ngram, NodeKind, Span};

/// An ordered forest of sibling ngrams.
///
/// Equality and hashing are structural over the ngram sequence. The best
/// top-level ngram (largest subtree) is computed once at construction.
#[derive(Debug, Clone, Serialize)]
pub struct Mapping {
    ngrams: Vec<Ngram>,
    #[serde(skip)]
    best: Option<usize>,
}

impl Mapping {
    pub fn new(ngrams: Vec<Ngram>) -> Self {
        let best = best_index(&ngrams);
        Self { ngrams, best }
    }

    pub fn ngrams(&self) -> &[Ngram] {
        &self.ngrams
    }

    pub fn into_ngrams(self) -> Vec<Ngram> {
        self.ngrams
    }

    pub fn len(&self) -> usize {
        self.ngrams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ngrams.is_empty()
    }

    /// The top-level ngram with the most nodes; the first one on ties.
    pub fn best(&self) -> Option<&Ngram> {
        self.best.map(|i| &self.ngrams[i])
    }

    /// Node count of the largest top-level subtree.
    pub fn count_nodes(&self) -> usize {
        self.best().map(Ngram::count_nodes).unwrap_or(0)
    }

    /// Number of leaves in the best ngram.
    pub fn matched_count(&self) -> usize {
        self.best().map(|b| b.leaves().len()).unwrap_or(0)
    }

    /// Mean leaf similarity of the best ngram.
    pub fn avg_similarity(&self) -> f64 {
        self.best().map(|b| b.similarity).unwrap_or(0.0)
    }

    /// Sum of leaf similarities of the best ngram; the ranking score.
    pub fn score(&self) -> f64 {
        self.best()
            .map(|b| b.leaves().iter().map(|l| l.similarity).sum())
            .unwrap_or(0.0)
    }

    /// Sum of the similarities of every top-level ngram.
    pub fn potential_score(&self) -> f64 {
        self.ngrams.iter().map(|n| n.similarity).sum()
    }

    /// The first top-level QUERY node, if the mapping reduced to one.
    pub fn query(&self) -> Option<&Ngram> {
        self.ngrams.iter().find(|n| n.kind == NodeKind::Query)
    }

    pub fn has_query(&self) -> bool {
        self.query().is_some()
    }

    /// Tree rendering of the best ngram.
    pub fn to_string_tree(&self) -> String {
        self.best().map(Ngram::to_string_tree).unwrap_or_default()
    }

    /// Entities referenced by the leaves of every top-level ngram.
    pub fn entities(&self) -> BTreeSet<&Entity> {
        self.ngrams
            .iter()
            .flat_map(|n| n.leaves())
            .map(|l| &l.entity)
            .collect()
    }

    /// Top-level ngrams followed by a BIN leaf for every token no leaf covers.
    pub fn fill_unmatched(&self, tokens: &[String]) -> Vec<Ngram> {
        let mut covered = vec![false; tokens.len()];
        for leaf in self.ngrams.iter().flat_map(|n| n.leaves()) {
            for slot in covered
                .iter_mut()
                .take(leaf.span.right + 1)
                .skip(leaf.span.left)
            {
                *slot = true;
            }
        }

        let mut filled = self.ngrams.clone();
        filled.extend(
            tokens
                .iter()
                .enumerate()
                .filter(|(i, _)| !covered[*i])
                .map(|(i, t)| {
                    Ngram::leaf(t.clone(), NodeKind::Bin, Entity::named(t.clone()), Span::new(i, i))
                }),
        );
        filled
    }

    /// Order mappings by score, then by their structural rendering.
    pub fn compare(a: &Mapping, b: &Mapping) -> Ordering {
        a.score()
            .total_cmp(&b.score())
            .then_with(|| a.to_string().cmp(&b.to_string()))
    }
}

/// Index of the ngram with the largest subtree, keeping the first on ties.
fn best_index(ngrams: &[Ngram]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, n) in ngrams.iter().enumerate() {
        let count = n.count_nodes();
        match best {
            Some((_, c)) if c >= count => {}
            _ => best = Some((i, count)),
        }
    }
    best.map(|(i, _)| i)
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        self.ngrams == other.ngrams
    }
}

impl Eq for Mapping {}

impl Hash for Mapping {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ngrams.hash(state);
    }
}

impl From<Vec<Ngram>> for Mapping {
    fn from(ngrams: Vec<Ngram>) -> Self {
        Mapping::new(ngrams)
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, n) in self.ngrams.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", n)?;
        }
        f.write_str("]")
    }
}
