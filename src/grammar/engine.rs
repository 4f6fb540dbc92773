//! Bottom-up rewriting of mappings into parse trees.
//!
//! ```text
//! stack = [mapping]
//! while let Some(sentence) = stack.pop()
//!     for group in grammar
//!         for each position i, first rule of the group matching at i:
//!             push sentence with that window replaced by a new node
//!             skip past the window
//!     no rule matched anywhere ──▶ sentence is final
//! ```
//!
//! Each rewrite is applied to the popped sentence, so one pop fans out into
//! one successor per match. Sentences already seen are not pushed twice.

use std::collections::HashSet;

use super::rules::{RuleGroup, GRAMMAR};
use crate::model::{Mapping, Ngram};

pub struct GrammarEngine {
    groups: &'static [RuleGroup],
}

impl Default for GrammarEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarEngine {
    pub fn new() -> Self {
        Self { groups: GRAMMAR }
    }

    pub fn with_rules(groups: &'static [RuleGroup]) -> Self {
        Self { groups }
    }

    /// Every irreducible form of `mapping`, in discovery order.
    pub fn rewrite(&self, mapping: &Mapping) -> Vec<Mapping> {
        let start = mapping.ngrams().to_vec();
        let mut seen: HashSet<Vec<Ngram>> = HashSet::new();
        seen.insert(start.clone());
        let mut stack = vec![start];

        let mut finals = Vec::new();
        let mut final_set: HashSet<Vec<Ngram>> = HashSet::new();

        while let Some(sentence) = stack.pop() {
            let mut changed = false;

            for group in self.groups {
                let mut i = 0;
                while i < sentence.len() {
                    let mut step = 1;
                    for rule in group.iter() {
                        let end = i + rule.len();
                        if end > sentence.len() || !rule.matches(&sentence[i..end]) {
                            continue;
                        }
                        let node = Ngram::node(rule.ret, sentence[i..end].to_vec());
                        let next = splice(&sentence, i, end, node);
                        if seen.insert(next.clone()) {
                            stack.push(next);
                        }
                        changed = true;
                        step = rule.len();
                        break;
                    }
                    i += step;
                }
            }

            if !changed && final_set.insert(sentence.clone()) {
                finals.push(Mapping::new(sentence));
            }
        }

        finals
    }

    /// The best reduction of `mapping` containing a QUERY node.
    pub fn parse(&self, mapping: &Mapping) -> Option<Mapping> {
        let finals = self.rewrite(mapping);
        let total = finals.len();
        let best = select_best(finals);
        tracing::trace!(
            mapping = %mapping,
            finals = total,
            parsed = best.is_some(),
            "parsed mapping"
        );
        best
    }

    /// Parse every mapping and keep the overall best.
    pub fn parse_all(&self, mappings: &[Mapping]) -> Option<Mapping> {
        select_best(mappings.iter().filter_map(|m| self.parse(m)))
    }
}

/// Highest-ranked mapping having a QUERY node.
pub fn select_best(mappings: impl IntoIterator<Item = Mapping>) -> Option<Mapping> {
    mappings
        .into_iter()
        .filter(Mapping::has_query)
        .max_by(Mapping::compare)
}

/// `sentence` with `[start, end)` replaced by `node`.
fn splice(sentence: &[Ngram], start: usize, end: usize, node: Ngram) -> Vec<Ngram> {
    let mut next = Vec::with_capacity(sentence.len() - (end - start) + 1);
    next.extend_from_slice(&sentence[..start]);
    next.push(node);
    next.extend_from_slice(&sentence[end..]);
    next
}
