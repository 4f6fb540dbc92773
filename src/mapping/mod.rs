//! Enumeration of candidate mappings.
//!
//! Depth-first backtracking over the sorted fragment list. A fragment may
//! follow the previous one when it starts 1 to `max_distance` tokens after
//! the previous one ends. Every accepted sequence covering at least the
//! threshold number of tokens becomes a [`Mapping`], including prefixes of
//! longer sequences.
//!
//! A branch is only explored when the tokens after the current fragment
//! could still bring the coverage up to the threshold.

use crate::model::{Mapping, Ngram};

/// Parameters of mapping enumeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumerateOptions {
    /// Fraction of the sentence a mapping must cover.
    pub coverage: f64,
    /// Largest gap allowed between consecutive fragments.
    pub max_distance: usize,
}

pub struct MappingEnumerator {
    options: EnumerateOptions,
}

impl MappingEnumerator {
    pub fn new(options: EnumerateOptions) -> Self {
        Self { options }
    }

    /// Minimum number of covered tokens for a sentence of `total` tokens.
    pub fn threshold(&self, total: usize) -> f64 {
        total as f64 * self.options.coverage
    }

    /// All mappings over `fragments` for a sentence of `total` tokens.
    ///
    /// `fragments` must be sorted by left position.
    pub fn enumerate(&self, fragments: &[Ngram], total: usize) -> Vec<Mapping> {
        let threshold = self.threshold(total);
        let mut search = Search {
            total,
            threshold,
            max_distance: self.options.max_distance,
            out: Vec::new(),
        };
        let mut acc = Vec::new();
        search.expand(&mut acc, 0, fragments);

        tracing::debug!(
            fragments = fragments.len(),
            threshold,
            mappings = search.out.len(),
            "enumerated mappings"
        );
        search.out
    }
}

struct Search {
    total: usize,
    threshold: f64,
    max_distance: usize,
    out: Vec<Mapping>,
}

impl Search {
    fn expand(&mut self, acc: &mut Vec<Ngram>, covered: usize, data: &[Ngram]) {
        // Fragments accepted at this depth are withdrawn for later siblings.
        let mut remaining: Vec<Ngram> = data.to_vec();

        for r in data {
            let eligible = match acc.last() {
                None => true,
                Some(last) => {
                    let gap = r.span.left as i64 - last.span.right as i64;
                    gap >= 1 && gap <= self.max_distance as i64
                }
            };
            if !eligible {
                continue;
            }

            if let Some(pos) = remaining.iter().position(|n| n == r) {
                remaining.remove(pos);
            }
            let covered = covered + r.span.len();
            acc.push(r.clone());

            if covered as f64 >= self.threshold {
                self.out.push(Mapping::new(acc.clone()));
            }
            let reachable = covered + self.total - r.span.right;
            if !remaining.is_empty() && reachable as f64 >= self.threshold {
                let next = remaining.clone();
                self.expand(acc, covered, &next);
            }

            acc.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entity, NodeKind, Span};

    fn frag(name: &str, l: usize, r: usize) -> Ngram {
        Ngram::leaf(name, NodeKind::Attribute, Entity::named(name), Span::new(l, r))
    }

    fn names(mappings: &[Mapping]) -> Vec<Vec<String>> {
        mappings
            .iter()
            .map(|m| m.ngrams().iter().map(|n| n.tokens.clone()).collect())
            .collect()
    }

    #[test]
    fn test_gap_of_two_is_allowed() {
        let enumerator = MappingEnumerator::new(EnumerateOptions {
            coverage: 0.6,
            max_distance: 2,
        });
        let mappings = enumerator.enumerate(&[frag("sales", 0, 0), frag("2020", 2, 2)], 3);
        assert_eq!(names(&mappings), vec![vec!["sales", "2020"]]);
    }

    #[test]
    fn test_overlapping_fragments_never_chain() {
        let enumerator = MappingEnumerator::new(EnumerateOptions {
            coverage: 0.5,
            max_distance: 2,
        });
        let mappings =
            enumerator.enumerate(&[frag("ab", 0, 1), frag("a", 0, 0), frag("b", 1, 1)], 2);
        assert_eq!(
            names(&mappings),
            vec![vec!["ab"], vec!["a"], vec!["a", "b"], vec!["b"]]
        );
    }

    #[test]
    fn test_prefixes_are_emitted() {
        let enumerator = MappingEnumerator::new(EnumerateOptions {
            coverage: 0.5,
            max_distance: 1,
        });
        let mappings = enumerator.enumerate(
            &[frag("a", 0, 0), frag("b", 1, 1), frag("c", 2, 2), frag("d", 3, 3)],
            4,
        );
        let found = names(&mappings);
        assert!(found.contains(&vec!["a".to_string(), "b".to_string()]));
        assert!(found.contains(&vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string()
        ]));
        assert!(found.contains(&vec!["c".to_string(), "d".to_string()]));
    }

    #[test]
    fn test_gap_larger_than_max_distance() {
        let enumerator = MappingEnumerator::new(EnumerateOptions {
            coverage: 0.6,
            max_distance: 1,
        });
        let mappings = enumerator.enumerate(&[frag("a", 0, 0), frag("b", 2, 2)], 3);
        assert!(mappings.is_empty());
    }
}
