//! Integration tests for mapping enumeration.

use parlance::cache::SynonymCache;
use parlance::catalog::sample::foodmart;
use parlance::config::InterpretSettings;
use parlance::mapping::{EnumerateOptions, MappingEnumerator};
use parlance::segment::Segmenter;
use parlance::{Entity, Mapping, Ngram, NodeKind, Span};

fn frag(name: &str, l: usize, r: usize) -> Ngram {
    Ngram::leaf(name, NodeKind::Attribute, Entity::named(name), Span::new(l, r))
}

fn names(mappings: &[Mapping]) -> Vec<String> {
    mappings
        .iter()
        .map(|m| {
            m.ngrams()
                .iter()
                .map(|n| n.tokens.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

#[test]
fn test_prefixes_and_skips_are_emitted() {
    let enumerator = MappingEnumerator::new(EnumerateOptions {
        coverage: 0.6,
        max_distance: 2,
    });
    let fragments = [frag("a", 0, 0), frag("b", 1, 1), frag("c", 2, 2)];

    let mappings = enumerator.enumerate(&fragments, 3);
    assert_eq!(names(&mappings), vec!["a b", "a b c", "a c", "b c"]);
}

#[test]
fn test_gap_beyond_max_distance() {
    let enumerator = MappingEnumerator::new(EnumerateOptions {
        coverage: 0.5,
        max_distance: 1,
    });
    let mappings = enumerator.enumerate(&[frag("a", 0, 0), frag("c", 2, 2)], 3);
    assert!(mappings.is_empty());
}

#[test]
fn test_threshold() {
    let enumerator = MappingEnumerator::new(EnumerateOptions {
        coverage: 0.7,
        max_distance: 2,
    });
    assert!((enumerator.threshold(10) - 7.0).abs() < 1e-9);
    assert!(enumerator.enumerate(&[], 0).is_empty());
}

#[test]
fn test_segmented_sentence() {
    let catalog = foodmart().unwrap();
    let cache = SynonymCache::new();
    let settings = InterpretSettings::default();
    let segmenter = Segmenter::new(&catalog, &cache, settings.segment_options());
    let enumerator = MappingEnumerator::new(settings.enumerate_options());

    let tokens: Vec<String> = vec!["sales".into(), "2020".into()];
    let fragments = segmenter.segment(&tokens).unwrap().fragments;
    let mappings = enumerator.enumerate(&fragments, tokens.len());

    assert_eq!(mappings.len(), 1);
    let kinds: Vec<_> = mappings[0].ngrams().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NodeKind::Measure, NodeKind::Value]);
}

#[test]
fn test_pruning_and_enumeration_hold_over_overlapping_fragments() {
    let catalog = foodmart().unwrap();
    let cache = SynonymCache::new();
    let settings = InterpretSettings {
        skip_cleaning: true,
        coverage: 0.6,
        ..InterpretSettings::default()
    };
    let segment = settings.segment_options();
    let segmenter = Segmenter::new(&catalog, &cache, segment);
    let enumerate = settings.enumerate_options();
    let enumerator = MappingEnumerator::new(enumerate);

    let tokens: Vec<String> = "number of transactions grouped by month above 1997"
        .split_whitespace()
        .map(str::to_string)
        .collect();
    let fragments = segmenter.segment(&tokens).unwrap().fragments;

    let overlapping = fragments.iter().enumerate().any(|(i, a)| {
        fragments[i + 1..]
            .iter()
            .any(|b| a.span.left <= b.span.right && b.span.left <= a.span.right)
    });
    assert!(overlapping, "sentence should yield overlapping fragments");

    for confident in fragments.iter().filter(|n| n.similarity >= segment.confidence) {
        for other in fragments.iter().filter(|n| *n != confident) {
            assert!(
                !(confident.span.contains(&other.span) && other.span.len() < confident.span.len()),
                "{} survived inside {}",
                other,
                confident
            );
        }
    }

    let mappings = enumerator.enumerate(&fragments, tokens.len());
    assert!(!mappings.is_empty());
    let threshold = enumerator.threshold(tokens.len());
    for mapping in &mappings {
        for pair in mapping.ngrams().windows(2) {
            let gap = pair[1].span.left as i64 - pair[0].span.right as i64;
            assert!(
                gap >= 1 && gap <= enumerate.max_distance as i64,
                "gap {} in {}",
                gap,
                mapping
            );
        }
        let covered: usize = mapping.ngrams().iter().map(|n| n.span.len()).sum();
        assert!(covered as f64 >= threshold, "{} covers {}", mapping, covered);
    }
}
