//! Integration tests for sentence cleaning and segmentation.

use parlance::cache::SynonymCache;
use parlance::catalog::sample::foodmart;
use parlance::catalog::{Catalog, InMemoryCatalog};
use parlance::config::InterpretSettings;
use parlance::segment::{clean_sentence, Segmenter};
use parlance::{InterpretError, NodeKind, Span};

fn tokens(s: &str) -> Vec<String> {
    s.split_whitespace().map(str::to_string).collect()
}

#[test]
fn test_default_stop_words() {
    let settings = InterpretSettings::default();
    let cleaned = clean_sentence("The sales in 2020", &settings.stop_word_set(), false);
    assert_eq!(cleaned, vec!["sales", "2020"]);
}

#[test]
fn test_multi_token_synonym() {
    let catalog = foodmart().unwrap();
    let cache = SynonymCache::new();
    let segmenter = Segmenter::new(&catalog, &cache, InterpretSettings::default().segment_options());

    let result = segmenter
        .segment(&tokens("number of transactions"))
        .unwrap();
    let confident: Vec<_> = result
        .fragments
        .iter()
        .filter(|n| n.similarity >= 0.9)
        .map(|n| (n.kind, n.entity.name.as_str(), n.span))
        .collect();
    assert_eq!(
        confident,
        vec![
            (NodeKind::Count, "count", Span::new(0, 1)),
            (NodeKind::Fact, "sales_fact_1997", Span::new(2, 2)),
        ]
    );
}

#[test]
fn test_misspelling_is_matched_but_not_confident() {
    let catalog = foodmart().unwrap();
    let cache = SynonymCache::new();
    let segmenter = Segmenter::new(&catalog, &cache, InterpretSettings::default().segment_options());

    let result = segmenter.segment(&tokens("revenu")).unwrap();
    assert_eq!(result.fragments.len(), 1);
    assert_eq!(result.fragments[0].entity.name, "store_sales");
    assert!(result.fragments[0].similarity < 0.9);
    assert_eq!(result.confident, 0);
}

#[test]
fn test_shared_member_name_gives_one_fragment_per_member() {
    let catalog = foodmart().unwrap();
    let cache = SynonymCache::new();
    let segmenter = Segmenter::new(&catalog, &cache, InterpretSettings::default().segment_options());

    let result = segmenter.segment(&tokens("washington")).unwrap();
    let levels: Vec<_> = result
        .fragments
        .iter()
        .filter_map(|n| n.entity.reference.as_ref().map(|r| r.name.as_str()))
        .collect();
    assert_eq!(levels.len(), 2);
    assert!(levels.contains(&"store_state"));
    assert!(levels.contains(&"store_city"));
}

#[test]
fn test_unknown_boolean_operator_is_fatal() {
    let catalog = InMemoryCatalog::from_toml_str(
        r#"
[[predicates]]
id = 1
name = "xor"
kind = "BOOLEAN_OPERATOR"
"#,
    )
    .unwrap();
    let cache = SynonymCache::new();
    let segmenter = Segmenter::new(&catalog, &cache, InterpretSettings::default().segment_options());

    let result = segmenter.segment(&tokens("xor"));
    assert!(matches!(
        result,
        Err(InterpretError::UnknownBooleanOperator { literal }) if literal == "xor"
    ));
}

#[test]
fn test_cache_is_reused_across_sentences() {
    let catalog = foodmart().unwrap();
    let cache = SynonymCache::new();
    let segmenter = Segmenter::new(&catalog, &cache, InterpretSettings::default().segment_options());

    segmenter.segment(&tokens("sales")).unwrap();
    let cached = cache.len();
    segmenter.segment(&tokens("sales")).unwrap();
    assert_eq!(cache.len(), cached);
    assert!(!catalog.synonyms().unwrap().is_empty());
}
