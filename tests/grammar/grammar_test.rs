//! Integration tests for the grammar engine.

use parlance::grammar::{select_best, GrammarEngine, GRAMMAR};
use parlance::{DataType, Entity, Mapping, Ngram, NodeKind, Span};

fn leaf(kind: NodeKind, name: &str, pos: usize) -> Ngram {
    Ngram::leaf(name, kind, Entity::named(name), Span::new(pos, pos))
}

fn number(value: &str, pos: usize) -> Ngram {
    Ngram::leaf(
        value,
        NodeKind::Value,
        Entity::literal(value, DataType::Numeric),
        Span::new(pos, pos),
    )
}

#[test]
fn test_nested_measure_clauses() {
    let engine = GrammarEngine::new();
    let mapping = Mapping::new(vec![
        leaf(NodeKind::Aggregation, "avg", 0),
        leaf(NodeKind::Measure, "store_sales", 1),
        leaf(NodeKind::Aggregation, "max", 2),
        leaf(NodeKind::Measure, "store_cost", 3),
    ]);

    let parsed = engine.parse(&mapping).unwrap();
    assert_eq!(
        parsed.to_string_tree(),
        "{Q {MC {MC OP:avg MEA:store_sales} {MC OP:max MEA:store_cost}}}"
    );
}

#[test]
fn test_count_fact_with_group_by() {
    let engine = GrammarEngine::new();
    let mapping = Mapping::new(vec![
        leaf(NodeKind::Count, "count", 0),
        leaf(NodeKind::Fact, "sales_fact_1997", 1),
        leaf(NodeKind::GroupByTerm, "by", 2),
        leaf(NodeKind::Attribute, "the_month", 3),
    ]);

    let parsed = engine.parse(&mapping).unwrap();
    assert_eq!(
        parsed.to_string_tree(),
        "{Q {MC COUNT:count FACT:sales_fact_1997} {GC GB:by ATTR:the_month}}"
    );
}

#[test]
fn test_selection_before_measure() {
    let engine = GrammarEngine::new();
    let mapping = Mapping::new(vec![
        leaf(NodeKind::Attribute, "the_year", 0),
        leaf(NodeKind::ComparisonOperator, ">", 1),
        number("1997", 2),
        leaf(NodeKind::Measure, "unit_sales", 3),
    ]);

    let parsed = engine.parse(&mapping).unwrap();
    assert_eq!(
        parsed.to_string_tree(),
        "{Q {SC ATTR:the_year COP:> VAL:1997} {MC MEA:unit_sales}}"
    );
}

#[test]
fn test_disjunction() {
    let engine = GrammarEngine::new();
    let mapping = Mapping::new(vec![
        leaf(NodeKind::Measure, "unit_sales", 0),
        number("1997", 1),
        leaf(NodeKind::Or, "or", 2),
        number("1998", 3),
    ]);

    let parsed = engine.parse(&mapping).unwrap();
    assert_eq!(
        parsed.to_string_tree(),
        "{Q {MC MEA:unit_sales} {SC {SC VAL:1997} OR:or {SC VAL:1998}}}"
    );
}

#[test]
fn test_leftover_fragment_keeps_query() {
    let engine = GrammarEngine::new();
    let mapping = Mapping::new(vec![
        leaf(NodeKind::Measure, "unit_sales", 0),
        leaf(NodeKind::SelectionTerm, "where", 1),
    ]);

    let parsed = engine.parse(&mapping).unwrap();
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed.to_string_tree(), "{Q {MC MEA:unit_sales}}");
}

#[test]
fn test_best_mapping_covers_most() {
    let engine = GrammarEngine::new();
    let short = Mapping::new(vec![leaf(NodeKind::Measure, "unit_sales", 0)]);
    let long = Mapping::new(vec![
        leaf(NodeKind::Measure, "unit_sales", 0),
        leaf(NodeKind::GroupByTerm, "by", 1),
        leaf(NodeKind::Attribute, "the_year", 2),
    ]);
    let orphan = Mapping::new(vec![leaf(NodeKind::GroupByTerm, "by", 1)]);

    let best = engine.parse_all(&[short, long, orphan]).unwrap();
    assert_eq!(
        best.to_string_tree(),
        "{Q {MC MEA:unit_sales} {GC GB:by ATTR:the_year}}"
    );
}

#[test]
fn test_select_best_ignores_mappings_without_query() {
    let no_query = Mapping::new(vec![leaf(NodeKind::Attribute, "the_year", 0)]);
    assert!(select_best(vec![no_query]).is_none());
}

#[test]
fn test_grammar_order() {
    let first: Vec<_> = GRAMMAR.iter().map(|group| group[0].to_string()).collect();
    assert_eq!(
        first,
        vec![
            "M1: MC ::= OP MEA",
            "G1: GC ::= GB ATTR",
            "S1: SC ::= ATTR COP VAL",
            "Q1: Q ::= GC SC MC",
        ]
    );
}

#[test]
fn test_final_mappings_are_stable() {
    let engine = GrammarEngine::new();
    let inputs = [
        Mapping::new(vec![
            leaf(NodeKind::Measure, "unit_sales", 0),
            leaf(NodeKind::Measure, "store_cost", 1),
        ]),
        Mapping::new(vec![
            leaf(NodeKind::Measure, "unit_sales", 0),
            leaf(NodeKind::Attribute, "the_year", 1),
            number("1997", 2),
            leaf(NodeKind::Or, "or", 3),
            number("1998", 4),
            leaf(NodeKind::GroupByTerm, "by", 5),
            leaf(NodeKind::Attribute, "the_month", 6),
        ]),
    ];

    for input in &inputs {
        let finals = engine.rewrite(input);
        assert!(finals.len() >= 2, "{} has a single reduction", input);
        for stable in &finals {
            assert_eq!(engine.rewrite(stable), vec![stable.clone()], "{}", stable);
        }
    }
}
