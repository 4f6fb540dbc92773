//! Integration tests for inference and validation over parsed mappings.

use parlance::catalog::sample::foodmart;
use parlance::grammar::GrammarEngine;
use parlance::semantic::{InferenceEngine, Validator};
use parlance::{AnnotationKind, DataType, Entity, InterpretError, Mapping, Ngram, NodeKind, Span};

fn leaf(kind: NodeKind, entity: Entity, pos: usize) -> Ngram {
    Ngram::leaf(entity.name.clone(), kind, entity, Span::new(pos, pos))
}

fn measure(id: i64, name: &str) -> Entity {
    Entity::row(id, name, "measure")
}

fn operator(id: i64, name: &str) -> Entity {
    Entity::row(id, name, "language_predicate")
}

fn city() -> Entity {
    Entity::row(14, "store_city", "level")
        .with_reference(3, "store")
        .with_data_type(DataType::String)
}

fn member(id: i64, name: &str, level_id: i64, level: &str) -> Entity {
    Entity::row(id, name, "member")
        .with_reference(level_id, level)
        .with_data_type(DataType::String)
}

fn parse(ngrams: Vec<Ngram>) -> Mapping {
    GrammarEngine::new().parse(&Mapping::new(ngrams)).unwrap()
}

#[test]
fn test_year_and_operator_are_inferred() {
    let catalog = foodmart().unwrap();
    let mapping = parse(vec![
        leaf(NodeKind::Measure, measure(20, "unit_sales"), 0),
        leaf(NodeKind::Value, Entity::literal("1997", DataType::Numeric), 2),
    ]);

    let mapping = InferenceEngine::new(&catalog).infer(mapping).unwrap();
    let mapping = Validator::new(&catalog).validate(mapping).unwrap();
    assert_eq!(
        mapping.to_string_tree(),
        "{Q {MC OP:sum MEA:unit_sales} {SC ATTR:the_year COP:= VAL:1997}}"
    );
    assert!(mapping.query().unwrap().simple_clauses().iter().all(|c| c.annotations.is_empty()));
}

#[test]
fn test_illegal_operator_is_reported() {
    let catalog = foodmart().unwrap();
    let mapping = parse(vec![
        leaf(NodeKind::Aggregation, operator(32, "max"), 0),
        leaf(NodeKind::Measure, measure(22, "store_cost"), 1),
    ]);

    let mapping = Validator::new(&catalog).validate(mapping).unwrap();
    let mc = &mapping.query().unwrap().children[0];
    let legal: Vec<_> = mc.annotations[&AnnotationKind::MeasureOperatorMismatch]
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(legal, vec!["sum", "avg"]);
}

#[test]
fn test_member_of_other_attribute_is_reported() {
    let catalog = foodmart().unwrap();
    let mapping = parse(vec![
        leaf(NodeKind::Measure, measure(20, "unit_sales"), 0),
        leaf(NodeKind::Attribute, city(), 1),
        leaf(NodeKind::Value, member(150, "Beer", 15, "product_category"), 2),
    ]);

    let mapping = InferenceEngine::new(&catalog).infer(mapping).unwrap();
    let mapping = Validator::new(&catalog).validate(mapping).unwrap();
    let sc = mapping
        .query()
        .unwrap()
        .child(NodeKind::SelectionClause)
        .unwrap();
    assert_eq!(sc.to_string_tree(), "{SC ATTR:store_city COP:= VAL:Beer}");
    assert_eq!(sc.annotations[&AnnotationKind::AttributeValueMismatch].len(), 3);
}

#[test]
fn test_ambiguous_measure_and_member() {
    let catalog = foodmart().unwrap();
    let mapping = parse(vec![
        leaf(NodeKind::Measure, measure(21, "store_sales"), 0),
        leaf(NodeKind::Value, member(130, "Washington", 13, "store_state"), 1),
    ]);

    let mapping = InferenceEngine::new(&catalog).infer(mapping).unwrap();
    let q = mapping.query().unwrap();
    let mc = q.child(NodeKind::MeasureClause).unwrap();
    let sc = q.child(NodeKind::SelectionClause).unwrap();

    assert_eq!(mc.annotations[&AnnotationKind::MissingAggregation].len(), 4);
    assert!(sc.is_dangling_value());
    assert_eq!(sc.annotations[&AnnotationKind::AmbiguousAttribute].len(), 2);
}

#[test]
fn test_small_number_cannot_be_placed() {
    let catalog = foodmart().unwrap();
    let mapping = parse(vec![
        leaf(NodeKind::Measure, measure(20, "unit_sales"), 0),
        leaf(NodeKind::Value, Entity::literal("12", DataType::Numeric), 1),
    ]);

    let result = InferenceEngine::new(&catalog).infer(mapping);
    assert!(matches!(
        result,
        Err(InterpretError::DanglingValue { value, data_type: DataType::Numeric }) if value == "12"
    ));
}
