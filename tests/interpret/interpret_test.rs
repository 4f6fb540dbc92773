//! End-to-end interpretation tests over the sample warehouse.

use std::collections::BTreeSet;
use std::sync::Arc;

use parlance::catalog::sample::foodmart;
use parlance::catalog::Catalog;
use parlance::config::InterpretSettings;
use parlance::sql::{referenced_names, validate_sql};
use parlance::{AnnotationKind, CompiledQuery, InterpretError, Interpreter, NodeKind, NO_QUERY};

fn interpreter() -> Interpreter {
    Interpreter::new(Arc::new(foodmart().unwrap()), InterpretSettings::default())
}

fn interpret(sentence: &str) -> CompiledQuery {
    interpreter().interpret(sentence).unwrap().unwrap()
}

/// Names of measures and attributes the QUERY tree uses, members resolved to
/// their level.
fn tree_names(compiled: &CompiledQuery) -> BTreeSet<String> {
    let catalog = foodmart().unwrap();
    let q = compiled.mapping.query().unwrap();
    let mut names = BTreeSet::new();
    for leaf in q.leaves() {
        match leaf.kind {
            NodeKind::Measure | NodeKind::Attribute => {
                names.insert(leaf.entity.name.clone());
            }
            NodeKind::Value if leaf.entity.reference.is_some() => {
                names.insert(catalog.level_of_member(&leaf.entity).unwrap().name);
            }
            _ => {}
        }
    }
    names
}

fn assert_round_trip(compiled: &CompiledQuery) {
    let sql = compiled.sql();
    validate_sql(&sql).unwrap();
    assert_eq!(referenced_names(&sql).unwrap(), tree_names(compiled));
}

#[test]
fn test_measure_with_year() {
    let compiled = interpret("sales in 2020");
    insta::assert_snapshot!(compiled.sql(), @r"
    SELECT sum(unit_sales)
    FROM sales_fact_1997 FT
    INNER JOIN time_by_day t1 ON t1.time_id = FT.time_id
    WHERE t1.the_year = 2020
    ");
    assert_eq!(compiled.tokens, vec!["sales", "2020"]);
    assert_eq!(compiled.stats.mappings, 1);
    assert!(compiled.diagnostics().is_empty());
    assert_round_trip(&compiled);
}

#[test]
fn test_aggregation_by_attribute() {
    let compiled = interpret("average revenue by city");
    insta::assert_snapshot!(compiled.sql(), @r"
    SELECT avg(store_sales)
    FROM sales_fact_1997 FT
    INNER JOIN store t1 ON t1.store_id = FT.store_id
    GROUP BY t1.store_city
    ");
    assert_eq!(
        compiled.tree(),
        "{Q {MC OP:avg MEA:store_sales} {GC GB:by ATTR:store_city}}"
    );
    assert_round_trip(&compiled);
}

#[test]
fn test_member_infers_attribute() {
    let compiled = interpret("sales in Seattle");
    insta::assert_snapshot!(compiled.sql(), @r"
    SELECT sum(unit_sales)
    FROM sales_fact_1997 FT
    INNER JOIN store t1 ON t1.store_id = FT.store_id
    WHERE t1.store_city = 'Seattle'
    ");
    assert_round_trip(&compiled);
}

#[test]
fn test_group_by_and_comparison() {
    let compiled = interpret("sales by month year above 1997");
    insta::assert_snapshot!(compiled.sql(), @r"
    SELECT sum(unit_sales)
    FROM sales_fact_1997 FT
    INNER JOIN time_by_day t1 ON t1.time_id = FT.time_id
    WHERE t1.the_year > 1997
    GROUP BY t1.the_month
    ");
    assert_eq!(
        compiled.parts().to_string(),
        "sum unit_sales\\the_month\\the_year > 1997"
    );
    assert_round_trip(&compiled);
}

#[test]
fn test_value_before_attribute() {
    let compiled = interpret("1997 < year sales");
    assert_eq!(
        compiled.tree(),
        "{Q {SC VAL:1997 COP:< ATTR:the_year} {MC OP:sum MEA:unit_sales}}"
    );
    insta::assert_snapshot!(compiled.sql(), @r"
    SELECT sum(unit_sales)
    FROM sales_fact_1997 FT
    INNER JOIN time_by_day t1 ON t1.time_id = FT.time_id
    WHERE t1.the_year > 1997
    ");
    assert_round_trip(&compiled);
}

#[test]
fn test_count_of_fact_rows() {
    let settings = InterpretSettings {
        skip_cleaning: true,
        ..InterpretSettings::default()
    };
    let interpreter = Interpreter::new(Arc::new(foodmart().unwrap()), settings);
    let compiled = interpreter
        .interpret("number of transactions by month")
        .unwrap()
        .unwrap();
    insta::assert_snapshot!(compiled.sql(), @r"
    SELECT count(*)
    FROM sales_fact_1997 FT
    INNER JOIN time_by_day t1 ON t1.time_id = FT.time_id
    GROUP BY t1.the_month
    ");
    assert_eq!(compiled.parts().measure, "count sales_fact_1997");
    validate_sql(&compiled.sql()).unwrap();
}

#[test]
fn test_ambiguities_become_diagnostics() {
    let compiled = interpret("revenue in Washington");
    let kinds: Vec<_> = compiled.diagnostics().iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            AnnotationKind::MissingAggregation,
            AnnotationKind::AmbiguousAttribute
        ]
    );

    let sql = compiled.sql();
    assert!(sql.starts_with("SELECT sum(store_sales)\nFROM sales_fact_1997 FT\n"));
    assert!(sql.ends_with(" = 'Washington'"));
    validate_sql(&sql).unwrap();
}

#[test]
fn test_illegal_operator_is_kept_and_reported() {
    let compiled = interpret("max cost");
    assert_eq!(compiled.sql(), "SELECT max(store_cost)\nFROM sales_fact_1997 FT");

    let diagnostics = compiled.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, AnnotationKind::MeasureOperatorMismatch);
    let legal: Vec<_> = diagnostics[0]
        .candidates
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(legal, vec!["sum", "avg"]);
}

#[test]
fn test_no_measure_means_no_query() {
    let interpreter = interpreter();
    assert!(interpreter.interpret("by city").unwrap().is_none());
    assert_eq!(interpreter.to_sql("by city").unwrap(), NO_QUERY);
    assert_eq!(interpreter.to_sql("").unwrap(), NO_QUERY);
}

#[test]
fn test_unplaceable_number_is_an_error() {
    let result = interpreter().interpret("sales 42");
    assert!(matches!(result, Err(InterpretError::DanglingValue { .. })));
}

#[test]
fn test_stats_serialize() {
    let compiled = interpret("sales in 2020");
    let json = serde_json::to_value(&compiled).unwrap();
    assert_eq!(json["stats"]["sentence"], "sales 2020");
    assert_eq!(json["stats"]["retained"], 2);
    assert_eq!(json["query"]["fact"]["name"], "sales_fact_1997");
}

#[test]
fn test_results_are_deterministic() {
    let interpreter = interpreter();
    let first = interpreter.to_sql("average revenue by city").unwrap();
    interpreter.cache().invalidate();
    let second = interpreter.to_sql("average revenue by city").unwrap();
    assert_eq!(first, second);
}
