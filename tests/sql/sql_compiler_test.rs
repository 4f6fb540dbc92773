//! Integration tests for SQL compilation.

use parlance::catalog::sample::foodmart;
use parlance::sql::{referenced_names, validate_sql, Condition, SqlCompiler, NO_QUERY};
use parlance::{DataType, Entity, Mapping, Ngram, NodeKind, Span};

fn leaf(kind: NodeKind, entity: Entity, pos: usize) -> Ngram {
    Ngram::leaf(entity.name.clone(), kind, entity, Span::new(pos, pos))
}

fn level(id: i64, name: &str, table_id: i64, table: &str, data_type: DataType) -> Entity {
    Entity::row(id, name, "level")
        .with_reference(table_id, table)
        .with_data_type(data_type)
}

fn member(id: i64, name: &str, level_id: i64, level: &str) -> Entity {
    Entity::row(id, name, "member")
        .with_reference(level_id, level)
        .with_data_type(DataType::String)
}

fn measure_clause(op: &str, measure: &str, pos: usize) -> Ngram {
    Ngram::node(
        NodeKind::MeasureClause,
        vec![
            leaf(NodeKind::Aggregation, Entity::named(op), pos),
            leaf(NodeKind::Measure, Entity::row(21, measure, "measure"), pos + 1),
        ],
    )
}

fn comparison(attribute: Entity, op: &str, value: Entity, pos: usize) -> Ngram {
    Ngram::node(
        NodeKind::SelectionClause,
        vec![
            leaf(NodeKind::Attribute, attribute, pos),
            leaf(NodeKind::ComparisonOperator, Entity::named(op), pos + 1),
            leaf(NodeKind::Value, value, pos + 2),
        ],
    )
}

#[test]
fn test_joins_follow_first_use() {
    let catalog = foodmart().unwrap();
    let compiler = SqlCompiler::new(&catalog);

    let gc = Ngram::node(
        NodeKind::GroupByClause,
        vec![
            leaf(NodeKind::GroupByTerm, Entity::named("by"), 2),
            leaf(NodeKind::Attribute, level(15, "product_category", 4, "product", DataType::String), 3),
        ],
    );
    let sc = Ngram::node(
        NodeKind::SelectionClause,
        vec![
            comparison(
                level(10, "the_year", 2, "time_by_day", DataType::Numeric),
                ">",
                Entity::literal("1997", DataType::Numeric),
                4,
            ),
            leaf(NodeKind::Or, Entity::named("or"), 7),
            Ngram::node(
                NodeKind::SelectionClause,
                vec![leaf(NodeKind::Value, member(141, "Portland", 14, "store_city"), 8)],
            ),
        ],
    );
    let q = Ngram::node(
        NodeKind::Query,
        vec![measure_clause("max", "store_sales", 0), gc, sc],
    );

    let query = compiler.compile(&q).unwrap();
    insta::assert_snapshot!(query.to_sql(), @r"
    SELECT max(store_sales)
    FROM sales_fact_1997 FT
    INNER JOIN product t1 ON t1.product_id = FT.product_id
    INNER JOIN time_by_day t2 ON t2.time_id = FT.time_id
    INNER JOIN store t3 ON t3.store_id = FT.store_id
    WHERE t2.the_year > 1997 OR t3.store_city = 'Portland'
    GROUP BY t1.product_category
    ");
    assert_eq!(query.conditions.len(), 3);
    assert_eq!(query.conditions[1], Condition::Or);

    validate_sql(&query.to_sql()).unwrap();
    let names: Vec<_> = referenced_names(&query.to_sql()).unwrap().into_iter().collect();
    assert_eq!(
        names,
        vec!["product_category", "store_city", "store_sales", "the_year"]
    );
}

#[test]
fn test_quotes_are_escaped() {
    let catalog = foodmart().unwrap();
    let compiler = SqlCompiler::new(&catalog);

    let sc = comparison(
        level(16, "brand_name", 4, "product", DataType::String),
        "=",
        Entity::literal("Bob's", DataType::String),
        2,
    );
    let q = Ngram::node(NodeKind::Query, vec![measure_clause("sum", "store_sales", 0), sc]);

    let sql = compiler.compile(&q).unwrap().to_sql();
    assert!(sql.ends_with("WHERE t1.brand_name = 'Bob''s'"));
    validate_sql(&sql).unwrap();
}

#[test]
fn test_attribute_name_inside_value_is_untouched() {
    let catalog = foodmart().unwrap();
    let compiler = SqlCompiler::new(&catalog);

    let sc = comparison(
        level(16, "brand_name", 4, "product", DataType::String),
        "=",
        Entity::literal("brand_name", DataType::String),
        2,
    );
    let q = Ngram::node(NodeKind::Query, vec![measure_clause("sum", "store_sales", 0), sc]);

    let sql = compiler.compile(&q).unwrap().to_sql();
    assert!(sql.ends_with("WHERE t1.brand_name = 'brand_name'"));
}

#[test]
fn test_mapping_without_query() {
    let catalog = foodmart().unwrap();
    let compiler = SqlCompiler::new(&catalog);
    let mapping = Mapping::new(vec![leaf(
        NodeKind::Attribute,
        level(10, "the_year", 2, "time_by_day", DataType::Numeric),
        0,
    )]);
    assert_eq!(compiler.to_sql(&mapping).unwrap(), NO_QUERY);
}
