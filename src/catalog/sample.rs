//! A small retail warehouse used by the demo CLI and the test suites.

use super::{CatalogResult, CatalogSpec, InMemoryCatalog, PredicateKind};
use crate::model::DataType;

/// Description of a Foodmart-like sales warehouse.
///
/// One fact table joined to `time_by_day`, `store` and `product`.
/// `Washington` is both a city and a state, and `unit_sales` has a single
/// legal operator while `store_sales` has several.
pub fn foodmart_spec() -> CatalogSpec {
    use PredicateKind::*;

    CatalogSpec::new()
        .year_level("the_year")
        .fact(1, "sales_fact_1997", &["transactions"])
        .table(2, "time_by_day", "time_id")
        .table(3, "store", "store_id")
        .table(4, "product", "product_id")
        .hierarchy(5, "time", &["calendar"])
        .level(10, "the_year", "time_by_day", DataType::Numeric, &["year"])
        .level(11, "the_month", "time_by_day", DataType::String, &["month"])
        .member(110, "January", &[])
        .member(111, "February", &[])
        .member(112, "March", &[])
        .level(12, "store_country", "store", DataType::String, &["country"])
        .member(120, "USA", &["united states"])
        .member(121, "Canada", &[])
        .member(122, "Mexico", &[])
        .level(13, "store_state", "store", DataType::String, &["state"])
        .member(130, "Washington", &[])
        .member(131, "Oregon", &[])
        .member(132, "California", &[])
        .level(14, "store_city", "store", DataType::String, &["city"])
        .member(140, "Seattle", &[])
        .member(141, "Portland", &[])
        .member(142, "Washington", &[])
        .level(15, "product_category", "product", DataType::String, &["category"])
        .member(150, "Beer", &[])
        .member(151, "Bread", &[])
        .member(152, "Dairy", &[])
        .level(16, "brand_name", "product", DataType::String, &["brand"])
        .member(160, "Tell Tale", &[])
        .member(161, "Fort West", &[])
        .measure(20, "unit_sales", &["sum"], &["sales", "units"])
        .measure(21, "store_sales", &["sum", "avg", "max", "min"], &["revenue"])
        .measure(22, "store_cost", &["sum", "avg"], &["cost"])
        .predicate(30, "sum", GroupByOperator, &["total"])
        .predicate(31, "avg", GroupByOperator, &["average", "mean"])
        .predicate(32, "max", GroupByOperator, &["maximum", "highest"])
        .predicate(33, "min", GroupByOperator, &["minimum", "lowest"])
        .predicate(34, "count", CountOperator, &["number of"])
        .predicate(35, "by", GroupByTerm, &["per", "grouped by"])
        .predicate(36, "where", SelectionTerm, &[])
        .predicate(37, "=", Predicate, &["equal", "equals"])
        .predicate(38, ">", Predicate, &["greater than", "above"])
        .predicate(39, "<", Predicate, &["less than", "below"])
        .predicate(40, "between", Predicate, &[])
        .predicate(41, "and", BooleanOperator, &[])
        .predicate(42, "or", BooleanOperator, &[])
        .predicate(43, "not", BooleanOperator, &[])
        .predicate(44, "select", Select, &["show"])
}

/// The sample warehouse as an in-memory catalog.
pub fn foodmart() -> CatalogResult<InMemoryCatalog> {
    foodmart_spec().build()
}
