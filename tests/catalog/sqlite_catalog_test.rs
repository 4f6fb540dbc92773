//! Integration tests for the SQLite catalog.
//!
//! The sample warehouse is imported into SQLite and must interpret exactly
//! like its in-memory counterpart.

use std::sync::Arc;

use parlance::catalog::sample::{foodmart, foodmart_spec};
use parlance::catalog::{Catalog, CatalogError, SqliteCatalog};
use parlance::config::InterpretSettings;
use parlance::{Entity, Interpreter};

fn sqlite_foodmart() -> SqliteCatalog {
    let catalog = SqliteCatalog::open_in_memory().unwrap();
    catalog.import(&foodmart_spec()).unwrap();
    catalog
}

#[test]
fn test_lookups_match_in_memory_catalog() {
    let sqlite = sqlite_foodmart();
    let memory = foodmart().unwrap();

    assert_eq!(sqlite.fact_table().unwrap(), memory.fact_table().unwrap());
    for table_id in [2, 3, 4] {
        assert_eq!(
            sqlite.join_path(1, table_id).unwrap(),
            memory.join_path(1, table_id).unwrap()
        );
    }
    assert_eq!(
        sqlite.year_attributes().unwrap(),
        memory.year_attributes().unwrap()
    );
    assert_eq!(
        sqlite.attributes_for_value("washington").unwrap(),
        memory.attributes_for_value("washington").unwrap()
    );
    assert_eq!(
        sqlite.value_domain("store_city").unwrap(),
        memory.value_domain("store_city").unwrap()
    );

    let ops = |c: &dyn Catalog| -> Vec<String> {
        c.operators_for_measure("store_sales")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect()
    };
    assert_eq!(ops(&sqlite), vec!["sum", "avg", "max", "min"]);
    assert_eq!(ops(&sqlite), ops(&memory));
}

#[test]
fn test_member_level() {
    let sqlite = sqlite_foodmart();
    let seattle = Entity::row(140, "Seattle", "member").with_reference(14, "store_city");
    let level = sqlite.level_of_member(&seattle).unwrap();
    assert_eq!(level.name, "store_city");
    assert_eq!(level.reference.unwrap().name, "store");
}

#[test]
fn test_sentences_compile_the_same() {
    let settings = InterpretSettings::default();
    let sqlite = Interpreter::new(Arc::new(sqlite_foodmart()), settings.clone());
    let memory = Interpreter::new(Arc::new(foodmart().unwrap()), settings);

    for sentence in [
        "sales in 2020",
        "average revenue by city",
        "sales in Seattle",
        "sales by month year above 1997",
    ] {
        assert_eq!(
            sqlite.to_sql(sentence).unwrap(),
            memory.to_sql(sentence).unwrap(),
            "{}",
            sentence
        );
    }
}

#[test]
fn test_year_level_override() {
    let sqlite = sqlite_foodmart().with_year_level("the_month");
    let years = sqlite.year_attributes().unwrap();
    assert_eq!(years.len(), 1);
    assert_eq!(years[0].name, "the_month");
}

#[test]
fn test_file_round_trip() {
    let path = std::env::temp_dir().join(format!("parlance-{}.db", uuid::Uuid::new_v4()));

    let created = SqliteCatalog::create(&path).unwrap();
    created.import(&foodmart_spec()).unwrap();
    drop(created);

    let reopened = SqliteCatalog::open(&path).unwrap();
    assert_eq!(reopened.fact_table().unwrap().name, "sales_fact_1997");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_file() {
    let result = SqliteCatalog::open(std::path::Path::new("/nonexistent/catalog.db"));
    assert!(matches!(result, Err(CatalogError::FileNotFound(_))));
}

#[test]
fn test_empty_catalog_has_no_fact() {
    let sqlite = SqliteCatalog::open_in_memory().unwrap();
    assert!(matches!(sqlite.fact_table(), Err(CatalogError::NoFactTable)));
}
