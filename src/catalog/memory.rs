//! Catalog held in memory, described in TOML or built in code.
//!
//! ```toml
//! year_level = "the_year"
//!
//! [fact]
//! id = 1
//! name = "sales_fact_1997"
//! synonyms = ["transactions"]
//!
//! [[tables]]
//! id = 2
//! name = "time_by_day"
//! join_column = "time_id"
//!
//! [[levels]]
//! id = 10
//! name = "the_year"
//! table = "time_by_day"
//! data_type = "NUMERIC"
//! synonyms = ["year"]
//!
//! [[measures]]
//! id = 20
//! name = "unit_sales"
//! operators = ["sum"]
//! synonyms = ["sales"]
//! ```
//!
//! Every element is also reachable through its own name, with underscores
//! read as spaces.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{
    tables, Catalog, CatalogError, CatalogResult, FactTable, JoinPath, Predicate, PredicateKind,
    Synonym, DEFAULT_YEAR_LEVEL, VALUE_DOMAIN_LIMIT,
};
use crate::model::{DataType, Entity};

/// Serializable description of a warehouse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSpec {
    /// Level holding calendar years.
    #[serde(default = "default_year_level")]
    pub year_level: String,

    #[serde(default)]
    pub fact: Option<FactSpec>,

    #[serde(default)]
    pub tables: Vec<TableSpec>,

    #[serde(default)]
    pub hierarchies: Vec<HierarchySpec>,

    #[serde(default)]
    pub levels: Vec<LevelSpec>,

    #[serde(default)]
    pub measures: Vec<MeasureSpec>,

    #[serde(default)]
    pub predicates: Vec<PredicateSpec>,
}

fn default_year_level() -> String {
    DEFAULT_YEAR_LEVEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactSpec {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

/// A dimension table and the column it shares with the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub id: i64,
    pub name: String,
    pub join_column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchySpec {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    pub id: i64,
    pub name: String,
    /// Name of the dimension table holding the level column.
    pub table: String,
    pub data_type: DataType,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureSpec {
    pub id: i64,
    pub name: String,
    /// Legal aggregation operators; empty means unconstrained.
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateSpec {
    pub id: i64,
    pub name: String,
    pub kind: PredicateKind,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl CatalogSpec {
    pub fn new() -> Self {
        Self {
            year_level: default_year_level(),
            ..Default::default()
        }
    }

    pub fn from_toml_str(s: &str) -> CatalogResult<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> CatalogResult<Self> {
        if !path.exists() {
            return Err(CatalogError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn year_level(mut self, name: impl Into<String>) -> Self {
        self.year_level = name.into();
        self
    }

    pub fn fact(mut self, id: i64, name: impl Into<String>, synonyms: &[&str]) -> Self {
        self.fact = Some(FactSpec {
            id,
            name: name.into(),
            synonyms: to_strings(synonyms),
        });
        self
    }

    pub fn table(mut self, id: i64, name: impl Into<String>, join_column: impl Into<String>) -> Self {
        self.tables.push(TableSpec {
            id,
            name: name.into(),
            join_column: join_column.into(),
        });
        self
    }

    pub fn hierarchy(mut self, id: i64, name: impl Into<String>, synonyms: &[&str]) -> Self {
        self.hierarchies.push(HierarchySpec {
            id,
            name: name.into(),
            synonyms: to_strings(synonyms),
        });
        self
    }

    pub fn level(
        mut self,
        id: i64,
        name: impl Into<String>,
        table: impl Into<String>,
        data_type: DataType,
        synonyms: &[&str],
    ) -> Self {
        self.levels.push(LevelSpec {
            id,
            name: name.into(),
            table: table.into(),
            data_type,
            synonyms: to_strings(synonyms),
            members: Vec::new(),
        });
        self
    }

    /// Add a member to the most recently added level.
    pub fn member(mut self, id: i64, name: impl Into<String>, synonyms: &[&str]) -> Self {
        if let Some(level) = self.levels.last_mut() {
            level.members.push(MemberSpec {
                id,
                name: name.into(),
                synonyms: to_strings(synonyms),
            });
        }
        self
    }

    pub fn measure(
        mut self,
        id: i64,
        name: impl Into<String>,
        operators: &[&str],
        synonyms: &[&str],
    ) -> Self {
        self.measures.push(MeasureSpec {
            id,
            name: name.into(),
            operators: to_strings(operators),
            synonyms: to_strings(synonyms),
        });
        self
    }

    pub fn predicate(
        mut self,
        id: i64,
        name: impl Into<String>,
        kind: PredicateKind,
        synonyms: &[&str],
    ) -> Self {
        self.predicates.push(PredicateSpec {
            id,
            name: name.into(),
            kind,
            synonyms: to_strings(synonyms),
        });
        self
    }

    pub fn build(self) -> CatalogResult<InMemoryCatalog> {
        InMemoryCatalog::from_spec(self)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// A [`Catalog`] answering from indexed in-memory structures.
#[derive(Debug, Clone)]
pub struct InMemoryCatalog {
    spec: CatalogSpec,
    synonyms: Vec<Synonym>,
    predicates: HashMap<i64, Predicate>,
    operators: HashMap<String, Vec<Entity>>,
    levels: HashMap<String, Entity>,
    level_ids: HashMap<i64, String>,
    members: HashMap<String, Vec<Entity>>,
    member_levels: HashMap<String, Vec<Entity>>,
    joins: HashMap<i64, JoinPath>,
}

impl InMemoryCatalog {
    pub fn builder() -> CatalogSpec {
        CatalogSpec::new()
    }

    pub fn from_toml_str(s: &str) -> CatalogResult<Self> {
        Self::from_spec(CatalogSpec::from_toml_str(s)?)
    }

    pub fn from_file(path: &Path) -> CatalogResult<Self> {
        Self::from_spec(CatalogSpec::from_file(path)?)
    }

    /// Index a warehouse description, checking its cross references.
    pub fn from_spec(spec: CatalogSpec) -> CatalogResult<Self> {
        let mut synonyms = SynonymIndex::default();
        let mut predicates = HashMap::new();
        let mut operators = HashMap::new();
        let mut levels = HashMap::new();
        let mut level_ids = HashMap::new();
        let mut members: HashMap<String, Vec<Entity>> = HashMap::new();
        let mut member_levels: HashMap<String, Vec<Entity>> = HashMap::new();
        let mut joins = HashMap::new();

        let table_ids: HashMap<&str, i64> = spec
            .tables
            .iter()
            .map(|t| (t.name.as_str(), t.id))
            .collect();

        if let Some(fact) = &spec.fact {
            let entity = Entity::row(fact.id, &fact.name, tables::FACT);
            synonyms.add_all(&fact.name, &fact.synonyms, &entity);
        }

        for table in &spec.tables {
            joins.insert(
                table.id,
                JoinPath {
                    table: table.name.clone(),
                    column: table.join_column.clone(),
                },
            );
        }

        for hierarchy in &spec.hierarchies {
            let entity = Entity::row(hierarchy.id, &hierarchy.name, tables::HIERARCHY);
            synonyms.add_all(&hierarchy.name, &hierarchy.synonyms, &entity);
        }

        for level in &spec.levels {
            let table_id = *table_ids.get(level.table.as_str()).ok_or_else(|| {
                CatalogError::Invalid(format!(
                    "level '{}' refers to unknown table '{}'",
                    level.name, level.table
                ))
            })?;
            let entity = Entity::row(level.id, &level.name, tables::LEVEL)
                .with_reference(table_id, &level.table)
                .with_data_type(level.data_type);
            synonyms.add_all(&level.name, &level.synonyms, &entity);

            let domain = members.entry(level.name.clone()).or_default();
            for member in &level.members {
                let member_entity = Entity::row(member.id, &member.name, tables::MEMBER)
                    .with_reference(level.id, &level.name)
                    .with_data_type(level.data_type);
                synonyms.add_all(&member.name, &member.synonyms, &member_entity);
                domain.push(member_entity);

                let owners = member_levels.entry(member.name.to_lowercase()).or_default();
                if !owners.contains(&entity) {
                    owners.push(entity.clone());
                }
            }

            level_ids.insert(level.id, level.name.clone());
            levels.insert(level.name.clone(), entity);
        }

        for measure in &spec.measures {
            let entity = Entity::row(measure.id, &measure.name, tables::MEASURE);
            synonyms.add_all(&measure.name, &measure.synonyms, &entity);
            let ops = measure
                .operators
                .iter()
                .map(|op| operator_entity(&spec, op))
                .collect();
            operators.insert(measure.name.to_lowercase(), ops);
        }

        for predicate in &spec.predicates {
            let entity = Entity::row(predicate.id, &predicate.name, tables::LANGUAGE_PREDICATE);
            synonyms.add_all(&predicate.name, &predicate.synonyms, &entity);
            predicates.insert(
                predicate.id,
                Predicate {
                    kind: predicate.kind.as_str().to_string(),
                    literal: predicate.name.clone(),
                },
            );
        }

        Ok(Self {
            synonyms: synonyms.into_vec(),
            spec,
            predicates,
            operators,
            levels,
            level_ids,
            members,
            member_levels,
            joins,
        })
    }

    pub fn spec(&self) -> &CatalogSpec {
        &self.spec
    }
}

/// Operators share ids with the predicate of the same name when there is one.
fn operator_entity(spec: &CatalogSpec, name: &str) -> Entity {
    let id = spec
        .predicates
        .iter()
        .find(|p| p.kind == PredicateKind::GroupByOperator && p.name.eq_ignore_ascii_case(name))
        .map(|p| p.id);
    match id {
        Some(id) => Entity::row(id, name, tables::GROUP_BY_OPERATOR),
        None => Entity {
            table: Some(tables::GROUP_BY_OPERATOR.to_string()),
            ..Entity::named(name)
        },
    }
}

/// Synonym rows grouped by term, in insertion order.
#[derive(Default)]
struct SynonymIndex {
    rows: Vec<Synonym>,
    by_term: HashMap<Vec<String>, usize>,
}

impl SynonymIndex {
    fn add_all(&mut self, name: &str, extra: &[String], entity: &Entity) {
        self.add(name, entity);
        for term in extra {
            self.add(term, entity);
        }
    }

    fn add(&mut self, text: &str, entity: &Entity) {
        let synonym = Synonym::from_text(text, Vec::new());
        if synonym.term.is_empty() {
            return;
        }
        let idx = match self.by_term.get(&synonym.term) {
            Some(idx) => *idx,
            None => {
                self.by_term.insert(synonym.term.clone(), self.rows.len());
                self.rows.push(synonym);
                self.rows.len() - 1
            }
        };
        let entities = &mut self.rows[idx].entities;
        if !entities.contains(entity) {
            entities.push(entity.clone());
        }
    }

    fn into_vec(self) -> Vec<Synonym> {
        self.rows
    }
}

impl Catalog for InMemoryCatalog {
    fn synonyms(&self) -> CatalogResult<Vec<Synonym>> {
        Ok(self.synonyms.clone())
    }

    fn predicate(&self, id: i64) -> CatalogResult<Predicate> {
        self.predicates
            .get(&id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                what: "predicate",
                key: id.to_string(),
            })
    }

    fn operators_for_measure(&self, measure: &str) -> CatalogResult<Vec<Entity>> {
        Ok(self
            .operators
            .get(&measure.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    fn level_of_member(&self, member: &Entity) -> CatalogResult<Entity> {
        let level = member
            .reference
            .as_ref()
            .and_then(|r| self.level_ids.get(&r.id))
            .and_then(|name| self.levels.get(name));
        level.cloned().ok_or_else(|| CatalogError::NotFound {
            what: "level of member",
            key: member.name.clone(),
        })
    }

    fn value_domain(&self, attribute: &str) -> CatalogResult<Vec<Entity>> {
        Ok(self
            .members
            .get(attribute)
            .map(|m| m.iter().take(VALUE_DOMAIN_LIMIT).cloned().collect())
            .unwrap_or_default())
    }

    fn attributes_for_value(&self, value: &str) -> CatalogResult<Vec<Entity>> {
        Ok(self
            .member_levels
            .get(&value.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    fn year_attributes(&self) -> CatalogResult<Vec<Entity>> {
        Ok(self
            .levels
            .get(&self.spec.year_level)
            .cloned()
            .into_iter()
            .collect())
    }

    fn fact_table(&self) -> CatalogResult<FactTable> {
        self.spec
            .fact
            .as_ref()
            .map(|f| FactTable {
                id: f.id,
                name: f.name.clone(),
            })
            .ok_or(CatalogError::NoFactTable)
    }

    fn join_path(&self, fact_id: i64, table_id: i64) -> CatalogResult<JoinPath> {
        match &self.spec.fact {
            Some(fact) if fact.id == fact_id => {}
            _ => {
                return Err(CatalogError::NoJoinPath {
                    fact: fact_id,
                    table: table_id,
                })
            }
        }
        self.joins
            .get(&table_id)
            .cloned()
            .ok_or(CatalogError::NoJoinPath {
                fact: fact_id,
                table: table_id,
            })
    }
}
