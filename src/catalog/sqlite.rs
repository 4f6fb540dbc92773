//! Catalog stored in a SQLite database.
//!
//! # Schema
//!
//! ```text
//! "table"(table_id, table_name, table_type)            table_type: FT | DT
//! "column"(column_id, column_name, column_type, table_id, relationship_id)
//! relationship(relationship_id, table1, table2)        table1 = fact table
//! fact(fact_id, fact_name, table_id)
//! hierarchy(hierarchy_id, hierarchy_name)
//! level(level_id, level_name, level_type, column_id, hierarchy_id)
//! member(member_id, member_name, level_id)
//! measure(measure_id, measure_name, fact_id)
//! groupbyoperator(groupbyoperator_id, groupbyoperator_name)
//! groupbyoperator_of_measure(groupbyoperator_id, measure_id)
//! language_predicate(language_predicate_id, language_predicate_name, language_predicate_type)
//! synonym(synonym_id, term, table_name, reference_id)
//! ```
//!
//! The join column between the fact table and a dimension table is the
//! column attached to the relationship `table1 = fact, table2 = dimension`.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{
    tables, Catalog, CatalogError, CatalogResult, CatalogSpec, FactTable, JoinPath, Predicate,
    PredicateKind, Synonym, DEFAULT_YEAR_LEVEL, VALUE_DOMAIN_LIMIT,
};
use crate::model::{DataType, Entity};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "table" (
    table_id INTEGER PRIMARY KEY,
    table_name TEXT NOT NULL,
    table_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS relationship (
    relationship_id INTEGER PRIMARY KEY,
    table1 INTEGER NOT NULL,
    table2 INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS "column" (
    column_id INTEGER PRIMARY KEY,
    column_name TEXT NOT NULL,
    column_type TEXT,
    table_id INTEGER NOT NULL,
    relationship_id INTEGER
);

CREATE TABLE IF NOT EXISTS fact (
    fact_id INTEGER PRIMARY KEY,
    fact_name TEXT NOT NULL,
    table_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS hierarchy (
    hierarchy_id INTEGER PRIMARY KEY,
    hierarchy_name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS level (
    level_id INTEGER PRIMARY KEY,
    level_name TEXT NOT NULL,
    level_type TEXT NOT NULL,
    column_id INTEGER NOT NULL,
    hierarchy_id INTEGER
);

CREATE TABLE IF NOT EXISTS member (
    member_id INTEGER PRIMARY KEY,
    member_name TEXT NOT NULL,
    level_id INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS measure (
    measure_id INTEGER PRIMARY KEY,
    measure_name TEXT NOT NULL,
    fact_id INTEGER
);

CREATE TABLE IF NOT EXISTS groupbyoperator (
    groupbyoperator_id INTEGER PRIMARY KEY,
    groupbyoperator_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS groupbyoperator_of_measure (
    groupbyoperator_id INTEGER NOT NULL,
    measure_id INTEGER NOT NULL,
    PRIMARY KEY (groupbyoperator_id, measure_id)
);

CREATE TABLE IF NOT EXISTS language_predicate (
    language_predicate_id INTEGER PRIMARY KEY,
    language_predicate_name TEXT NOT NULL,
    language_predicate_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS synonym (
    synonym_id INTEGER PRIMARY KEY,
    term TEXT NOT NULL,
    table_name TEXT NOT NULL,
    reference_id INTEGER NOT NULL
);
"#;

/// Level columns selected by every level-returning query, aliased `l`, `t`.
const LEVEL_COLUMNS: &str = "l.level_id, l.level_name, l.level_type, t.table_id, t.table_name";

/// A [`Catalog`] reading from SQLite.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
    year_level: String,
}

impl SqliteCatalog {
    /// Open an existing catalog database.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if !path.exists() {
            return Err(CatalogError::FileNotFound(path.to_path_buf()));
        }
        let conn = Connection::open(path)?;
        Ok(Self::with_connection(conn))
    }

    /// Open or create a catalog database and install the schema.
    pub fn create(path: &Path) -> CatalogResult<Self> {
        let catalog = Self::with_connection(Connection::open(path)?);
        catalog.install_schema()?;
        Ok(catalog)
    }

    /// Open an empty in-memory catalog with the schema installed.
    pub fn open_in_memory() -> CatalogResult<Self> {
        let catalog = Self::with_connection(Connection::open_in_memory()?);
        catalog.install_schema()?;
        Ok(catalog)
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            year_level: DEFAULT_YEAR_LEVEL.to_string(),
        }
    }

    /// Name of the level used for the year heuristic.
    pub fn with_year_level(mut self, name: impl Into<String>) -> Self {
        self.year_level = name.into();
        self
    }

    /// Create the catalog tables if they don't exist.
    pub fn install_schema(&self) -> CatalogResult<()> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    fn conn(&self) -> CatalogResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::LockPoisoned)
    }

    /// Load a warehouse description into the database.
    ///
    /// Every element gets its own name as a synonym in addition to the listed
    /// ones. Runs in a single transaction.
    pub fn import(&self, spec: &CatalogSpec) -> CatalogResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let table_ids: HashMap<&str, i64> = spec
            .tables
            .iter()
            .map(|t| (t.name.as_str(), t.id))
            .collect();

        if let Some(fact) = &spec.fact {
            tx.execute(
                r#"INSERT INTO "table" (table_id, table_name, table_type) VALUES (?, ?, 'FT')"#,
                params![fact.id, fact.name],
            )?;
            tx.execute(
                "INSERT INTO fact (fact_id, fact_name, table_id) VALUES (?, ?, ?)",
                params![fact.id, fact.name, fact.id],
            )?;
            insert_synonyms(&tx, tables::FACT, fact.id, &fact.name, &fact.synonyms)?;
        }

        for table in &spec.tables {
            tx.execute(
                r#"INSERT INTO "table" (table_id, table_name, table_type) VALUES (?, ?, 'DT')"#,
                params![table.id, table.name],
            )?;
            if let Some(fact) = &spec.fact {
                tx.execute(
                    "INSERT INTO relationship (table1, table2) VALUES (?, ?)",
                    params![fact.id, table.id],
                )?;
                let relationship_id = tx.last_insert_rowid();
                tx.execute(
                    r#"INSERT INTO "column" (column_name, table_id, relationship_id) VALUES (?, ?, ?)"#,
                    params![table.join_column, table.id, relationship_id],
                )?;
            }
        }

        for hierarchy in &spec.hierarchies {
            tx.execute(
                "INSERT INTO hierarchy (hierarchy_id, hierarchy_name) VALUES (?, ?)",
                params![hierarchy.id, hierarchy.name],
            )?;
            insert_synonyms(
                &tx,
                tables::HIERARCHY,
                hierarchy.id,
                &hierarchy.name,
                &hierarchy.synonyms,
            )?;
        }

        for level in &spec.levels {
            let table_id = *table_ids.get(level.table.as_str()).ok_or_else(|| {
                CatalogError::Invalid(format!(
                    "level '{}' refers to unknown table '{}'",
                    level.name, level.table
                ))
            })?;
            tx.execute(
                r#"INSERT INTO "column" (column_name, column_type, table_id) VALUES (?, ?, ?)"#,
                params![level.name, level.data_type.to_string(), table_id],
            )?;
            let column_id = tx.last_insert_rowid();
            tx.execute(
                "INSERT INTO level (level_id, level_name, level_type, column_id) VALUES (?, ?, ?, ?)",
                params![level.id, level.name, level.data_type.to_string(), column_id],
            )?;
            insert_synonyms(&tx, tables::LEVEL, level.id, &level.name, &level.synonyms)?;

            for member in &level.members {
                tx.execute(
                    "INSERT INTO member (member_id, member_name, level_id) VALUES (?, ?, ?)",
                    params![member.id, member.name, level.id],
                )?;
                insert_synonyms(&tx, tables::MEMBER, member.id, &member.name, &member.synonyms)?;
            }
        }

        for predicate in &spec.predicates {
            tx.execute(
                "INSERT INTO language_predicate \
                 (language_predicate_id, language_predicate_name, language_predicate_type) \
                 VALUES (?, ?, ?)",
                params![predicate.id, predicate.name, predicate.kind.as_str()],
            )?;
            if predicate.kind == PredicateKind::GroupByOperator {
                tx.execute(
                    "INSERT OR IGNORE INTO groupbyoperator (groupbyoperator_id, groupbyoperator_name) \
                     VALUES (?, ?)",
                    params![predicate.id, predicate.name],
                )?;
            }
            insert_synonyms(
                &tx,
                tables::LANGUAGE_PREDICATE,
                predicate.id,
                &predicate.name,
                &predicate.synonyms,
            )?;
        }

        for measure in &spec.measures {
            tx.execute(
                "INSERT INTO measure (measure_id, measure_name, fact_id) VALUES (?, ?, ?)",
                params![measure.id, measure.name, spec.fact.as_ref().map(|f| f.id)],
            )?;
            insert_synonyms(&tx, tables::MEASURE, measure.id, &measure.name, &measure.synonyms)?;

            for op in &measure.operators {
                tx.execute(
                    "INSERT OR IGNORE INTO groupbyoperator (groupbyoperator_name) VALUES (?)",
                    params![op],
                )?;
                tx.execute(
                    "INSERT INTO groupbyoperator_of_measure (groupbyoperator_id, measure_id) \
                     SELECT groupbyoperator_id, ? FROM groupbyoperator WHERE groupbyoperator_name = ?",
                    params![measure.id, op],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn insert_synonyms(
    tx: &rusqlite::Transaction<'_>,
    table: &str,
    id: i64,
    name: &str,
    synonyms: &[String],
) -> CatalogResult<()> {
    let mut stmt =
        tx.prepare_cached("INSERT INTO synonym (term, table_name, reference_id) VALUES (?, ?, ?)")?;
    stmt.execute(params![name, table, id])?;
    for term in synonyms {
        stmt.execute(params![term, table, id])?;
    }
    Ok(())
}

/// Read a level row selected with [`LEVEL_COLUMNS`].
fn level_from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    let id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let level_type: String = row.get(2)?;
    let table_id: i64 = row.get(3)?;
    let table_name: String = row.get(4)?;
    Ok(Entity::row(id, name, tables::LEVEL)
        .with_reference(table_id, table_name)
        .with_data_type(DataType::parse(&level_type)))
}

/// Groups synonym rows by term, keeping first-seen order.
#[derive(Default)]
struct SynonymRows {
    rows: Vec<Synonym>,
    index: HashMap<Vec<String>, usize>,
}

impl SynonymRows {
    fn push(&mut self, term: &str, entity: Entity) {
        let synonym = Synonym::from_text(term, Vec::new());
        if synonym.term.is_empty() {
            return;
        }
        let idx = match self.index.get(&synonym.term) {
            Some(idx) => *idx,
            None => {
                self.index.insert(synonym.term.clone(), self.rows.len());
                self.rows.push(synonym);
                self.rows.len() - 1
            }
        };
        self.rows[idx].entities.push(entity);
    }
}

impl Catalog for SqliteCatalog {
    fn synonyms(&self) -> CatalogResult<Vec<Synonym>> {
        let conn = self.conn()?;
        let mut acc = SynonymRows::default();

        for table in [
            tables::FACT,
            tables::HIERARCHY,
            tables::MEASURE,
            tables::LANGUAGE_PREDICATE,
        ] {
            let sql = format!(
                "SELECT s.term, x.{t}_id, x.{t}_name FROM synonym s, {t} x \
                 WHERE s.reference_id = x.{t}_id AND s.table_name = '{t}' \
                 ORDER BY s.synonym_id",
                t = table
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                let term: String = row.get(0)?;
                let id: i64 = row.get(1)?;
                let name: String = row.get(2)?;
                Ok((term, Entity::row(id, name, table)))
            })?;
            for row in rows {
                let (term, entity) = row?;
                acc.push(&term, entity);
            }
        }

        let mut stmt = conn.prepare(
            "SELECT s.term, m.member_id, m.member_name, l.level_id, l.level_name, l.level_type \
             FROM synonym s, member m, level l \
             WHERE s.table_name = 'member' AND s.reference_id = m.member_id \
             AND m.level_id = l.level_id \
             ORDER BY s.synonym_id",
        )?;
        let rows = stmt.query_map([], |row| {
            let term: String = row.get(0)?;
            let level_type: String = row.get(5)?;
            let entity = Entity::row(row.get(1)?, row.get::<_, String>(2)?, tables::MEMBER)
                .with_reference(row.get(3)?, row.get::<_, String>(4)?)
                .with_data_type(DataType::parse(&level_type));
            Ok((term, entity))
        })?;
        for row in rows {
            let (term, entity) = row?;
            acc.push(&term, entity);
        }

        let sql = format!(
            r#"SELECT s.term, {LEVEL_COLUMNS} FROM synonym s, level l, "column" c, "table" t
               WHERE s.table_name = 'level' AND s.reference_id = l.level_id
               AND c.column_id = l.column_id AND c.table_id = t.table_id
               ORDER BY s.synonym_id"#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let term: String = row.get(0)?;
            let id: i64 = row.get(1)?;
            let name: String = row.get(2)?;
            let level_type: String = row.get(3)?;
            let table_id: i64 = row.get(4)?;
            let table_name: String = row.get(5)?;
            let entity = Entity::row(id, name, tables::LEVEL)
                .with_reference(table_id, table_name)
                .with_data_type(DataType::parse(&level_type));
            Ok((term, entity))
        })?;
        for row in rows {
            let (term, entity) = row?;
            acc.push(&term, entity);
        }

        Ok(acc.rows)
    }

    fn predicate(&self, id: i64) -> CatalogResult<Predicate> {
        self.conn()?
            .query_row(
                "SELECT language_predicate_type, language_predicate_name \
                 FROM language_predicate WHERE language_predicate_id = ?",
                params![id],
                |row| {
                    Ok(Predicate {
                        kind: row.get(0)?,
                        literal: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| CatalogError::NotFound {
                what: "predicate",
                key: id.to_string(),
            })
    }

    fn operators_for_measure(&self, measure: &str) -> CatalogResult<Vec<Entity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT g.groupbyoperator_id, g.groupbyoperator_name \
             FROM groupbyoperator_of_measure gm, measure m, groupbyoperator g \
             WHERE g.groupbyoperator_id = gm.groupbyoperator_id \
             AND gm.measure_id = m.measure_id \
             AND lower(m.measure_name) = lower(?) \
             ORDER BY g.groupbyoperator_id",
        )?;
        let rows = stmt.query_map(params![measure], |row| {
            let id: i64 = row.get(0)?;
            let name: String = row.get(1)?;
            Ok(Entity::row(id, name, tables::GROUP_BY_OPERATOR))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn level_of_member(&self, member: &Entity) -> CatalogResult<Entity> {
        let level_id = member.reference_id().ok_or_else(|| CatalogError::NotFound {
            what: "level of member",
            key: member.name.clone(),
        })?;
        let sql = format!(
            r#"SELECT {LEVEL_COLUMNS} FROM level l, "column" c, "table" t
               WHERE c.column_id = l.column_id AND c.table_id = t.table_id
               AND l.level_id = ?"#
        );
        self.conn()?
            .query_row(&sql, params![level_id], level_from_row)
            .optional()?
            .ok_or_else(|| CatalogError::NotFound {
                what: "level of member",
                key: member.name.clone(),
            })
    }

    fn value_domain(&self, attribute: &str) -> CatalogResult<Vec<Entity>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT m.member_id, m.member_name, l.level_id, l.level_name, l.level_type \
             FROM member m, level l \
             WHERE m.level_id = l.level_id AND l.level_name = ? \
             ORDER BY m.member_id LIMIT ?",
        )?;
        let rows = stmt.query_map(params![attribute, VALUE_DOMAIN_LIMIT as i64], |row| {
            let level_type: String = row.get(4)?;
            Ok(
                Entity::row(row.get(0)?, row.get::<_, String>(1)?, tables::MEMBER)
                    .with_reference(row.get(2)?, row.get::<_, String>(3)?)
                    .with_data_type(DataType::parse(&level_type)),
            )
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn attributes_for_value(&self, value: &str) -> CatalogResult<Vec<Entity>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"SELECT DISTINCT {LEVEL_COLUMNS} FROM member m, level l, "column" c, "table" t
               WHERE m.level_id = l.level_id AND c.column_id = l.column_id
               AND c.table_id = t.table_id AND lower(m.member_name) = lower(?)
               ORDER BY l.level_id"#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![value], level_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn year_attributes(&self) -> CatalogResult<Vec<Entity>> {
        let conn = self.conn()?;
        let sql = format!(
            r#"SELECT {LEVEL_COLUMNS} FROM level l, "column" c, "table" t
               WHERE c.table_id = t.table_id AND l.column_id = c.column_id
               AND l.level_name = ?"#
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![self.year_level], level_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn fact_table(&self) -> CatalogResult<FactTable> {
        self.conn()?
            .query_row(
                r#"SELECT table_id, table_name FROM "table" WHERE table_type = 'FT'"#,
                [],
                |row| {
                    Ok(FactTable {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(CatalogError::NoFactTable)
    }

    fn join_path(&self, fact_id: i64, table_id: i64) -> CatalogResult<JoinPath> {
        self.conn()?
            .query_row(
                r#"SELECT t.table_name, c.column_name
                   FROM "column" c
                   INNER JOIN relationship r ON c.relationship_id = r.relationship_id
                   INNER JOIN "table" t ON t.table_id = r.table2
                   WHERE r.table1 = ? AND r.table2 = ?"#,
                params![fact_id, table_id],
                |row| {
                    Ok(JoinPath {
                        table: row.get(0)?,
                        column: row.get(1)?,
                    })
                },
            )
            .optional()?
            .ok_or(CatalogError::NoJoinPath {
                fact: fact_id,
                table: table_id,
            })
    }
}
