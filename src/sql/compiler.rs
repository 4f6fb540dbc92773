//! Compilation of QUERY trees into SQL.
//!
//! # Compilation Flow
//!
//! ```text
//! Q(MC, GC, SC)
//!   ├── MC ──▶ aggregates           sum(unit_sales), count(*)
//!   ├── GC ──▶ group-by attributes  registered for joins
//!   └── SC ──▶ conditions           registered for joins
//!                                    (members resolve their level)
//! registered attributes ──▶ owning tables ──▶ t1, t2, ... in first-seen order
//!                                       └──▶ INNER JOIN tN ON tN.col = FT.col
//! ```
//!
//! Attribute references are qualified with their table alias when the
//! structured query is built, so rendering never rewrites text.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::catalog::{Catalog, FactTable};
use crate::model::{DataType, Entity, Mapping, Ngram, NodeKind};
use crate::semantic::{InterpretError, InterpretResult};

/// Returned by [`SqlCompiler::to_sql`] when the mapping has no QUERY node.
pub const NO_QUERY: &str = "IT IS NOT POSSIBLE TO CLOSE THE QUERY";

/// Alias of the fact table.
pub const FACT_ALIAS: &str = "FT";

/// Aggregation applied when a measure clause carries no operator.
pub const DEFAULT_AGGREGATION: &str = "sum";

/// An aggregate in the SELECT list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregate {
    pub function: String,
    /// Measure column; `None` means `*`.
    pub column: Option<String>,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}({})", self.function, column),
            None => write!(f, "{}(*)", self.function),
        }
    }
}

/// A column qualified by a table alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}

/// A literal in a condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SqlValue {
    Number(String),
    Text(String),
}

impl SqlValue {
    fn from_entity(entity: &Entity) -> Self {
        match entity.data_type() {
            DataType::Numeric => SqlValue::Number(entity.name.replace(',', ".")),
            _ => SqlValue::Text(entity.name.clone()),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Number(n) => f.write_str(n),
            SqlValue::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
        }
    }
}

/// An item of the WHERE clause, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Condition {
    Compare {
        column: ColumnRef,
        op: String,
        value: SqlValue,
        negated: bool,
    },
    Between {
        column: ColumnRef,
        low: SqlValue,
        high: SqlValue,
        negated: bool,
    },
    And,
    Or,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare {
                column,
                op,
                value,
                negated,
            } => {
                if *negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "{} {} {}", column, op, value)
            }
            Condition::Between {
                column,
                low,
                high,
                negated,
            } => {
                if *negated {
                    f.write_str("NOT ")?;
                }
                write!(f, "{} BETWEEN {} AND {}", column, low, high)
            }
            Condition::And => f.write_str("AND"),
            Condition::Or => f.write_str("OR"),
        }
    }
}

/// `INNER JOIN table alias ON alias.column = FT.column`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinClause {
    pub table: String,
    pub alias: String,
    pub column: String,
}

impl fmt::Display for JoinClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "INNER JOIN {} {} ON {}.{} = {}.{}",
            self.table, self.alias, self.alias, self.column, FACT_ALIAS, self.column
        )
    }
}

/// A compiled analytical query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub select: Vec<Aggregate>,
    pub fact: FactTable,
    pub joins: Vec<JoinClause>,
    pub conditions: Vec<Condition>,
    pub group_by: Vec<ColumnRef>,
}

impl SqlQuery {
    pub fn to_sql(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let select = self
            .select
            .iter()
            .map(Aggregate::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "SELECT {}\nFROM {} {}", select, self.fact.name, FACT_ALIAS)?;
        for join in &self.joins {
            write!(f, "\n{}", join)?;
        }
        if !self.conditions.is_empty() {
            let filter = self
                .conditions
                .iter()
                .map(Condition::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            write!(f, "\nWHERE {}", filter)?;
        }
        if !self.group_by.is_empty() {
            let group_by = self
                .group_by
                .iter()
                .map(ColumnRef::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "\nGROUP BY {}", group_by)?;
        }
        Ok(())
    }
}

/// A WHERE item before aliases are known.
enum PendingCondition {
    Compare {
        attribute: Entity,
        op: String,
        value: SqlValue,
        negated: bool,
    },
    Between {
        attribute: Entity,
        low: SqlValue,
        high: SqlValue,
        negated: bool,
    },
    And,
    Or,
}

/// Compiles QUERY trees against a catalog.
pub struct SqlCompiler<'a> {
    catalog: &'a dyn Catalog,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(catalog: &'a dyn Catalog) -> Self {
        Self { catalog }
    }

    /// SQL text of the mapping's QUERY node, or [`NO_QUERY`] without one.
    pub fn to_sql(&self, mapping: &Mapping) -> InterpretResult<String> {
        match mapping.query() {
            Some(query) => Ok(self.compile(query)?.to_sql()),
            None => Ok(NO_QUERY.to_string()),
        }
    }

    /// Compile a QUERY node.
    pub fn compile(&self, query: &Ngram) -> InterpretResult<SqlQuery> {
        let mut select = Vec::new();
        let mut group_by: Vec<Entity> = Vec::new();
        let mut pending = Vec::new();
        let mut attributes: Vec<Entity> = Vec::new();

        for clause in &query.children {
            match clause.kind {
                NodeKind::MeasureClause => collect_aggregates(&clause.children, &mut select),
                NodeKind::GroupByClause => {
                    for leaf in clause.leaves() {
                        if leaf.kind != NodeKind::GroupByTerm && !group_by.contains(&leaf.entity) {
                            group_by.push(leaf.entity.clone());
                        }
                    }
                    register(&mut attributes, group_by.iter().cloned());
                }
                NodeKind::SelectionClause => {
                    let (conditions, explicit, resolved) = self.collect_conditions(clause)?;
                    pending = conditions;
                    register(&mut attributes, explicit);
                    register(&mut attributes, resolved);
                }
                _ => {}
            }
        }

        let fact = self.catalog.fact_table()?;
        let mut aliases: HashMap<i64, String> = HashMap::new();
        let mut joins = Vec::new();
        for attribute in &attributes {
            let table_id = table_of(attribute)?;
            if aliases.contains_key(&table_id) {
                continue;
            }
            let path = self.catalog.join_path(fact.id, table_id)?;
            let alias = format!("t{}", joins.len() + 1);
            aliases.insert(table_id, alias.clone());
            joins.push(JoinClause {
                table: path.table,
                alias,
                column: path.column,
            });
        }

        let column = |attribute: &Entity| -> InterpretResult<ColumnRef> {
            let table_id = table_of(attribute)?;
            let alias = aliases
                .get(&table_id)
                .cloned()
                .ok_or_else(|| InterpretError::MissingTableReference {
                    attribute: attribute.name.clone(),
                })?;
            Ok(ColumnRef {
                alias,
                column: attribute.name.clone(),
            })
        };

        let conditions = pending
            .into_iter()
            .map(|c| {
                Ok(match c {
                    PendingCondition::Compare {
                        attribute,
                        op,
                        value,
                        negated,
                    } => Condition::Compare {
                        column: column(&attribute)?,
                        op,
                        value,
                        negated,
                    },
                    PendingCondition::Between {
                        attribute,
                        low,
                        high,
                        negated,
                    } => Condition::Between {
                        column: column(&attribute)?,
                        low,
                        high,
                        negated,
                    },
                    PendingCondition::And => Condition::And,
                    PendingCondition::Or => Condition::Or,
                })
            })
            .collect::<InterpretResult<Vec<_>>>()?;

        let group_by = group_by
            .iter()
            .map(&column)
            .collect::<InterpretResult<Vec<_>>>()?;

        Ok(SqlQuery {
            select,
            fact,
            joins,
            conditions,
            group_by,
        })
    }

    /// Walk the leaves of a selection clause.
    ///
    /// Returns the conditions, the attributes named in the clause, and the
    /// levels resolved for members compared without an attribute.
    fn collect_conditions(
        &self,
        clause: &Ngram,
    ) -> InterpretResult<(Vec<PendingCondition>, Vec<Entity>, Vec<Entity>)> {
        let mut out = Vec::new();
        let mut explicit = Vec::new();
        let mut resolved = Vec::new();

        let mut attr: Option<Entity> = None;
        let mut op: Option<String> = None;
        let mut between = false;
        let mut low: Option<SqlValue> = None;
        let mut negated = false;
        let mut leading: Option<SqlValue> = None;

        for leaf in clause.leaves() {
            match leaf.kind {
                NodeKind::And | NodeKind::Or => {
                    let ends_with_condition = matches!(
                        out.last(),
                        Some(PendingCondition::Compare { .. } | PendingCondition::Between { .. })
                    );
                    if ends_with_condition {
                        out.push(if leaf.kind == NodeKind::And {
                            PendingCondition::And
                        } else {
                            PendingCondition::Or
                        });
                    }
                }
                NodeKind::Not => negated = true,
                NodeKind::Attribute => {
                    explicit.push(leaf.entity.clone());
                    match leading.take() {
                        // `value op attr`: the value came first
                        Some(value) => {
                            let op = op
                                .take()
                                .map(|o| mirror(&o))
                                .unwrap_or_else(|| "=".to_string());
                            out.push(PendingCondition::Compare {
                                attribute: leaf.entity.clone(),
                                op,
                                value,
                                negated,
                            });
                            negated = false;
                        }
                        None => attr = Some(leaf.entity.clone()),
                    }
                }
                NodeKind::ComparisonOperator => op = Some(leaf.entity.name.clone()),
                NodeKind::Between => between = true,
                NodeKind::Value => {
                    let value = SqlValue::from_entity(&leaf.entity);
                    if between && low.is_none() {
                        low = Some(value);
                        continue;
                    }
                    if attr.is_none() && leaf.entity.reference.is_some() {
                        let level = self.catalog.level_of_member(&leaf.entity)?;
                        resolved.push(level.clone());
                        attr = Some(level);
                    }
                    let Some(attribute) = attr.take() else {
                        leading = Some(value);
                        continue;
                    };
                    match low.take() {
                        Some(low) if between => out.push(PendingCondition::Between {
                            attribute,
                            low,
                            high: value,
                            negated,
                        }),
                        _ => out.push(PendingCondition::Compare {
                            attribute,
                            op: op.take().unwrap_or_else(|| "=".to_string()),
                            value,
                            negated,
                        }),
                    }
                    op = None;
                    between = false;
                    negated = false;
                }
                _ => {}
            }
        }

        Ok((out, explicit, resolved))
    }
}

/// Comparison operator with its operands swapped.
fn mirror(op: &str) -> String {
    match op {
        "<" => ">",
        ">" => "<",
        "<=" => ">=",
        ">=" => "<=",
        other => other,
    }
    .to_string()
}

/// Aggregates of a measure clause; nested measure clauses add their own.
fn collect_aggregates(children: &[Ngram], out: &mut Vec<Aggregate>) {
    let mut function: Option<String> = None;
    let mut column: Option<Option<String>> = None;

    for child in children {
        if !child.is_leaf() {
            collect_aggregates(&child.children, out);
            continue;
        }
        match child.kind {
            NodeKind::Aggregation | NodeKind::Count => {
                function = Some(child.entity.name.to_lowercase())
            }
            NodeKind::Fact => column = Some(None),
            NodeKind::Measure => column = Some(Some(child.entity.name.clone())),
            _ => {}
        }
    }

    if let Some(column) = column {
        let function = function.unwrap_or_else(|| match column {
            Some(_) => DEFAULT_AGGREGATION.to_string(),
            None => "count".to_string(),
        });
        out.push(Aggregate { function, column });
    }
}

fn register(attributes: &mut Vec<Entity>, found: impl IntoIterator<Item = Entity>) {
    for attribute in found {
        if !attributes.contains(&attribute) {
            attributes.push(attribute);
        }
    }
}

fn table_of(attribute: &Entity) -> InterpretResult<i64> {
    attribute
        .reference_id()
        .ok_or_else(|| InterpretError::MissingTableReference {
            attribute: attribute.name.clone(),
        })
}
