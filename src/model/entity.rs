//! References into the warehouse catalog.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared data type of a catalog element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Numeric,
    Date,
    String,
    Other,
}

impl DataType {
    /// Map a column type name from the catalog to a data type.
    ///
    /// Unrecognized names map to [`DataType::Other`].
    pub fn parse(s: &str) -> DataType {
        match s.trim().to_lowercase().as_str() {
            "numeric" | "number" | "decimal" | "int" | "integer" | "bigint" | "smallint"
            | "tinyint" | "float" | "double" | "real" | "year" => DataType::Numeric,
            "date" | "datetime" | "timestamp" => DataType::Date,
            "string" | "varchar" | "char" | "text" | "nvarchar" | "nchar" => DataType::String,
            _ => DataType::Other,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Numeric => "NUMERIC",
            DataType::Date => "DATE",
            DataType::String => "STRING",
            DataType::Other => "OTHER",
        };
        f.write_str(s)
    }
}

/// Reference from an element to the catalog row it belongs to.
///
/// A member refers to its level; a level refers to the table holding it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ForeignRef {
    pub id: i64,
    pub name: String,
}

impl ForeignRef {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An immutable reference to an element of the warehouse.
///
/// Equality is structural over every field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity {
    /// Primary key of the element in its catalog table.
    pub id: Option<i64>,
    /// Display name of the element.
    pub name: String,
    /// Catalog table the element comes from (`member`, `level`, ...).
    pub table: Option<String>,
    /// Related row in another table.
    pub reference: Option<ForeignRef>,
    /// Declared data type.
    pub data_type: Option<DataType>,
}

impl Entity {
    /// A synthetic entity carrying only a name (implicit operators).
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            table: None,
            reference: None,
            data_type: None,
        }
    }

    /// A literal value with a known data type.
    pub fn literal(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            data_type: Some(data_type),
            ..Self::named(name)
        }
    }

    /// A row of a catalog table.
    pub fn row(id: i64, name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            table: Some(table.into()),
            ..Self::named(name)
        }
    }

    pub fn with_reference(mut self, id: i64, name: impl Into<String>) -> Self {
        self.reference = Some(ForeignRef::new(id, name));
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Declared type, defaulting to [`DataType::Other`].
    pub fn data_type(&self) -> DataType {
        self.data_type.unwrap_or(DataType::Other)
    }

    /// Id of the referenced row, if any.
    pub fn reference_id(&self) -> Option<i64> {
        self.reference.as_ref().map(|r| r.id)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Entity::row(3, "the_year", "level")
            .with_reference(1, "time_by_day")
            .with_data_type(DataType::Numeric);
        let b = Entity::row(3, "the_year", "level")
            .with_reference(1, "time_by_day")
            .with_data_type(DataType::Numeric);
        assert_eq!(a, b);

        let c = b.clone().with_reference(2, "time_by_day");
        assert_ne!(a, c);
    }

    #[test]
    fn test_data_type_defaults_to_other() {
        assert_eq!(Entity::named("=").data_type(), DataType::Other);
        assert_eq!(
            Entity::literal("2020", DataType::Numeric).data_type(),
            DataType::Numeric
        );
    }

    #[test]
    fn test_parse_data_type() {
        assert_eq!(DataType::parse("INTEGER"), DataType::Numeric);
        assert_eq!(DataType::parse("varchar"), DataType::String);
        assert_eq!(DataType::parse("date"), DataType::Date);
        assert_eq!(DataType::parse("blob"), DataType::Other);
    }
}
