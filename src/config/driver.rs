//! Catalog drivers.

use super::settings::SettingsError;

/// Supported catalog stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogDriver {
    /// Warehouse description in a TOML file
    Toml,
    /// Relational catalog in a SQLite database
    Sqlite,
}

impl CatalogDriver {
    /// Parse driver from string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, SettingsError> {
        match s.to_lowercase().as_str() {
            "toml" | "memory" => Ok(CatalogDriver::Toml),
            "sqlite" | "sqlite3" => Ok(CatalogDriver::Sqlite),
            other => Err(SettingsError::UnsupportedDriver(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogDriver::Toml => "toml",
            CatalogDriver::Sqlite => "sqlite",
        }
    }
}
