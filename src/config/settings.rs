//! TOML-based configuration for parlance.
//!
//! Supports a config file (parlance.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [catalog]
//! driver = "sqlite"
//! path = "${PARLANCE_CATALOG}"
//! year_level = "the_year"
//!
//! [interpret]
//! ngram_size = 3
//! member_similarity = 0.8
//! metadata_similarity = 0.8
//! coverage = 0.7
//! max_distance = 2
//!
//! [service]
//! timeout_ms = 5000
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::driver::CatalogDriver;
use crate::cache::SynonymQuery;
use crate::catalog::{Catalog, CatalogError, CatalogSpec, InMemoryCatalog, SqliteCatalog};
use crate::mapping::EnumerateOptions;
use crate::segment::SegmentOptions;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unsupported catalog driver: {0}")]
    UnsupportedDriver(String),

    #[error("Catalog path is not configured")]
    MissingCatalogPath,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub catalog: CatalogSettings,
    pub interpret: InterpretSettings,
    pub service: ServiceSettings,
}

/// Where the warehouse catalog comes from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// Catalog driver (toml, sqlite).
    pub driver: String,

    /// Catalog file (supports ${ENV_VAR} expansion).
    pub path: Option<String>,

    /// Level name used for bare year values; overrides the catalog's own.
    pub year_level: Option<String>,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            driver: "toml".to_string(),
            path: None,
            year_level: None,
        }
    }
}

impl CatalogSettings {
    /// Get the driver type.
    pub fn driver_type(&self) -> Result<CatalogDriver, SettingsError> {
        CatalogDriver::from_str(&self.driver)
    }

    /// Get the catalog path with environment variables expanded.
    pub fn resolved_path(&self) -> Result<PathBuf, SettingsError> {
        let path = self.path.as_deref().ok_or(SettingsError::MissingCatalogPath)?;
        Ok(PathBuf::from(expand_env_vars(path)?))
    }

    /// Open the configured catalog.
    pub fn open(&self) -> Result<Arc<dyn Catalog>, SettingsError> {
        self.open_at(self.driver_type()?, &self.resolved_path()?)
    }

    /// Open a catalog at an explicit location, keeping the configured year level.
    pub fn open_at(
        &self,
        driver: CatalogDriver,
        path: &Path,
    ) -> Result<Arc<dyn Catalog>, SettingsError> {
        let catalog: Arc<dyn Catalog> = match driver {
            CatalogDriver::Toml => {
                let mut spec = CatalogSpec::from_file(path)?;
                if let Some(year_level) = &self.year_level {
                    spec.year_level = year_level.clone();
                }
                Arc::new(InMemoryCatalog::from_spec(spec)?)
            }
            CatalogDriver::Sqlite => {
                let mut catalog = SqliteCatalog::open(path)?;
                if let Some(year_level) = &self.year_level {
                    catalog = catalog.with_year_level(year_level.clone());
                }
                Arc::new(catalog)
            }
        };
        tracing::debug!(driver = driver.as_str(), path = %path.display(), "opened catalog");
        Ok(catalog)
    }
}

/// Interpretation thresholds and limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterpretSettings {
    /// Longest token span matched against synonyms.
    pub ngram_size: usize,

    /// Minimum similarity for member candidates.
    pub member_similarity: f64,

    /// Minimum similarity for metadata candidates.
    pub metadata_similarity: f64,

    /// Candidates kept per span among members.
    pub member_synonyms: usize,

    /// Candidates kept per span among metadata.
    pub metadata_synonyms: usize,

    /// Similarity at which a fragment is confident.
    pub ngram_similarity: f64,

    /// Fraction of the sentence a mapping must cover (0.0 to 1.0).
    pub coverage: f64,

    /// Largest token gap between consecutive fragments of a mapping.
    pub max_distance: usize,

    /// Keep stop words.
    pub skip_cleaning: bool,

    pub stop_words: Vec<String>,
}

impl Default for InterpretSettings {
    fn default() -> Self {
        Self {
            ngram_size: 3,
            member_similarity: 0.8,
            metadata_similarity: 0.8,
            member_synonyms: 4,
            metadata_synonyms: 4,
            ngram_similarity: 0.9,
            coverage: 0.7,
            max_distance: 2,
            skip_cleaning: false,
            stop_words: [
                "the", "of", "in", "a", "an", "to", "me", "is", "are", "what", "all", "please",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl InterpretSettings {
    /// Check that thresholds and limits are in range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let ratios = [
            ("member_similarity", self.member_similarity),
            ("metadata_similarity", self.metadata_similarity),
            ("ngram_similarity", self.ngram_similarity),
            ("coverage", self.coverage),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::InvalidConfig(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        if self.ngram_size == 0 {
            return Err(SettingsError::InvalidConfig(
                "ngram_size must be at least 1".to_string(),
            ));
        }
        if self.max_distance == 0 {
            return Err(SettingsError::InvalidConfig(
                "max_distance must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn synonym_query(&self) -> SynonymQuery {
        SynonymQuery {
            member_threshold: self.member_similarity,
            metadata_threshold: self.metadata_similarity,
            member_limit: self.member_synonyms,
            metadata_limit: self.metadata_synonyms,
        }
    }

    pub fn segment_options(&self) -> SegmentOptions {
        SegmentOptions {
            ngram_size: self.ngram_size,
            synonyms: self.synonym_query(),
            confidence: self.ngram_similarity,
        }
    }

    pub fn enumerate_options(&self) -> EnumerateOptions {
        EnumerateOptions {
            coverage: self.coverage,
            max_distance: self.max_distance,
        }
    }

    /// Lower-cased stop words.
    pub fn stop_word_set(&self) -> HashSet<String> {
        self.stop_words.iter().map(|w| w.to_lowercase()).collect()
    }
}

/// Async service settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Deadline of a single request in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

impl ServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.interpret.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `PARLANCE_CONFIG`
    /// 2. `./parlance.toml`
    /// 3. `~/.config/parlance/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("PARLANCE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("parlance.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("parlance").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let mut var_name = String::new();
        if chars.peek() == Some(&'{') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == '}' {
                    break;
                }
                var_name.push(ch);
            }
        } else {
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                var_name.push(ch);
            }
            if var_name.is_empty() {
                // Lone $
                result.push('$');
                continue;
            }
        }
        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}
