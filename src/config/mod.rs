//! Configuration module for parlance.
//!
//! Handles catalog selection, interpretation thresholds, and service settings.

mod driver;
mod settings;

pub use driver::CatalogDriver;
pub use settings::{
    expand_env_vars, CatalogSettings, InterpretSettings, ServiceSettings, Settings, SettingsError,
};
