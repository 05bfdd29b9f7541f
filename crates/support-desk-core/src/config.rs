//! Configuration and settings management
//!
//! Loads desk settings from config files and environment variables.

use crate::managers::{AdminRegistration, OpenRegistration, RegistrationGate};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Default `SQLite` database file
pub const DEFAULT_DATABASE_PATH: &str = "support_bot.db";

/// Who may register as a manager
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationMode {
    /// Anyone who sends the registration command
    #[default]
    Open,
    /// Only ids listed in `ADMIN_IDS`
    Admins,
}

/// Core desk settings
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DeskSettings {
    /// Path of the `SQLite` database
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Manager registration policy
    #[serde(default)]
    pub manager_registration: RegistrationMode,

    /// Comma-separated list of admin user IDs
    #[serde(rename = "admin_ids")]
    pub admin_ids_str: Option<String>,
}

fn default_database_path() -> String {
    DEFAULT_DATABASE_PATH.to_string()
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            manager_registration: RegistrationMode::default(),
            admin_ids_str: None,
        }
    }
}

/// Build the layered configuration: config files first, then the environment.
///
/// # Errors
///
/// Returns a `ConfigError` if a source cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        // UPPER_SNAKE_CASE maps to snake_case keys; empty vars count as unset
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl DeskSettings {
    /// Load settings from config files and the environment
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading or deserialization fails.
    pub fn new() -> Result<Self, ConfigError> {
        build_config()?.try_deserialize()
    }

    /// Parsed admin ids; unparsable tokens are skipped
    #[must_use]
    pub fn admin_ids(&self) -> HashSet<i64> {
        self.admin_ids_str
            .as_deref()
            .map(parse_id_list)
            .unwrap_or_default()
    }

    /// Registration gate for the configured policy
    #[must_use]
    pub fn registration_gate(&self) -> Arc<dyn RegistrationGate> {
        match self.manager_registration {
            RegistrationMode::Open => Arc::new(OpenRegistration),
            RegistrationMode::Admins => Arc::new(AdminRegistration::new(self.admin_ids())),
        }
    }
}

fn parse_id_list(s: &str) -> HashSet<i64> {
    s.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .filter_map(|id| id.parse::<i64>().ok())
        .collect()
}
