//! Builder settings
//!
//! Settings are passed to every builder explicitly; nothing here is
//! process-wide.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::BuilderError;
use crate::compare::CompareConfig;

/// Where executed DDL is appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlLogConfig {
    pub enabled: bool,
    pub logs_dir: PathBuf,
    /// Suffix of the log file name, usually the application version
    pub prefix: String,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            logs_dir: PathBuf::from("./logs/"),
            prefix: "0.1".to_string(),
        }
    }
}

impl SqlLogConfig {
    /// Enabled log writing into `logs_dir`
    pub fn enabled(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            logs_dir: logs_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Log file for statements run over `connection`
    pub fn log_path(&self, connection: &str) -> PathBuf {
        self.logs_dir.join(format!("{}_{}", connection, self.prefix))
    }
}

/// Settings shared by a builder and the relation builders it spawns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Create derived foreign keys. When off, existing keys are dropped.
    pub foreign_keys: bool,
    pub sql_log: SqlLogConfig,
    /// How deep relation tables may trigger nested builds
    pub relation_depth_limit: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            foreign_keys: false,
            sql_log: SqlLogConfig::default(),
            relation_depth_limit: 1,
        }
    }
}

impl BuilderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn with_sql_log(mut self, sql_log: SqlLogConfig) -> Self {
        self.sql_log = sql_log;
        self
    }

    pub fn with_relation_depth_limit(mut self, limit: usize) -> Self {
        self.relation_depth_limit = limit;
        self
    }

    /// Parse settings from TOML; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self, BuilderError> {
        Ok(toml::from_str(content)?)
    }

    /// Load settings from a TOML file, or defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self, BuilderError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Comparator settings implied by these settings
    pub fn compare_config(&self) -> CompareConfig {
        CompareConfig::new().with_foreign_keys(self.foreign_keys)
    }
}
