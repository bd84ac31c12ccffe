//! Object configuration sources
//!
//! Object names are case-insensitive; stores key them in lowercase.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;
use thiserror::Error;

use super::config::ObjectConfig;

/// Errors raised while reading or writing object configurations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("object config not found: {0}")]
    NotFound(String),

    #[error("invalid document for object config '{name}': {source}")]
    Document {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid object config '{name}': {message}")]
    Invalid { name: String, message: String },

    #[error("config storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where declarative object configurations live
pub trait ObjectConfigSource: Send + Sync {
    /// Load and validate the configuration of `name`
    fn load(&self, name: &str) -> Result<ObjectConfig, ConfigError>;

    /// Persist a configuration under its own name
    fn save(&self, config: &ObjectConfig) -> Result<(), ConfigError>;

    /// Check whether a configuration exists for `name`
    fn exists(&self, name: &str) -> bool;

    /// Names of all stored configurations
    fn list(&self) -> Result<Vec<String>, ConfigError>;
}

fn config_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One `<name>.json` document per object in a directory
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    dir: PathBuf,
}

impl FileConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", config_key(name)))
    }
}

impl ObjectConfigSource for FileConfigStore {
    fn load(&self, name: &str) -> Result<ObjectConfig, ConfigError> {
        let path = self.path_for(name);
        let json = match std::fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(object = %name, path = %path.display(), "loaded object config");
        ObjectConfig::from_json(name, &json)
    }

    fn save(&self, config: &ObjectConfig) -> Result<(), ConfigError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
        }
        let path = self.path_for(&config.name);
        std::fs::write(&path, config.to_json()?)?;
        tracing::debug!(object = %config.name, path = %path.display(), "saved object config");
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    fn list(&self) -> Result<Vec<String>, ConfigError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

/// In-process configuration store
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    configs: RwLock<IndexMap<String, ObjectConfig>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration, replacing any with the same name
    pub fn insert(&self, mut config: ObjectConfig) {
        config.normalize();
        self.configs.write().insert(config_key(&config.name), config);
    }

    pub fn with_config(self, config: ObjectConfig) -> Self {
        self.insert(config);
        self
    }
}

impl ObjectConfigSource for MemoryConfigStore {
    fn load(&self, name: &str) -> Result<ObjectConfig, ConfigError> {
        let config = self
            .configs
            .read()
            .get(&config_key(name))
            .cloned()
            .ok_or_else(|| ConfigError::NotFound(name.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn save(&self, config: &ObjectConfig) -> Result<(), ConfigError> {
        self.insert(config.clone());
        Ok(())
    }

    fn exists(&self, name: &str) -> bool {
        self.configs.read().contains_key(&config_key(name))
    }

    fn list(&self) -> Result<Vec<String>, ConfigError> {
        Ok(self.configs.read().keys().cloned().collect())
    }
}
