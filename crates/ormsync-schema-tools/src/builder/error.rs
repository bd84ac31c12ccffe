//! Builder error types
//!
//! Only setup failures are errors. Schema-level problems are collected in
//! [`super::Builder::errors`] and reported as `Ok(false)`.

use thiserror::Error;

use crate::object::ConfigError;

/// Fatal errors raised while setting up or running a build
#[derive(Debug, Error)]
pub enum BuilderError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no connection named '{0}'")]
    UnknownConnection(String),

    #[error("connection '{0}' does not support schema introspection")]
    IntrospectionUnsupported(String),

    #[error("relation depth limit {limit} exceeded while building '{object}'")]
    RelationDepthExceeded { object: String, limit: usize },

    #[error("invalid builder settings: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("settings file error: {0}")]
    Io(#[from] std::io::Error),
}
