//! Object builder module
//!
//! Creates and alters tables so they match their declared objects,
//! materializes many-to-many junction tables and keeps an optional SQL
//! audit log.

mod config;
mod error;
mod locator;
mod log;
mod relations;
mod table_builder;

#[cfg(test)]
mod tests;

pub use config::*;
pub use error::*;
pub use locator::*;
pub use log::*;
pub use relations::*;
pub use table_builder::*;
