//! Schema tools for ormsync
//!
//! This crate converges live database tables towards declarative object
//! configurations:
//! - Object configuration documents and stores
//! - Field to column mapping
//! - Schema comparison between declared objects and live tables
//! - DDL emission
//! - The builder that applies changes, foreign keys and relation tables
//! - An in-memory backend for previews and tests

pub mod builder;
pub mod compare;
pub mod memory;
pub mod migration;
pub mod object;
pub mod property;

pub use builder::*;
pub use compare::*;
pub use memory::*;
pub use migration::*;
pub use object::*;
pub use property::*;
