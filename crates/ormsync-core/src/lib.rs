//! ormsync core - shared abstractions for schema synchronization
//!
//! This crate provides the traits and types the other ormsync crates depend on:
//!
//! - `Connection` - trait for a live database connection
//! - `SchemaIntrospection` - trait for reading live table metadata
//! - `SchemaStatement` - structured DDL handed to connections for execution
//! - Common types like `Value`, `Row` and `QueryResult`

mod connection;
mod ddl;
mod error;
mod schema;
mod types;

pub use connection::*;
pub use ddl::*;
pub use error::*;
pub use schema::*;
pub use types::*;
