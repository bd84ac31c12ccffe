//! In-memory schema backend
//!
//! A [`MemoryDatabase`] stands in for a live server: it applies DDL to its
//! own catalogue and reports metadata the way MySQL does. Useful for
//! dry-run previews and for exercising builds without a server.

mod database;


pub use database::*;
