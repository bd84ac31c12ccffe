//! DDL emission module
//!
//! Renders structured schema statements as dialect-specific SQL.

mod emitter;

#[cfg(test)]
mod tests;

pub use emitter::*;
