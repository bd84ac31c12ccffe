//! Declarative object configuration module
//!
//! Object documents, their field and index declarations, the foreign keys
//! they imply, and the stores they are loaded from.

mod config;
mod keys;
mod source;


pub use config::*;
pub use keys::*;
pub use source::*;
