//! Schema comparison module
//!
//! Diffs declared objects against live table metadata.

mod comparator;
mod diff;


pub use comparator::*;
pub use diff::*;
