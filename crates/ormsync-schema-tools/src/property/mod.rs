//! Field property module
//!
//! Maps declared fields to column definitions and the metadata the
//! comparator checks them against.

mod field_property;


pub use field_property::*;
