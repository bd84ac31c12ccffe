//! Schema diff data structures
//!
//! Change sets are ephemeral: they are recomputed from the declared
//! configuration and the live schema on every call.

use serde::{Deserialize, Serialize};

use crate::object::{ForeignKeySpec, IndexSpec};

/// What a change does to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Add,
    Change,
    Drop,
}

/// Which column comparisons failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompareFlags {
    pub data_type: bool,
    pub length: bool,
    pub nullable: bool,
    pub default: bool,
    pub unsigned: bool,
    /// Auto-increment is reported but never compared
    pub increment: bool,
}

impl CompareFlags {
    /// Returns true if any comparison failed
    pub fn any(&self) -> bool {
        self.data_type
            || self.length
            || self.nullable
            || self.default
            || self.unsigned
            || self.increment
    }

    /// Names of the failed comparisons
    pub fn failed(&self) -> Vec<&'static str> {
        [
            (self.data_type, "type"),
            (self.length, "length"),
            (self.nullable, "null"),
            (self.default, "default"),
            (self.unsigned, "unsigned"),
            (self.increment, "increment"),
        ]
        .into_iter()
        .filter_map(|(failed, name)| failed.then_some(name))
        .collect()
    }
}

/// A column to add, change or drop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnChange {
    pub name: String,
    pub action: ChangeAction,
    /// Set for `Change`
    pub flags: Option<CompareFlags>,
}

impl ColumnChange {
    pub fn add(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: ChangeAction::Add,
            flags: None,
        }
    }

    pub fn change(name: impl Into<String>, flags: CompareFlags) -> Self {
        Self {
            name: name.into(),
            action: ChangeAction::Change,
            flags: Some(flags),
        }
    }

    pub fn drop(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: ChangeAction::Drop,
            flags: None,
        }
    }
}

/// An index to add or drop. Structural differences become a drop followed
/// by an add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexChange {
    /// Declared name, or `PRIMARY` for the primary key
    pub name: String,
    pub action: ChangeAction,
    /// Declared index, set for `Add`
    pub index: Option<IndexSpec>,
}

impl IndexChange {
    pub fn add(name: impl Into<String>, index: IndexSpec) -> Self {
        Self {
            name: name.into(),
            action: ChangeAction::Add,
            index: Some(index),
        }
    }

    pub fn drop(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: ChangeAction::Drop,
            index: None,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.name == super::PRIMARY_INDEX
    }
}

/// A foreign key to add or drop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyChange {
    pub name: String,
    pub action: ChangeAction,
    /// Derived key, set for `Add`
    pub key: Option<ForeignKeySpec>,
}

impl ForeignKeyChange {
    pub fn add(key: ForeignKeySpec) -> Self {
        Self {
            name: key.name.clone(),
            action: ChangeAction::Add,
            key: Some(key),
        }
    }

    pub fn drop(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            action: ChangeAction::Drop,
            key: None,
        }
    }
}

/// Storage engine mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineChange {
    pub from: String,
    pub to: String,
}

/// All differences between one object and its live table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDiff {
    pub table: String,
    pub columns: Vec<ColumnChange>,
    pub indexes: Vec<IndexChange>,
    pub foreign_keys: Vec<ForeignKeyChange>,
    pub engine: Option<EngineChange>,
}

impl TableDiff {
    /// Creates a new empty table diff
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Returns true if there are no differences
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
            && self.indexes.is_empty()
            && self.foreign_keys.is_empty()
            && self.engine.is_none()
    }

    /// Returns the total number of changes
    pub fn change_count(&self) -> usize {
        self.columns.len()
            + self.indexes.len()
            + self.foreign_keys.len()
            + usize::from(self.engine.is_some())
    }

    /// Returns true if there are column or index changes
    pub fn has_structural_changes(&self) -> bool {
        !self.columns.is_empty() || !self.indexes.is_empty()
    }
}
