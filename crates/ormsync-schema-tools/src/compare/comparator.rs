//! Schema comparator implementation
//!
//! Compares a declared object against live table metadata and produces the
//! ordered change sets needed to converge the table. Every method is a pure
//! function of its inputs.

use std::collections::{HashMap, HashSet};

use ormsync_core::{ColumnInfo, ForeignKeyInfo, IndexInfo};

use super::diff::{
    ColumnChange, CompareFlags, EngineChange, ForeignKeyChange, IndexChange, TableDiff,
};
use crate::object::{DbType, ForeignKeySpec, IndexSpec, ObjectConfig};
use crate::property::{ExpectedLength, FieldProperty};

/// Reserved name of the primary key index
pub const PRIMARY_INDEX: &str = "PRIMARY";

/// Configuration for schema comparison
#[derive(Debug, Clone)]
pub struct CompareConfig {
    /// Whether derived foreign keys are enforced. When off, existing keys
    /// are only ever dropped.
    pub foreign_keys: bool,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self { foreign_keys: true }
    }
}

impl CompareConfig {
    /// Creates a new config with all options enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables foreign key enforcement
    pub fn without_foreign_keys(mut self) -> Self {
        self.foreign_keys = false;
        self
    }

    /// Sets foreign key enforcement
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }
}

/// Live state of one table
#[derive(Debug, Clone, Default)]
pub struct LiveTable {
    pub columns: Vec<ColumnInfo>,
    pub indexes: Vec<IndexInfo>,
    pub foreign_keys: Vec<ForeignKeyInfo>,
    pub engine: Option<String>,
}

/// Schema comparator for declared objects
#[derive(Debug)]
pub struct SchemaComparator {
    config: CompareConfig,
}

impl Default for SchemaComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaComparator {
    /// Creates a new schema comparator with default configuration
    pub fn new() -> Self {
        Self {
            config: CompareConfig::default(),
        }
    }

    /// Creates a new schema comparator with the given configuration
    pub fn with_config(config: CompareConfig) -> Self {
        Self { config }
    }

    /// Returns the current configuration
    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Compares declared fields with live columns.
    ///
    /// Virtual fields are ignored. The result holds drops (live order),
    /// then adds and changes (declaration order).
    pub fn diff_columns(&self, object: &ObjectConfig, live: &[ColumnInfo]) -> Vec<ColumnChange> {
        let mut live_sorted: Vec<&ColumnInfo> = live.iter().collect();
        live_sorted.sort_by_key(|c| c.ordinal);
        let live_by_name: HashMap<&str, &ColumnInfo> =
            live_sorted.iter().map(|c| (c.name.as_str(), *c)).collect();

        let declared: HashSet<&str> = object.stored_fields().map(|f| f.name.as_str()).collect();

        let mut drops = Vec::new();
        let mut adds = Vec::new();
        let mut changes = Vec::new();

        for column in &live_sorted {
            if !declared.contains(column.name.as_str()) {
                drops.push(ColumnChange::drop(&column.name));
            }
        }

        for field in object.stored_fields() {
            match live_by_name.get(field.name.as_str()) {
                None => adds.push(ColumnChange::add(&field.name)),
                Some(column) => {
                    let flags = self.compare_column(&FieldProperty::of(object, field), column);
                    if flags.any() {
                        tracing::debug!(
                            object = %object.name,
                            column = %field.name,
                            failed = ?flags.failed(),
                            "column differs"
                        );
                        changes.push(ColumnChange::change(&field.name, flags));
                    }
                }
            }
        }

        drops.extend(adds);
        drops.extend(changes);
        drops
    }

    /// Compares one declared field with its live column
    pub fn compare_column(&self, property: &FieldProperty<'_>, live: &ColumnInfo) -> CompareFlags {
        let field = property.field();
        let column = property.column_definition();
        let live_type = live.data_type.to_lowercase();
        let mut flags = CompareFlags::default();

        // booleans are stored as tinyint; nothing else about them is checked
        let boolean_as_tinyint = field.db_type == DbType::Boolean && live_type == "tinyint";

        if !boolean_as_tinyint {
            flags.data_type = field.db_type.as_str() != live_type;
            flags.length = match property.expected_length() {
                ExpectedLength::Digits { precision, scale } => {
                    i64::from(precision) != live.precision.map(i64::from).unwrap_or(0)
                        || i64::from(scale) != live.scale.map(i64::from).unwrap_or(0)
                }
                ExpectedLength::Numeric(len) => {
                    i64::from(len) != live.precision.map(i64::from).unwrap_or(0)
                }
                ExpectedLength::Chars(len) => i64::from(len) != live.max_length.unwrap_or(0),
                ExpectedLength::Unchecked => false,
            };
            flags.nullable = column.nullable != live.nullable;
            flags.unsigned = column.unsigned != live.unsigned;
        }

        if property.compares_default() {
            flags.default = column.default.as_deref() != live.default_value.as_deref();
        }

        flags
    }

    /// Compares declared indexes with live indexes.
    ///
    /// Live indexes backing a derived foreign key are kept. A declared
    /// index that differs structurally yields a drop followed by an add.
    pub fn diff_indexes(
        &self,
        object: &ObjectConfig,
        live: &[IndexInfo],
        keys: &[ForeignKeySpec],
    ) -> Vec<IndexChange> {
        let live_by_name: HashMap<&str, &IndexInfo> =
            live.iter().map(|i| (i.name.as_str(), i)).collect();
        let key_names: HashSet<&str> = if self.config.foreign_keys {
            keys.iter().map(|k| k.name.as_str()).collect()
        } else {
            HashSet::new()
        };
        let declared: Vec<(String, &IndexSpec)> = object
            .indexes
            .values()
            .map(|index| (Self::index_key(index), index))
            .collect();
        let declared_names: HashSet<&str> = declared.iter().map(|(k, _)| k.as_str()).collect();

        let mut changes = Vec::new();

        for index in live {
            if !declared_names.contains(index.name.as_str())
                && !key_names.contains(index.name.as_str())
            {
                changes.push(IndexChange::drop(&index.name));
            }
        }

        for (key, index) in declared {
            match live_by_name.get(key.as_str()) {
                None => changes.push(IndexChange::add(key, index.clone())),
                Some(existing) if !Self::same_index(index, existing) => {
                    tracing::debug!(object = %object.name, index = %key, "index differs");
                    changes.push(IndexChange::drop(&key));
                    changes.push(IndexChange::add(key, index.clone()));
                }
                Some(_) => {}
            }
        }

        changes
    }

    /// Compares derived foreign keys with live constraints by name.
    ///
    /// With enforcement off, every live key is dropped and none added.
    pub fn diff_foreign_keys(
        &self,
        keys: &[ForeignKeySpec],
        live: &[ForeignKeyInfo],
    ) -> Vec<ForeignKeyChange> {
        let configured: &[ForeignKeySpec] = if self.config.foreign_keys { keys } else { &[] };
        let configured_names: HashSet<&str> = configured.iter().map(|k| k.name.as_str()).collect();
        let live_names: HashSet<&str> = live.iter().map(|k| k.name.as_str()).collect();

        let mut changes: Vec<ForeignKeyChange> = Vec::new();
        let mut dropped: HashSet<&str> = HashSet::new();
        for key in live {
            if !configured_names.contains(key.name.as_str()) && dropped.insert(key.name.as_str())
            {
                changes.push(ForeignKeyChange::drop(&key.name));
            }
        }
        for key in configured {
            if !live_names.contains(key.name.as_str()) {
                changes.push(ForeignKeyChange::add(key.clone()));
            }
        }
        changes
    }

    /// Compares the declared engine with the live one, case-insensitively
    pub fn diff_engine(&self, object: &ObjectConfig, live: Option<&str>) -> Option<EngineChange> {
        let live = live?;
        if live.eq_ignore_ascii_case(&object.engine) {
            None
        } else {
            Some(EngineChange {
                from: live.to_string(),
                to: object.engine.clone(),
            })
        }
    }

    /// Full comparison of an object with its live table
    pub fn diff_table(
        &self,
        object: &ObjectConfig,
        table: &str,
        live: &LiveTable,
        keys: &[ForeignKeySpec],
    ) -> TableDiff {
        let mut diff = TableDiff::new(table);
        diff.columns = self.diff_columns(object, &live.columns);
        diff.indexes = self.diff_indexes(object, &live.indexes, keys);
        diff.foreign_keys = self.diff_foreign_keys(keys, &live.foreign_keys);
        diff.engine = self.diff_engine(object, live.engine.as_deref());
        diff
    }

    /// Live name a declared index is matched against
    pub fn index_key(index: &IndexSpec) -> String {
        if index.primary {
            PRIMARY_INDEX.to_string()
        } else {
            index.name.clone()
        }
    }

    fn same_index(declared: &IndexSpec, live: &IndexInfo) -> bool {
        let declared_columns: HashSet<&str> = declared.columns.iter().map(String::as_str).collect();
        let live_columns: HashSet<&str> = live.columns.iter().map(String::as_str).collect();

        declared_columns == live_columns
            && (declared.unique || declared.primary) == live.is_unique
            && declared.fulltext == live.is_fulltext
    }
}
