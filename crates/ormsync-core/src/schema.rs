//! Schema introspection traits and types

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Schema introspection interface
///
/// Every method is a read-only query against the live database. The
/// `schema` argument selects a database other than the connection default.
#[async_trait]
pub trait SchemaIntrospection: Send + Sync {
    /// List all tables in a schema
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>>;

    /// Check whether a table exists.
    ///
    /// Introspection failures are reported as "absent" so that a first-time
    /// build can proceed down the create path.
    async fn table_exists(&self, schema: Option<&str>, table: &str) -> bool {
        match self.list_tables(schema).await {
            Ok(tables) => tables.iter().any(|t| t.name == table),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "table lookup failed, treating as absent");
                false
            }
        }
    }

    /// Get columns for a table, in ordinal order
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>>;

    /// Get indexes for a table, one entry per index name
    async fn get_indexes(&self, schema: Option<&str>, table: &str) -> Result<Vec<IndexInfo>>;

    /// Get foreign keys declared on a table
    async fn get_foreign_keys(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ForeignKeyInfo>>;

    /// Get the storage engine of a table, `None` if unknown
    async fn get_engine(&self, schema: Option<&str>, table: &str) -> Result<Option<String>>;
}

/// Table information (basic)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    pub schema: Option<String>,
    pub name: String,
    pub engine: Option<String>,
}

/// Column information as reported by the live database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub ordinal: usize,
    /// Base type name in lowercase, without length or modifiers
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    /// CHARACTER_MAXIMUM_LENGTH
    pub max_length: Option<i64>,
    /// NUMERIC_PRECISION
    pub precision: Option<i32>,
    /// NUMERIC_SCALE
    pub scale: Option<i32>,
    pub unsigned: bool,
    pub is_auto_increment: bool,
}

impl ColumnInfo {
    /// Create a nullable column of the given type with no length metadata
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal: 0,
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            max_length: None,
            precision: None,
            scale: None,
            unsigned: false,
            is_auto_increment: false,
        }
    }
}

/// Index information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
    pub is_fulltext: bool,
    pub is_primary: bool,
}

/// Foreign key information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyInfo {
    pub name: String,
    pub column: String,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

/// Foreign key action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKeyAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl ForeignKeyAction {
    /// Parse the action keyword used by `information_schema`
    pub fn parse(action: &str) -> Self {
        match action.trim().to_uppercase().as_str() {
            "CASCADE" => ForeignKeyAction::Cascade,
            "SET NULL" => ForeignKeyAction::SetNull,
            "SET DEFAULT" => ForeignKeyAction::SetDefault,
            "RESTRICT" => ForeignKeyAction::Restrict,
            _ => ForeignKeyAction::NoAction,
        }
    }

    /// SQL keyword for this action
    pub fn as_sql(&self) -> &'static str {
        match self {
            ForeignKeyAction::NoAction => "NO ACTION",
            ForeignKeyAction::Restrict => "RESTRICT",
            ForeignKeyAction::Cascade => "CASCADE",
            ForeignKeyAction::SetNull => "SET NULL",
            ForeignKeyAction::SetDefault => "SET DEFAULT",
        }
    }
}

impl std::fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}
