//! Structured DDL statements
//!
//! Schema tooling describes every change as a [`SchemaStatement`] before it
//! is rendered to SQL, so a connection can either run the rendered text or
//! apply the statement directly to its own catalogue.

use crate::ForeignKeyAction;
use serde::{Deserialize, Serialize};

/// Full definition of one table column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    /// Base type name in lowercase
    pub data_type: String,
    /// Display or character length
    pub length: Option<u32>,
    /// Total digits for fixed and floating point types
    pub precision: Option<u32>,
    /// Digits after the decimal point
    pub scale: Option<u32>,
    pub unsigned: bool,
    pub nullable: bool,
    pub default: Option<String>,
    pub auto_increment: bool,
}

impl ColumnDefinition {
    /// Create a nullable column with no modifiers
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into().to_lowercase(),
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            nullable: true,
            default: None,
            auto_increment: false,
        }
    }
}

/// Column reference inside an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    /// Prefix length for text columns
    pub prefix_length: Option<u32>,
}

/// Definition of one index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
    pub fulltext: bool,
    pub primary: bool,
}

impl IndexDefinition {
    /// Column names without prefix lengths
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}

/// Definition of one foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyDefinition {
    pub name: String,
    pub column: String,
    pub referenced_schema: Option<String>,
    pub referenced_table: String,
    pub referenced_column: String,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

/// One clause of an `ALTER TABLE` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlterOperation {
    DropColumn(String),
    AddColumn(ColumnDefinition),
    /// Replace column `from` with `column`, renaming it when names differ
    ChangeColumn {
        from: String,
        column: ColumnDefinition,
    },
    DropPrimaryKey,
    DropIndex(String),
    AddIndex(IndexDefinition),
    DropForeignKey(String),
    AddForeignKey(ForeignKeyDefinition),
}

/// A schema-changing statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaStatement {
    CreateTable {
        table: String,
        columns: Vec<ColumnDefinition>,
        indexes: Vec<IndexDefinition>,
        engine: String,
    },
    AlterTable {
        /// Database qualifier, when known
        schema: Option<String>,
        table: String,
        operations: Vec<AlterOperation>,
    },
    ChangeEngine {
        table: String,
        engine: String,
    },
    RenameTable {
        from: String,
        to: String,
    },
    DropTable {
        table: String,
    },
}

impl SchemaStatement {
    /// Short statement kind for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaStatement::CreateTable { .. } => "create_table",
            SchemaStatement::AlterTable { .. } => "alter_table",
            SchemaStatement::ChangeEngine { .. } => "change_engine",
            SchemaStatement::RenameTable { .. } => "rename_table",
            SchemaStatement::DropTable { .. } => "drop_table",
        }
    }

    /// Table the statement acts on
    pub fn table(&self) -> &str {
        match self {
            SchemaStatement::CreateTable { table, .. }
            | SchemaStatement::AlterTable { table, .. }
            | SchemaStatement::ChangeEngine { table, .. }
            | SchemaStatement::DropTable { table } => table,
            SchemaStatement::RenameTable { from, .. } => from,
        }
    }
}
