//! In-process database backend
//!
//! [`MemoryDatabase`] keeps a catalogue of tables and applies structured
//! [`SchemaStatement`]s to it. Introspection answers the way MySQL's
//! `information_schema` would for the same DDL, so builds converge against
//! it exactly as they would against a live server.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use ormsync_core::{
    AlterOperation, ColumnDefinition, ColumnInfo, Connection, DbError, ForeignKeyDefinition,
    ForeignKeyInfo, IndexColumn, IndexDefinition, IndexInfo, QueryResult, Result,
    SchemaIntrospection, SchemaStatement, StatementResult, TableInfo, Value,
};

const PRIMARY_KEY_NAME: &str = "PRIMARY";

/// One table in the catalogue
#[derive(Debug, Clone)]
pub struct MemoryTable {
    pub name: String,
    pub engine: String,
    pub columns: Vec<ColumnDefinition>,
    pub indexes: Vec<IndexDefinition>,
    pub foreign_keys: Vec<ForeignKeyDefinition>,
}

impl MemoryTable {
    fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn index_position(&self, name: &str) -> Option<usize> {
        self.indexes.iter().position(|i| i.name == name)
    }

    fn is_primary_column(&self, name: &str) -> bool {
        self.indexes
            .iter()
            .any(|i| i.primary && i.columns.iter().any(|c| c.name == name))
    }
}

/// Schema backend that lives entirely in memory.
///
/// Every statement handed to the connection is recorded and can be read
/// back with [`MemoryDatabase::executed`]. Statements whose SQL contains a
/// pattern registered with [`MemoryDatabase::fail_on`] fail without being
/// applied.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    database: Option<String>,
    tables: RwLock<IndexMap<String, MemoryTable>>,
    executed: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
    introspection_broken: AtomicBool,
}

impl MemoryDatabase {
    /// Creates an empty database named `app`
    pub fn new() -> Self {
        Self::with_database("app")
    }

    /// Creates an empty database with the given name
    pub fn with_database(name: impl Into<String>) -> Self {
        Self {
            database: Some(name.into()),
            ..Default::default()
        }
    }

    /// Fail every statement whose SQL contains `pattern`
    pub fn fail_on(&self, pattern: impl Into<String>) {
        self.failures.lock().push(pattern.into());
    }

    /// Make every metadata query fail
    pub fn break_introspection(&self) {
        self.introspection_broken.store(true, Ordering::SeqCst);
    }

    /// SQL of every statement issued so far, in order
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn clear_executed(&self) {
        self.executed.lock().clear();
    }

    /// Names of all tables, in creation order
    pub fn table_names(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    /// Snapshot of one table
    pub fn table(&self, name: &str) -> Option<MemoryTable> {
        self.tables.read().get(name).cloned()
    }

    /// Apply a statement directly, without recording it or checking
    /// failure patterns
    pub fn apply(&self, statement: &SchemaStatement) -> Result<()> {
        let mut tables = self.tables.write();
        match statement {
            SchemaStatement::CreateTable {
                table,
                columns,
                indexes,
                engine,
            } => {
                if tables.contains_key(table) {
                    return Err(DbError::Query(format!("Table '{}' already exists", table)));
                }
                let mut created = MemoryTable {
                    name: table.clone(),
                    engine: engine.clone(),
                    columns: Vec::new(),
                    indexes: Vec::new(),
                    foreign_keys: Vec::new(),
                };
                for column in columns {
                    add_column(&mut created, column.clone())?;
                }
                for index in indexes {
                    add_index(&mut created, index.clone())?;
                }
                tables.insert(table.clone(), created);
            }
            SchemaStatement::AlterTable {
                table, operations, ..
            } => {
                let existing = tables.get(table).ok_or_else(|| missing_table(table))?;
                // one statement: either every clause applies or none does
                let mut altered = existing.clone();
                for operation in operations {
                    apply_operation(&mut altered, operation, &tables)?;
                }
                // clauses resolve against the original table, so indexes left
                // without columns only disappear once every clause has run
                altered.indexes.retain(|i| !i.columns.is_empty());
                tables.insert(table.clone(), altered);
            }
            SchemaStatement::ChangeEngine { table, engine } => {
                let existing = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
                existing.engine = engine.clone();
            }
            SchemaStatement::RenameTable { from, to } => {
                if tables.contains_key(to) {
                    return Err(DbError::Query(format!("Table '{}' already exists", to)));
                }
                let mut renamed = tables.shift_remove(from).ok_or_else(|| missing_table(from))?;
                renamed.name = to.clone();
                tables.insert(to.clone(), renamed);
                for other in tables.values_mut() {
                    for key in other.foreign_keys.iter_mut() {
                        if key.referenced_table == *from {
                            key.referenced_table = to.clone();
                        }
                    }
                }
            }
            SchemaStatement::DropTable { table } => {
                tables.shift_remove(table).ok_or_else(|| missing_table(table))?;
            }
        }
        Ok(())
    }

    fn check_failure(&self, sql: &str) -> Result<()> {
        if let Some(pattern) = self.failures.lock().iter().find(|p| sql.contains(p.as_str())) {
            return Err(DbError::Query(format!(
                "statement rejected (matched '{}')",
                pattern
            )));
        }
        Ok(())
    }

    fn check_introspection(&self) -> Result<()> {
        if self.introspection_broken.load(Ordering::SeqCst) {
            return Err(DbError::Connection("metadata unavailable".to_string()));
        }
        Ok(())
    }

    fn with_table<T>(&self, table: &str, f: impl FnOnce(&MemoryTable) -> T) -> Result<T> {
        self.check_introspection()?;
        let tables = self.tables.read();
        let found = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(f(found))
    }
}

fn missing_table(table: &str) -> DbError {
    DbError::Query(format!("Table '{}' doesn't exist", table))
}

fn add_column(table: &mut MemoryTable, column: ColumnDefinition) -> Result<()> {
    if table.column_index(&column.name).is_some() {
        return Err(DbError::Query(format!(
            "Duplicate column name '{}'",
            column.name
        )));
    }
    table.columns.push(column);
    Ok(())
}

fn add_index(table: &mut MemoryTable, mut index: IndexDefinition) -> Result<()> {
    if index.primary {
        index.name = PRIMARY_KEY_NAME.to_string();
        if table.index_position(PRIMARY_KEY_NAME).is_some() {
            return Err(DbError::Query("Multiple primary key defined".to_string()));
        }
    } else if table.index_position(&index.name).is_some() {
        return Err(DbError::Query(format!("Duplicate key name '{}'", index.name)));
    }
    for column in &index.columns {
        if table.column_index(&column.name).is_none() {
            return Err(DbError::Query(format!(
                "Key column '{}' doesn't exist in table",
                column.name
            )));
        }
    }
    table.indexes.push(index);
    Ok(())
}

fn apply_operation(
    table: &mut MemoryTable,
    operation: &AlterOperation,
    catalogue: &IndexMap<String, MemoryTable>,
) -> Result<()> {
    match operation {
        AlterOperation::DropColumn(name) => {
            let position = table.column_index(name).ok_or_else(|| cannot_drop(name))?;
            table.columns.remove(position);
            for index in table.indexes.iter_mut() {
                index.columns.retain(|c| c.name != *name);
            }
            table.foreign_keys.retain(|k| k.column != *name);
        }
        AlterOperation::AddColumn(column) => add_column(table, column.clone())?,
        AlterOperation::ChangeColumn { from, column } => {
            let position = table.column_index(from).ok_or_else(|| {
                DbError::Query(format!("Unknown column '{}' in '{}'", from, table.name))
            })?;
            if column.name != *from && table.column_index(&column.name).is_some() {
                return Err(DbError::Query(format!(
                    "Duplicate column name '{}'",
                    column.name
                )));
            }
            table.columns[position] = column.clone();
            for index in table.indexes.iter_mut() {
                for indexed in index.columns.iter_mut() {
                    if indexed.name == *from {
                        indexed.name = column.name.clone();
                    }
                }
            }
            for key in table.foreign_keys.iter_mut() {
                if key.column == *from {
                    key.column = column.name.clone();
                }
            }
        }
        AlterOperation::DropPrimaryKey => {
            let position = table
                .index_position(PRIMARY_KEY_NAME)
                .ok_or_else(|| cannot_drop(PRIMARY_KEY_NAME))?;
            table.indexes.remove(position);
        }
        AlterOperation::DropIndex(name) => {
            let position = table.index_position(name).ok_or_else(|| cannot_drop(name))?;
            table.indexes.remove(position);
        }
        AlterOperation::AddIndex(index) => add_index(table, index.clone())?,
        AlterOperation::DropForeignKey(name) => {
            let position = table
                .foreign_keys
                .iter()
                .position(|k| k.name == *name)
                .ok_or_else(|| cannot_drop(name))?;
            table.foreign_keys.remove(position);
        }
        AlterOperation::AddForeignKey(key) => {
            if table.foreign_keys.iter().any(|k| k.name == key.name) {
                return Err(DbError::Query(format!(
                    "Duplicate foreign key constraint name '{}'",
                    key.name
                )));
            }
            if table.column_index(&key.column).is_none() {
                return Err(DbError::Query(format!(
                    "Key column '{}' doesn't exist in table",
                    key.column
                )));
            }
            let self_reference = key.referenced_table == table.name;
            if !self_reference && !catalogue.contains_key(&key.referenced_table) {
                return Err(DbError::Query(format!(
                    "Failed to open the referenced table '{}'",
                    key.referenced_table
                )));
            }
            // the server creates a supporting index when none leads with the column
            let indexed = table
                .indexes
                .iter()
                .any(|i| i.columns.first().is_some_and(|c| c.name == key.column));
            if !indexed {
                table.indexes.push(IndexDefinition {
                    name: key.name.clone(),
                    columns: vec![IndexColumn {
                        name: key.column.clone(),
                        prefix_length: None,
                    }],
                    unique: false,
                    fulltext: false,
                    primary: false,
                });
            }
            table.foreign_keys.push(key.clone());
        }
    }
    Ok(())
}

fn cannot_drop(name: &str) -> DbError {
    DbError::Query(format!(
        "Can't DROP '{}'; check that column/key exists",
        name
    ))
}

/// NUMERIC_PRECISION the server reports for an integer column
fn integer_precision(data_type: &str, unsigned: bool) -> Option<i32> {
    match data_type {
        "tinyint" | "boolean" | "bool" => Some(3),
        "smallint" => Some(5),
        "mediumint" => Some(7),
        "int" | "integer" => Some(10),
        "bigint" if unsigned => Some(20),
        "bigint" => Some(19),
        _ => None,
    }
}

/// NUMERIC_PRECISION of a float column declared without digits
fn default_digits(data_type: &str) -> i32 {
    match data_type {
        "float" => 12,
        "double" => 22,
        _ => 10,
    }
}

/// NUMERIC_SCALE of a float column declared without digits
fn default_scale(data_type: &str) -> Option<i32> {
    (data_type == "decimal").then_some(0)
}

/// CHARACTER_MAXIMUM_LENGTH of the fixed-size text and blob types
fn text_max_length(data_type: &str) -> Option<i64> {
    match data_type {
        "tinytext" | "tinyblob" => Some(255),
        "text" | "blob" => Some(65_535),
        "mediumtext" | "mediumblob" => Some(16_777_215),
        "longtext" | "longblob" => Some(4_294_967_295),
        _ => None,
    }
}

fn column_info(table: &MemoryTable, ordinal: usize, column: &ColumnDefinition) -> ColumnInfo {
    let data_type = match column.data_type.as_str() {
        "boolean" | "bool" => "tinyint".to_string(),
        other => other.to_string(),
    };

    let (max_length, precision, scale) = match data_type.as_str() {
        "char" | "varchar" => (Some(i64::from(column.length.unwrap_or(1))), None, None),
        "bit" => (None, Some(column.length.unwrap_or(1) as i32), None),
        "decimal" | "float" | "double" => match column.precision {
            Some(precision) => (
                None,
                Some(precision as i32),
                Some(column.scale.unwrap_or(0) as i32),
            ),
            None => (None, Some(default_digits(&data_type)), default_scale(&data_type)),
        },
        other => match integer_precision(other, column.unsigned) {
            Some(precision) => (None, Some(precision), Some(0)),
            None => (text_max_length(other), None, None),
        },
    };

    let primary = table.is_primary_column(&column.name);
    ColumnInfo {
        name: column.name.clone(),
        ordinal: ordinal + 1,
        data_type,
        nullable: column.nullable && !primary,
        default_value: column.default.clone(),
        max_length,
        precision,
        scale,
        unsigned: column.unsigned,
        is_auto_increment: column.auto_increment,
    }
}

#[async_trait]
impl Connection for MemoryDatabase {
    fn driver_name(&self) -> &str {
        "memory"
    }

    async fn execute(&self, sql: &str, _params: &[Value]) -> Result<StatementResult> {
        self.executed.lock().push(sql.to_string());
        self.check_failure(sql)?;
        Ok(StatementResult { affected_rows: 0 })
    }

    async fn query(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        self.executed.lock().push(sql.to_string());
        self.check_failure(sql)?;
        Ok(QueryResult::empty())
    }

    fn default_database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    async fn execute_ddl(&self, statement: &SchemaStatement, sql: &str) -> Result<()> {
        self.executed.lock().push(sql.to_string());
        self.check_failure(sql)?;
        self.apply(statement)?;
        tracing::debug!(kind = statement.kind(), table = %statement.table(), "applied statement");
        Ok(())
    }

    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        Some(self)
    }
}

#[async_trait]
impl SchemaIntrospection for MemoryDatabase {
    async fn list_tables(&self, _schema: Option<&str>) -> Result<Vec<TableInfo>> {
        self.check_introspection()?;
        Ok(self
            .tables
            .read()
            .values()
            .map(|t| TableInfo {
                schema: self.database.clone(),
                name: t.name.clone(),
                engine: Some(t.engine.clone()),
            })
            .collect())
    }

    async fn get_columns(&self, _schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        self.with_table(table, |t| {
            t.columns
                .iter()
                .enumerate()
                .map(|(ordinal, column)| column_info(t, ordinal, column))
                .collect()
        })
    }

    async fn get_indexes(&self, _schema: Option<&str>, table: &str) -> Result<Vec<IndexInfo>> {
        self.with_table(table, |t| {
            t.indexes
                .iter()
                .map(|index| IndexInfo {
                    name: index.name.clone(),
                    columns: index.column_names(),
                    is_unique: index.unique || index.primary,
                    is_fulltext: index.fulltext,
                    is_primary: index.primary,
                })
                .collect()
        })
    }

    async fn get_foreign_keys(
        &self,
        _schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ForeignKeyInfo>> {
        self.with_table(table, |t| {
            t.foreign_keys
                .iter()
                .map(|key| ForeignKeyInfo {
                    name: key.name.clone(),
                    column: key.column.clone(),
                    referenced_schema: key
                        .referenced_schema
                        .clone()
                        .or_else(|| self.database.clone()),
                    referenced_table: key.referenced_table.clone(),
                    referenced_column: key.referenced_column.clone(),
                    on_update: key.on_update,
                    on_delete: key.on_delete,
                })
                .collect()
        })
    }

    async fn get_engine(&self, _schema: Option<&str>, table: &str) -> Result<Option<String>> {
        self.check_introspection()?;
        Ok(self.tables.read().get(table).map(|t| t.engine.clone()))
    }
}
