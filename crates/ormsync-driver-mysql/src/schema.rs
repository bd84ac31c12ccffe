//! MySQL schema introspection implementation

use async_trait::async_trait;
use ormsync_core::{
    ColumnInfo, Connection, ForeignKeyAction, ForeignKeyInfo, IndexInfo, Result, Row,
    SchemaIntrospection, TableInfo,
};

use crate::MySqlConnection;


/// Escape a string for a single-quoted literal
fn quote_str(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

/// `<column> = '<db>'`, or the session database when none is known
fn schema_filter(column: &str, schema: Option<&str>) -> String {
    match schema {
        Some(db) => format!("{} = {}", column, quote_str(db)),
        None => format!("{} = DATABASE()", column),
    }
}

fn text(row: &Row, idx: usize) -> Option<String> {
    row.get(idx).and_then(|v| v.to_text())
}

fn table_from_row(row: &Row, schema: Option<&str>) -> Option<TableInfo> {
    Some(TableInfo {
        schema: schema.map(|s| s.to_string()),
        name: text(row, 0)?,
        engine: text(row, 1),
    })
}

/// MariaDB reports string defaults as quoted literals and a missing default
/// as the text `NULL`; MySQL reports the bare value or SQL NULL
fn column_default(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    if raw == "NULL" {
        return None;
    }
    match raw
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        Some(inner) => Some(inner.replace("''", "'").replace("\\\\", "\\")),
        None => Some(raw),
    }
}

/// Build a column from a `COLUMNS` row:
/// name, ordinal, data type, nullable, default, char length, precision,
/// scale, full column type, extra
fn column_from_row(row: &Row) -> Option<ColumnInfo> {
    let name = text(row, 0)?;
    let column_type = text(row, 8).unwrap_or_default().to_lowercase();
    let extra = text(row, 9).unwrap_or_default().to_lowercase();

    Some(ColumnInfo {
        name,
        ordinal: row.get(1).and_then(|v| v.as_i64()).unwrap_or(0) as usize,
        data_type: text(row, 2).unwrap_or_default().to_lowercase(),
        nullable: text(row, 3).as_deref() == Some("YES"),
        default_value: column_default(text(row, 4)),
        max_length: row.get(5).and_then(|v| v.as_i64()),
        precision: row.get(6).and_then(|v| v.as_i64()).map(|i| i as i32),
        scale: row.get(7).and_then(|v| v.as_i64()).map(|i| i as i32),
        unsigned: column_type.contains("unsigned"),
        is_auto_increment: extra.contains("auto_increment"),
    })
}

/// Fold `STATISTICS` rows (index name, non unique, column, index type),
/// ordered by index and sequence, into one entry per index
fn aggregate_indexes(rows: &[Row]) -> Vec<IndexInfo> {
    let mut indexes: Vec<IndexInfo> = Vec::new();
    for row in rows {
        let (Some(name), Some(column)) = (text(row, 0), text(row, 2)) else {
            continue;
        };
        if let Some(index) = indexes.iter_mut().find(|i| i.name == name) {
            index.columns.push(column);
            continue;
        }
        let non_unique = row.get(1).and_then(|v| v.as_i64()).unwrap_or(1);
        let index_type = text(row, 3).unwrap_or_default();
        indexes.push(IndexInfo {
            is_primary: name == "PRIMARY",
            is_unique: non_unique == 0,
            is_fulltext: index_type.eq_ignore_ascii_case("FULLTEXT"),
            columns: vec![column],
            name,
        });
    }
    indexes
}

/// Build foreign keys from `KEY_COLUMN_USAGE` rows (constraint, column,
/// referenced schema, table, column). Only the first column of a composite
/// key is kept.
fn foreign_keys_from_rows(rows: &[Row]) -> Vec<ForeignKeyInfo> {
    let mut keys: Vec<ForeignKeyInfo> = Vec::new();
    for row in rows {
        let Some(name) = text(row, 0) else {
            continue;
        };
        if keys.iter().any(|k| k.name == name) {
            continue;
        }
        keys.push(ForeignKeyInfo {
            name,
            column: text(row, 1).unwrap_or_default(),
            referenced_schema: text(row, 2),
            referenced_table: text(row, 3).unwrap_or_default(),
            referenced_column: text(row, 4).unwrap_or_default(),
            on_update: ForeignKeyAction::NoAction,
            on_delete: ForeignKeyAction::NoAction,
        });
    }
    keys
}

/// Apply `REFERENTIAL_CONSTRAINTS` rows (constraint, update rule, delete rule)
fn apply_rules(keys: &mut [ForeignKeyInfo], rows: &[Row]) {
    for row in rows {
        let name = text(row, 0).unwrap_or_default();
        if let Some(key) = keys.iter_mut().find(|k| k.name == name) {
            key.on_update = ForeignKeyAction::parse(&text(row, 1).unwrap_or_default());
            key.on_delete = ForeignKeyAction::parse(&text(row, 2).unwrap_or_default());
        }
    }
}

#[async_trait]
impl SchemaIntrospection for MySqlConnection {
    #[tracing::instrument(skip(self))]
    async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<TableInfo>> {
        let schema = schema.or(self.default_database());
        let query = format!(
            "SELECT TABLE_NAME, ENGINE
             FROM information_schema.TABLES
             WHERE {} AND TABLE_TYPE = 'BASE TABLE'
             ORDER BY TABLE_NAME",
            schema_filter("TABLE_SCHEMA", schema)
        );

        let result = self.query(&query, &[]).await?;
        Ok(result
            .rows
            .iter()
            .filter_map(|row| table_from_row(row, schema))
            .collect())
    }

    #[tracing::instrument(skip(self))]
    async fn table_exists(&self, schema: Option<&str>, table: &str) -> bool {
        let query = match schema {
            Some(db) => format!(
                "SHOW TABLES FROM `{}` LIKE {}",
                db.replace('`', "``"),
                quote_str(table)
            ),
            None => format!("SHOW TABLES LIKE {}", quote_str(table)),
        };
        match self.query(&query, &[]).await {
            // LIKE treats `_` as a wildcard, so compare names exactly
            Ok(result) => result
                .rows
                .iter()
                .any(|row| text(row, 0).as_deref() == Some(table)),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "table lookup failed, treating as absent");
                false
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn get_columns(&self, schema: Option<&str>, table: &str) -> Result<Vec<ColumnInfo>> {
        let schema = schema.or(self.default_database());
        let query = format!(
            "SELECT
                COLUMN_NAME,
                ORDINAL_POSITION,
                DATA_TYPE,
                IS_NULLABLE,
                COLUMN_DEFAULT,
                CHARACTER_MAXIMUM_LENGTH,
                NUMERIC_PRECISION,
                NUMERIC_SCALE,
                COLUMN_TYPE,
                EXTRA
             FROM information_schema.COLUMNS
             WHERE {} AND TABLE_NAME = {}
             ORDER BY ORDINAL_POSITION",
            schema_filter("TABLE_SCHEMA", schema),
            quote_str(table)
        );

        let result = self.query(&query, &[]).await?;
        Ok(result.rows.iter().filter_map(column_from_row).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn get_indexes(&self, schema: Option<&str>, table: &str) -> Result<Vec<IndexInfo>> {
        let schema = schema.or(self.default_database());
        let query = format!(
            "SELECT
                INDEX_NAME,
                NON_UNIQUE,
                COLUMN_NAME,
                INDEX_TYPE
             FROM information_schema.STATISTICS
             WHERE {} AND TABLE_NAME = {}
             ORDER BY INDEX_NAME = 'PRIMARY' DESC, INDEX_NAME, SEQ_IN_INDEX",
            schema_filter("TABLE_SCHEMA", schema),
            quote_str(table)
        );

        let result = self.query(&query, &[]).await?;
        Ok(aggregate_indexes(&result.rows))
    }

    #[tracing::instrument(skip(self))]
    async fn get_foreign_keys(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> Result<Vec<ForeignKeyInfo>> {
        let schema = schema.or(self.default_database());
        let query = format!(
            "SELECT
                CONSTRAINT_NAME,
                COLUMN_NAME,
                REFERENCED_TABLE_SCHEMA,
                REFERENCED_TABLE_NAME,
                REFERENCED_COLUMN_NAME
             FROM information_schema.KEY_COLUMN_USAGE
             WHERE {}
               AND TABLE_NAME = {}
               AND REFERENCED_TABLE_NAME IS NOT NULL
             ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION",
            schema_filter("TABLE_SCHEMA", schema),
            quote_str(table)
        );

        let result = self.query(&query, &[]).await?;
        let mut keys = foreign_keys_from_rows(&result.rows);
        if keys.is_empty() {
            return Ok(keys);
        }

        let rules_query = format!(
            "SELECT CONSTRAINT_NAME, UPDATE_RULE, DELETE_RULE
             FROM information_schema.REFERENTIAL_CONSTRAINTS
             WHERE {} AND TABLE_NAME = {}",
            schema_filter("CONSTRAINT_SCHEMA", schema),
            quote_str(table)
        );
        match self.query(&rules_query, &[]).await {
            Ok(rules) => apply_rules(&mut keys, &rules.rows),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "failed to read foreign key rules")
            }
        }

        Ok(keys)
    }

    #[tracing::instrument(skip(self))]
    async fn get_engine(&self, schema: Option<&str>, table: &str) -> Result<Option<String>> {
        let schema = schema.or(self.default_database());
        let query = format!(
            "SELECT ENGINE
             FROM information_schema.TABLES
             WHERE {} AND TABLE_NAME = {}",
            schema_filter("TABLE_SCHEMA", schema),
            quote_str(table)
        );

        let result = self.query(&query, &[]).await?;
        Ok(result.rows.first().and_then(|row| text(row, 0)))
    }
}
