//! DDL emitter implementation
//!
//! Renders structured [`SchemaStatement`]s as SQL text for a dialect.

use ormsync_core::{
    AlterOperation, ColumnDefinition, ForeignKeyDefinition, IndexColumn, IndexDefinition,
    SchemaStatement,
};

/// Renders structured DDL for one SQL dialect
pub trait DdlEmitter: Send + Sync {
    /// Dialect identifier, e.g. "mysql"
    fn dialect(&self) -> &'static str;

    /// Quote an identifier
    fn quote(&self, name: &str) -> String;

    /// Column definition fragment
    fn column_sql(&self, column: &ColumnDefinition) -> String;

    /// Index fragment, in CREATE TABLE form when `create` is set and as an
    /// ALTER TABLE clause otherwise
    fn index_sql(&self, index: &IndexDefinition, create: bool) -> String;

    /// ADD CONSTRAINT clause for a foreign key
    fn foreign_key_sql(&self, key: &ForeignKeyDefinition) -> String;

    /// Prefix length for text columns referenced by an index
    fn text_index_prefix(&self) -> u32;

    /// Full statement text
    fn render(&self, statement: &SchemaStatement) -> String;
}

/// Configuration for the MySQL emitter
#[derive(Debug, Clone)]
pub struct EmitterConfig {
    /// Default charset for created tables
    pub charset: String,
    /// Prefix length applied to text columns inside indexes
    pub text_index_prefix: u32,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            charset: "utf8".to_string(),
            text_index_prefix: 32,
        }
    }
}

impl EmitterConfig {
    /// Creates a new config with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the table charset
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    /// Sets the text column prefix length used in indexes
    pub fn with_text_index_prefix(mut self, prefix: u32) -> Self {
        self.text_index_prefix = prefix;
        self
    }
}

/// MySQL / MariaDB DDL emitter
#[derive(Debug, Clone)]
pub struct MySqlEmitter {
    config: EmitterConfig,
}

impl Default for MySqlEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl MySqlEmitter {
    /// Creates a new emitter with default configuration
    pub fn new() -> Self {
        Self {
            config: EmitterConfig::default(),
        }
    }

    /// Creates a new emitter with the given configuration
    pub fn with_config(config: EmitterConfig) -> Self {
        Self { config }
    }

    /// Returns the current configuration
    pub fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Returns the qualified name (schema.name or just name)
    fn qualified_name(&self, name: &str, schema: Option<&str>) -> String {
        match schema {
            Some(s) => format!("{}.{}", self.quote(s), self.quote(name)),
            None => self.quote(name),
        }
    }

    fn literal(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    fn index_columns(&self, columns: &[IndexColumn]) -> String {
        columns
            .iter()
            .map(|c| match c.prefix_length {
                Some(len) => format!("{}({})", self.quote(&c.name), len),
                None => self.quote(&c.name),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn alter_operation_sql(&self, operation: &AlterOperation) -> String {
        match operation {
            AlterOperation::DropColumn(name) => format!("DROP {}", self.quote(name)),
            AlterOperation::AddColumn(column) => format!("ADD {}", self.column_sql(column)),
            AlterOperation::ChangeColumn { from, column } => {
                format!("CHANGE {} {}", self.quote(from), self.column_sql(column))
            }
            AlterOperation::DropPrimaryKey => "DROP PRIMARY KEY".to_string(),
            AlterOperation::DropIndex(name) => format!("DROP INDEX {}", self.quote(name)),
            AlterOperation::AddIndex(index) => self.index_sql(index, false),
            AlterOperation::DropForeignKey(name) => {
                format!("DROP FOREIGN KEY {}", self.quote(name))
            }
            AlterOperation::AddForeignKey(key) => self.foreign_key_sql(key),
        }
    }
}

impl DdlEmitter for MySqlEmitter {
    fn dialect(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn column_sql(&self, column: &ColumnDefinition) -> String {
        let mut def = format!(
            "{} {}",
            self.quote(&column.name),
            column.data_type.to_uppercase()
        );

        if let Some(precision) = column.precision {
            def.push_str(&format!("({},{})", precision, column.scale.unwrap_or(0)));
        } else if let Some(len) = column.length {
            def.push_str(&format!("({})", len));
        }

        if column.unsigned {
            def.push_str(" UNSIGNED");
        }

        def.push_str(if column.nullable { " NULL" } else { " NOT NULL" });

        if let Some(default) = &column.default {
            def.push_str(&format!(" DEFAULT {}", self.literal(default)));
        }

        if column.auto_increment {
            def.push_str(" AUTO_INCREMENT");
        }

        def
    }

    fn index_sql(&self, index: &IndexDefinition, create: bool) -> String {
        if index.primary {
            let column = index
                .columns
                .first()
                .map(|c| self.quote(&c.name))
                .unwrap_or_default();
            return if create {
                format!("PRIMARY KEY ({})", column)
            } else {
                format!("ADD PRIMARY KEY ({})", column)
            };
        }

        let body = format!(
            "{} ({})",
            self.quote(&index.name),
            self.index_columns(&index.columns)
        );
        let kind = if index.unique {
            "UNIQUE"
        } else if index.fulltext {
            "FULLTEXT"
        } else {
            ""
        };

        match (create, kind) {
            (true, "") => format!("KEY {}", body),
            (true, kind) => format!("{} KEY {}", kind, body),
            (false, "") => format!("ADD INDEX {}", body),
            (false, kind) => format!("ADD {} {}", kind, body),
        }
    }

    fn foreign_key_sql(&self, key: &ForeignKeyDefinition) -> String {
        format!(
            "ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
            self.quote(&key.name),
            self.quote(&key.column),
            self.qualified_name(&key.referenced_table, key.referenced_schema.as_deref()),
            self.quote(&key.referenced_column),
            key.on_update.as_sql(),
            key.on_delete.as_sql()
        )
    }

    fn text_index_prefix(&self) -> u32 {
        self.config.text_index_prefix
    }

    fn render(&self, statement: &SchemaStatement) -> String {
        match statement {
            SchemaStatement::CreateTable {
                table,
                columns,
                indexes,
                engine,
            } => {
                let parts: Vec<String> = columns
                    .iter()
                    .map(|c| self.column_sql(c))
                    .chain(indexes.iter().map(|i| self.index_sql(i, true)))
                    .collect();
                format!(
                    "CREATE TABLE {} (\n  {}\n) ENGINE={} DEFAULT CHARSET={}",
                    self.quote(table),
                    parts.join(",\n  "),
                    engine,
                    self.config.charset
                )
            }
            SchemaStatement::AlterTable {
                schema,
                table,
                operations,
            } => {
                let clauses: Vec<String> = operations
                    .iter()
                    .map(|op| self.alter_operation_sql(op))
                    .collect();
                format!(
                    "ALTER TABLE {}\n  {}",
                    self.qualified_name(table, schema.as_deref()),
                    clauses.join(",\n  ")
                )
            }
            SchemaStatement::ChangeEngine { table, engine } => {
                format!("ALTER TABLE {} ENGINE = {}", self.quote(table), engine)
            }
            SchemaStatement::RenameTable { from, to } => {
                format!("RENAME TABLE {} TO {}", self.quote(from), self.quote(to))
            }
            SchemaStatement::DropTable { table } => format!("DROP TABLE {}", self.quote(table)),
        }
    }
}
