//! Connection trait

use crate::{QueryResult, Result, SchemaIntrospection, SchemaStatement, StatementResult, Value};
use async_trait::async_trait;

/// A database connection
///
/// The connection is borrowed from whoever created it; schema tooling never
/// closes it. Statements run one at a time and autocommit.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mysql", "memory")
    fn driver_name(&self) -> &str;

    /// Execute a statement that does not return rows
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a query that returns rows
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Name of the database this connection works in, when known
    fn default_database(&self) -> Option<&str> {
        None
    }

    /// Execute a DDL statement.
    ///
    /// `sql` is the rendered form of `statement`. Drivers backed by a real
    /// server just run the text; backends that keep their own catalogue can
    /// apply the structured form instead.
    async fn execute_ddl(&self, statement: &SchemaStatement, sql: &str) -> Result<()> {
        tracing::debug!(kind = statement.kind(), "executing ddl");
        self.execute(sql, &[]).await?;
        Ok(())
    }

    /// Quote an identifier (table, column or index name)
    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    /// Quote a literal value
    fn quote(&self, value: &str) -> String {
        format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
    }

    /// Get schema introspection interface if supported
    fn as_schema_introspection(&self) -> Option<&dyn SchemaIntrospection> {
        None
    }
}
