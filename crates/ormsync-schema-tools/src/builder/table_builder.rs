//! Table builder
//!
//! Converges the live table of one object towards its declared
//! configuration. Schema-level failures never abort with an error: they are
//! collected in [`Builder::errors`] and the operation reports `false`.
//! Statements that already ran are not rolled back; running the build again
//! finishes the remainder.

use std::sync::Arc;

use chrono::Local;
use indexmap::IndexMap;

use ormsync_core::{
    AlterOperation, ColumnDefinition, Connection, IndexColumn, IndexDefinition,
    SchemaIntrospection, SchemaStatement,
};

use super::config::BuilderConfig;
use super::error::BuilderError;
use super::locator::TableLocator;
use super::log::{FileLogSink, SqlLogSink, format_entry};
use crate::compare::{ChangeAction, LiveTable, SchemaComparator, TableDiff};
use crate::migration::{DdlEmitter, MySqlEmitter};
use crate::object::{
    ForeignKeySpec, IndexSpec, LinkTarget, ObjectConfig, ObjectConfigSource, derive_foreign_keys,
};
use crate::property::FieldProperty;

/// Collaborators shared by a builder and the relation builders it spawns
#[derive(Clone)]
pub struct BuildContext {
    pub configs: Arc<dyn ObjectConfigSource>,
    pub locator: Arc<dyn TableLocator>,
    pub emitter: Arc<dyn DdlEmitter>,
    pub settings: BuilderConfig,
    pub log_sink: Arc<dyn SqlLogSink>,
}

impl BuildContext {
    /// Context with the MySQL emitter, default settings and file logging
    pub fn new(configs: Arc<dyn ObjectConfigSource>, locator: Arc<dyn TableLocator>) -> Self {
        Self {
            configs,
            locator,
            emitter: Arc::new(MySqlEmitter::new()),
            settings: BuilderConfig::default(),
            log_sink: Arc::new(FileLogSink),
        }
    }

    pub fn with_emitter(mut self, emitter: Arc<dyn DdlEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn with_settings(mut self, settings: BuilderConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_log_sink(mut self, log_sink: Arc<dyn SqlLogSink>) -> Self {
        self.log_sink = log_sink;
        self
    }
}

/// Builds and alters the table of one object
pub struct Builder {
    pub(super) config: ObjectConfig,
    pub(super) ctx: BuildContext,
    pub(super) connection: Arc<dyn Connection>,
    pub(super) table: String,
    pub(super) depth: usize,
    pub(super) errors: Vec<String>,
}

impl Builder {
    /// Load the configuration of `object_name` and resolve its connection
    pub fn new(object_name: &str, ctx: BuildContext) -> Result<Self, BuilderError> {
        Self::at_depth(object_name, ctx, 0)
    }

    pub(super) fn at_depth(
        object_name: &str,
        ctx: BuildContext,
        depth: usize,
    ) -> Result<Self, BuilderError> {
        let config = ctx.configs.load(object_name)?;
        let connection = ctx
            .locator
            .connection(&config)
            .ok_or_else(|| BuilderError::UnknownConnection(config.connection.clone()))?;
        if connection.as_schema_introspection().is_none() {
            return Err(BuilderError::IntrospectionUnsupported(
                config.connection.clone(),
            ));
        }
        let table = ctx.locator.table_name(&config);

        tracing::debug!(object = %config.name, table = %table, depth, "builder created");
        Ok(Self {
            config,
            ctx,
            connection,
            table,
            depth,
            errors: Vec::new(),
        })
    }

    pub fn config(&self) -> &ObjectConfig {
        &self.config
    }

    /// Physical table name, prefix included
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Messages collected by the last operations
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn schema(&self) -> Option<&dyn SchemaIntrospection> {
        self.connection.as_schema_introspection()
    }

    fn comparator(&self) -> SchemaComparator {
        SchemaComparator::with_config(self.ctx.settings.compare_config())
    }

    fn lock_error(&mut self, action: &str) {
        self.errors
            .push(format!("Can not {} locked object {}", action, self.config.name));
    }

    /// Check whether the object's table exists
    pub async fn table_exists(&self) -> bool {
        self.table_exists_named(&self.table, false).await
    }

    /// Check whether `name` exists, optionally after adding the table prefix
    pub async fn table_exists_named(&self, name: &str, add_prefix: bool) -> bool {
        let name = if add_prefix {
            format!("{}{}", self.ctx.locator.prefix(), name)
        } else {
            name.to_string()
        };
        match self.schema() {
            Some(schema) => schema.table_exists(None, &name).await,
            None => false,
        }
    }

    /// Foreign keys implied by the object's links
    pub fn foreign_keys(&self) -> Vec<ForeignKeySpec> {
        derive_foreign_keys(&self.config, |object| self.link_target(object))
    }

    fn link_target(&self, object: &str) -> Option<LinkTarget> {
        let target = if object.eq_ignore_ascii_case(&self.config.name) {
            self.config.clone()
        } else {
            self.ctx.configs.load(object).ok()?
        };
        let database = self
            .ctx
            .locator
            .connection(&target)
            .and_then(|c| c.default_database().map(str::to_string));
        Some(LinkTarget {
            object: target.name.clone(),
            table: self.ctx.locator.table_name(&target),
            database,
            primary_key: target.primary_key.clone(),
            engine: target.engine.clone(),
            connection: target.connection.clone(),
            disable_keys: target.disable_keys,
        })
    }

    async fn live_table(&self) -> ormsync_core::Result<LiveTable> {
        let schema = self.schema().ok_or_else(|| {
            ormsync_core::DbError::NotSupported("schema introspection".to_string())
        })?;
        Ok(LiveTable {
            columns: schema.get_columns(None, &self.table).await?,
            indexes: schema.get_indexes(None, &self.table).await?,
            foreign_keys: schema.get_foreign_keys(None, &self.table).await?,
            engine: schema.get_engine(None, &self.table).await?,
        })
    }

    /// Differences between the declared object and its live table
    pub async fn diff(&self) -> ormsync_core::Result<TableDiff> {
        let live = self.live_table().await?;
        Ok(self
            .comparator()
            .diff_table(&self.config, &self.table, &live, &self.foreign_keys()))
    }

    fn introspection_error(&mut self, error: &ormsync_core::DbError) {
        self.errors.push(format!(
            "Cannot introspect table {}: {}",
            self.table,
            error.message()
        ));
    }

    /// Read-only check that the table matches its declaration.
    ///
    /// Foreign keys are only checked when they are enabled.
    pub async fn validate(&mut self) -> bool {
        if !self.table_exists().await {
            return false;
        }
        if !self.relations_valid().await {
            return false;
        }
        match self.diff().await {
            Ok(diff) => {
                diff.columns.is_empty()
                    && diff.indexes.is_empty()
                    && diff.engine.is_none()
                    && (!self.ctx.settings.foreign_keys || diff.foreign_keys.is_empty())
            }
            Err(e) => {
                self.introspection_error(&e);
                false
            }
        }
    }

    /// Create or alter the table, then reconcile foreign keys and relation
    /// tables. Returns `Ok(false)` when anything was recorded in
    /// [`Builder::errors`].
    pub async fn build(&mut self, build_keys: bool) -> Result<bool, BuilderError> {
        self.errors.clear();
        if self.config.is_locked() {
            self.lock_error("build");
            return Ok(false);
        }

        if !self.table_exists().await {
            if !self.create_table().await {
                return Ok(false);
            }
            if build_keys && !self.build_foreign_keys(false, true).await? {
                return Ok(false);
            }
        } else if !self.alter_table(build_keys).await? {
            return Ok(false);
        }

        if !self.materialize_relations().await? {
            return Ok(false);
        }

        if self.errors.is_empty() {
            tracing::info!(object = %self.config.name, table = %self.table, "object built");
        }
        Ok(self.errors.is_empty())
    }

    async fn create_table(&mut self) -> bool {
        let columns: Vec<ColumnDefinition> = self
            .config
            .stored_fields()
            .map(|field| FieldProperty::of(&self.config, field).column_definition())
            .collect();
        if columns.is_empty() {
            self.errors
                .push(format!("Object {} has no stored fields", self.config.name));
            return false;
        }
        let indexes = self
            .config
            .indexes
            .values()
            .map(|index| self.index_definition(index))
            .collect();

        let statement = SchemaStatement::CreateTable {
            table: self.table.clone(),
            columns,
            indexes,
            engine: self.config.engine.clone(),
        };
        self.run(statement).await
    }

    async fn alter_table(&mut self, build_keys: bool) -> Result<bool, BuilderError> {
        let diff = match self.diff().await {
            Ok(diff) => diff,
            Err(e) => {
                self.introspection_error(&e);
                return Ok(false);
            }
        };

        // keys go first so column and index changes cannot violate them
        if build_keys && !self.build_foreign_keys(true, false).await? {
            return Ok(false);
        }

        if let Some(engine) = &diff.engine {
            tracing::debug!(from = %engine.from, to = %engine.to, "changing engine");
            let statement = SchemaStatement::ChangeEngine {
                table: self.table.clone(),
                engine: engine.to.clone(),
            };
            // an engine failure is recorded but does not stop the alter
            self.run(statement).await;
        }

        let operations = self.alter_operations(&diff);
        if !operations.is_empty() {
            let statement = SchemaStatement::AlterTable {
                schema: self.connection.default_database().map(str::to_string),
                table: self.table.clone(),
                operations,
            };
            if !self.run(statement).await {
                return Ok(false);
            }
        }

        if build_keys {
            return self.build_foreign_keys(false, true).await;
        }
        Ok(true)
    }

    /// Column clauses then index clauses, in diff order
    fn alter_operations(&self, diff: &TableDiff) -> Vec<AlterOperation> {
        let mut operations = Vec::new();

        for change in &diff.columns {
            let column = || {
                self.config
                    .field(&change.name)
                    .map(|field| FieldProperty::of(&self.config, field).column_definition())
            };
            match change.action {
                ChangeAction::Drop => {
                    operations.push(AlterOperation::DropColumn(change.name.clone()));
                }
                ChangeAction::Add => {
                    if let Some(column) = column() {
                        operations.push(AlterOperation::AddColumn(column));
                    }
                }
                ChangeAction::Change => {
                    if let Some(column) = column() {
                        operations.push(AlterOperation::ChangeColumn {
                            from: change.name.clone(),
                            column,
                        });
                    }
                }
            }
        }

        for change in &diff.indexes {
            match (change.action, &change.index) {
                (ChangeAction::Drop, _) if change.is_primary() => {
                    operations.push(AlterOperation::DropPrimaryKey);
                }
                (ChangeAction::Drop, _) => {
                    operations.push(AlterOperation::DropIndex(change.name.clone()));
                }
                (ChangeAction::Add, Some(index)) => {
                    operations.push(AlterOperation::AddIndex(self.index_definition(index)));
                }
                _ => {}
            }
        }

        operations
    }

    fn index_definition(&self, index: &IndexSpec) -> IndexDefinition {
        let prefix = self.ctx.emitter.text_index_prefix();
        let columns = index
            .columns
            .iter()
            .map(|name| IndexColumn {
                name: name.clone(),
                prefix_length: self
                    .config
                    .field(name)
                    .filter(|field| field.is_text() && !index.primary && !index.fulltext)
                    .map(|_| prefix),
            })
            .collect();
        IndexDefinition {
            name: SchemaComparator::index_key(index),
            columns,
            unique: index.unique,
            fulltext: index.fulltext,
            primary: index.primary,
        }
    }

    /// Drop stale foreign keys and create missing ones in one statement
    pub async fn build_foreign_keys(
        &mut self,
        remove: bool,
        create: bool,
    ) -> Result<bool, BuilderError> {
        if self.config.is_locked() {
            self.lock_error("build");
            return Ok(false);
        }

        let live = match self.schema() {
            Some(schema) => schema.get_foreign_keys(None, &self.table).await,
            None => Ok(Vec::new()),
        };
        let live = match live {
            Ok(live) => live,
            Err(e) => {
                self.introspection_error(&e);
                return Ok(false);
            }
        };

        let keys = self.foreign_keys();
        let operations: Vec<AlterOperation> = self
            .comparator()
            .diff_foreign_keys(&keys, &live)
            .into_iter()
            .filter_map(|change| match change.action {
                ChangeAction::Drop if remove => Some(AlterOperation::DropForeignKey(change.name)),
                ChangeAction::Add if create => change
                    .key
                    .map(|key| AlterOperation::AddForeignKey(key.to_definition())),
                _ => None,
            })
            .collect();

        if operations.is_empty() {
            return Ok(true);
        }
        let statement = SchemaStatement::AlterTable {
            schema: self.connection.default_database().map(str::to_string),
            table: self.table.clone(),
            operations,
        };
        Ok(self.run(statement).await)
    }

    /// Rename the table. `new_table` excludes the prefix.
    pub async fn rename_table(&mut self, new_table: &str) -> Result<bool, BuilderError> {
        if self.config.is_locked() {
            self.lock_error("build");
            return Ok(false);
        }

        let mut renamed = self.config.clone();
        renamed.table = new_table.to_string();
        let to = self.ctx.locator.table_name(&renamed);

        let statement = SchemaStatement::RenameTable {
            from: self.table.clone(),
            to: to.clone(),
        };
        if !self.run(statement).await {
            return Ok(false);
        }

        self.config = renamed;
        self.table = to;
        self.ctx.locator.refresh_table(&self.config.name, &self.table);
        Ok(true)
    }

    /// Rename a column to `new_name`, applying the declared definition of
    /// `new_name` in the same statement
    pub async fn rename_field(
        &mut self,
        old_name: &str,
        new_name: &str,
    ) -> Result<bool, BuilderError> {
        if self.config.is_locked() {
            self.lock_error("build");
            return Ok(false);
        }

        let Some(field) = self.config.field(new_name) else {
            self.errors.push(format!(
                "Undefined field {} in object {}",
                new_name, self.config.name
            ));
            return Ok(false);
        };
        let column = FieldProperty::of(&self.config, field).column_definition();

        let statement = SchemaStatement::AlterTable {
            schema: self.connection.default_database().map(str::to_string),
            table: self.table.clone(),
            operations: vec![AlterOperation::ChangeColumn {
                from: old_name.to_string(),
                column,
            }],
        };
        Ok(self.run(statement).await)
    }

    /// Drop the table. Succeeds without doing anything if it is absent.
    pub async fn remove(&mut self) -> Result<bool, BuilderError> {
        if self.config.is_locked() {
            self.errors.push(format!(
                "Can not remove locked object table {}",
                self.config.name
            ));
            return Ok(false);
        }

        if !self.table_exists().await {
            return Ok(true);
        }
        let statement = SchemaStatement::DropTable {
            table: self.table.clone(),
        };
        Ok(self.run(statement).await)
    }

    /// Link fields whose target object has no configuration, mapped to the
    /// missing object name
    pub fn has_broken_links(&self) -> Option<IndexMap<String, String>> {
        let mut broken = IndexMap::new();
        for (object, fields) in self.config.links() {
            if self.ctx.configs.exists(&object) {
                continue;
            }
            for (field, _) in fields {
                broken.insert(field.to_string(), object.clone());
            }
        }
        (!broken.is_empty()).then_some(broken)
    }

    /// Render and execute one statement, recording failures
    pub(super) async fn run(&mut self, statement: SchemaStatement) -> bool {
        let sql = self.ctx.emitter.render(&statement);
        match self.connection.execute_ddl(&statement, &sql).await {
            Ok(()) => {
                tracing::info!(
                    object = %self.config.name,
                    kind = statement.kind(),
                    table = %statement.table(),
                    "executed ddl"
                );
                self.log_sql(&sql);
                true
            }
            Err(e) => {
                tracing::warn!(object = %self.config.name, error = %e, "ddl failed");
                self.errors.push(format!("{} SQL: {}", e.message(), sql));
                false
            }
        }
    }

    fn log_sql(&mut self, sql: &str) {
        let log = &self.ctx.settings.sql_log;
        if !log.enabled {
            return;
        }
        let path = log.log_path(&self.config.connection);
        let entry = format_entry(sql, Local::now());
        if let Err(e) = self.ctx.log_sink.append(&path, &entry) {
            tracing::warn!(path = %path.display(), error = %e, "sql log write failed");
            self.errors
                .push(format!("Cant write to log file {}", path.display()));
        }
    }
}
