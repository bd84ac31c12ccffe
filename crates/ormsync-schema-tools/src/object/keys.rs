//! Foreign keys derived from object links

use ormsync_core::{ForeignKeyAction, ForeignKeyDefinition};
use ring::digest;

use super::config::{LinkType, ObjectConfig};

/// What the builder needs to know about a link target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub object: String,
    /// Physical table name, prefix included
    pub table: String,
    pub database: Option<String>,
    pub primary_key: String,
    pub engine: String,
    pub connection: String,
    pub disable_keys: bool,
}

/// A foreign key implied by an object link. Never stored; recomputed on
/// every diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub name: String,
    pub source_field: String,
    pub target_database: Option<String>,
    pub target_table: String,
    pub target_field: String,
    pub on_update: ForeignKeyAction,
    pub on_delete: ForeignKeyAction,
}

impl ForeignKeySpec {
    pub fn new(
        source_field: impl Into<String>,
        target_database: Option<String>,
        target_table: impl Into<String>,
        target_field: impl Into<String>,
        on_update: ForeignKeyAction,
        on_delete: ForeignKeyAction,
    ) -> Self {
        let source_field = source_field.into();
        let target_table = target_table.into();
        let target_field = target_field.into();
        let name = Self::key_name(
            &source_field,
            target_database.as_deref(),
            &target_table,
            &target_field,
            on_update,
            on_delete,
        );
        Self {
            name,
            source_field,
            target_database,
            target_table,
            target_field,
            on_update,
            on_delete,
        }
    }

    /// Deterministic constraint name: hex of the first 16 bytes of the
    /// SHA-256 of the colon-joined key tuple
    pub fn key_name(
        source_field: &str,
        target_database: Option<&str>,
        target_table: &str,
        target_field: &str,
        on_update: ForeignKeyAction,
        on_delete: ForeignKeyAction,
    ) -> String {
        let tuple = [
            source_field,
            target_database.unwrap_or(""),
            target_table,
            target_field,
            on_update.as_sql(),
            on_delete.as_sql(),
        ]
        .join(":");
        let hash = digest::digest(&digest::SHA256, tuple.as_bytes());
        hex::encode(&hash.as_ref()[..16])
    }

    pub fn to_definition(&self) -> ForeignKeyDefinition {
        ForeignKeyDefinition {
            name: self.name.clone(),
            column: self.source_field.clone(),
            referenced_schema: self.target_database.clone(),
            referenced_table: self.target_table.clone(),
            referenced_column: self.target_field.clone(),
            on_update: self.on_update,
            on_delete: self.on_delete,
        }
    }
}

/// Derive the foreign keys of `config`.
///
/// Only single-object links qualify, and only when both sides use a
/// transactional engine, share a connection and have keys enabled. Targets
/// `resolve` cannot find are skipped.
pub fn derive_foreign_keys(
    config: &ObjectConfig,
    resolve: impl Fn(&str) -> Option<LinkTarget>,
) -> Vec<ForeignKeySpec> {
    if config.disable_keys || !config.is_transactional() {
        return Vec::new();
    }

    let mut keys = Vec::new();
    for (object, fields) in config.links() {
        let Some(target) = resolve(&object) else {
            tracing::debug!(object = %config.name, target = %object, "link target not resolved");
            continue;
        };
        if target.disable_keys
            || !target.engine.eq_ignore_ascii_case(super::config::DEFAULT_ENGINE)
            || target.connection != config.connection
        {
            continue;
        }
        for (field_name, link_type) in fields {
            if link_type != LinkType::Object {
                continue;
            }
            let Some(field) = config.field(field_name) else {
                continue;
            };
            let on_delete = if field.is_nullable() {
                ForeignKeyAction::SetNull
            } else {
                ForeignKeyAction::Restrict
            };
            keys.push(ForeignKeySpec::new(
                field_name,
                target.database.clone(),
                target.table.clone(),
                target.primary_key.clone(),
                ForeignKeyAction::Cascade,
                on_delete,
            ));
        }
    }
    keys
}
