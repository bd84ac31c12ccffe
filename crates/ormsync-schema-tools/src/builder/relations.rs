//! Junction tables for many-to-many relations

use indexmap::IndexMap;

use super::error::BuilderError;
use super::table_builder::Builder;
use crate::object::{DbType, FieldSpec, IndexSpec, LinkType, ObjectConfig};

/// Configuration of the junction object `name` linking `source` to `target`
pub fn junction_config(source: &ObjectConfig, name: &str, target: &str) -> ObjectConfig {
    let mut config = ObjectConfig::new(name)
        .with_table(name)
        .with_connection(source.connection.clone())
        .with_field(FieldSpec::new("id", DbType::Bigint).unsigned())
        .with_field(FieldSpec::link("source_id", LinkType::Object, source.name.clone()).required())
        .with_field(FieldSpec::link("target_id", LinkType::Object, target))
        .with_index(IndexSpec::primary("PRIMARY", "id"))
        .with_index(IndexSpec::new("source_id", &["source_id"]))
        .with_index(IndexSpec::new("target_id", &["target_id"]));

    config.use_db_prefix = true;
    config.parent_object = Some(source.name.clone());
    config.link_title = Some("id".to_string());
    config.system = true;
    config.title = Some(format!(
        "Relationship many-to-many {} & {}",
        source.name, target
    ));
    config
}

impl Builder {
    /// Many-to-many fields mapped to their junction object name
    fn relation_objects(&self) -> IndexMap<String, String> {
        self.config
            .many_to_many_fields()
            .filter_map(|field| {
                let name = self.config.relations_object(&field.name)?;
                Some((field.name.clone(), name))
            })
            .collect()
    }

    /// Many-to-many fields whose junction object does not exist yet, mapped
    /// to the junction object name
    pub fn relations_to_create(&self) -> IndexMap<String, String> {
        self.relation_objects()
            .into_iter()
            .filter(|(_, name)| !self.ctx.configs.exists(name))
            .collect()
    }

    /// Junction objects a build would create, without creating them
    pub fn plan_relations(&self) -> Vec<ObjectConfig> {
        self.relations_to_create()
            .iter()
            .filter_map(|(field, name)| {
                let target = self.config.field(field)?.linked_object()?;
                Some(junction_config(&self.config, name, target))
            })
            .collect()
    }

    fn owns(&self, junction: &ObjectConfig) -> bool {
        junction
            .parent_object
            .as_deref()
            .is_some_and(|parent| parent.eq_ignore_ascii_case(&self.config.name))
    }

    /// Whether every junction object exists, belongs to this object and has
    /// a table matching its declaration
    pub(super) async fn relations_valid(&self) -> bool {
        for name in self.relation_objects().into_values() {
            let Ok(junction) = self.ctx.configs.load(&name) else {
                return false;
            };
            if !self.owns(&junction) {
                return false;
            }
            let Ok(mut nested) = Builder::at_depth(&name, self.ctx.clone(), self.depth + 1) else {
                return false;
            };
            if !Box::pin(nested.validate()).await {
                return false;
            }
        }
        true
    }

    /// Save each missing junction object, then build every junction table.
    ///
    /// Existing junctions are built again so a failed earlier attempt is
    /// finished by the next build.
    pub(super) async fn materialize_relations(&mut self) -> Result<bool, BuilderError> {
        let relations = self.relation_objects();
        if relations.is_empty() {
            return Ok(true);
        }
        let at_limit = self.depth >= self.ctx.settings.relation_depth_limit;
        if at_limit && !self.relations_to_create().is_empty() {
            return Err(BuilderError::RelationDepthExceeded {
                object: self.config.name.clone(),
                limit: self.ctx.settings.relation_depth_limit,
            });
        }

        for (field, name) in relations {
            if self.ctx.configs.exists(&name) {
                let existing = self.ctx.configs.load(&name)?;
                if !self.owns(&existing) {
                    self.errors.push(format!(
                        "Invalid value. Object name {} should be unique",
                        name
                    ));
                    return Ok(false);
                }
                if at_limit {
                    continue;
                }
            } else {
                let Some(target) = self.config.field(&field).and_then(|f| f.linked_object())
                else {
                    continue;
                };
                let junction = junction_config(&self.config, &name, target);
                let table = self.ctx.locator.table_name(&junction);
                if self.table_exists_named(&table, false).await {
                    self.errors.push(format!(
                        "Invalid value. Table name {} should be unique",
                        table
                    ));
                    return Ok(false);
                }
                if let Err(e) = self.ctx.configs.save(&junction) {
                    self.errors.push(format!(
                        "Cannot save object config {}: {}",
                        junction.name, e
                    ));
                    return Ok(false);
                }
                tracing::info!(
                    object = %self.config.name,
                    relation = %junction.name,
                    "created relation object"
                );
            }

            let mut nested = Builder::at_depth(&name, self.ctx.clone(), self.depth + 1)?;
            if !Box::pin(nested.build(true)).await? {
                self.errors.extend(nested.errors);
                return Ok(false);
            }
        }
        Ok(true)
    }
}
