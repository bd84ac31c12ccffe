//! Declarative object configuration
//!
//! An [`ObjectConfig`] is the desired state of one table: its fields,
//! indexes, engine and flags. Documents are JSON and use the same keys the
//! object designer writes (`db_type`, `db_isNull`, `link_config`, ...).

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::source::ConfigError;

/// Engine used when a document does not name one
pub const DEFAULT_ENGINE: &str = "InnoDB";

/// Column storage type of a declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbType {
    Tinyint,
    Smallint,
    Mediumint,
    Int,
    Bigint,
    Bit,
    Float,
    Double,
    Decimal,
    Char,
    Varchar,
    Tinytext,
    Text,
    Mediumtext,
    Longtext,
    Date,
    Datetime,
    Time,
    Timestamp,
    Tinyblob,
    Blob,
    Mediumblob,
    Longblob,
    /// Stored as an unsigned one-byte integer
    Boolean,
}

/// Comparison family of a [`DbType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    Integer,
    Float,
    Char,
    Text,
    Date,
    Blob,
    Boolean,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Tinyint => "tinyint",
            DbType::Smallint => "smallint",
            DbType::Mediumint => "mediumint",
            DbType::Int => "int",
            DbType::Bigint => "bigint",
            DbType::Bit => "bit",
            DbType::Float => "float",
            DbType::Double => "double",
            DbType::Decimal => "decimal",
            DbType::Char => "char",
            DbType::Varchar => "varchar",
            DbType::Tinytext => "tinytext",
            DbType::Text => "text",
            DbType::Mediumtext => "mediumtext",
            DbType::Longtext => "longtext",
            DbType::Date => "date",
            DbType::Datetime => "datetime",
            DbType::Time => "time",
            DbType::Timestamp => "timestamp",
            DbType::Tinyblob => "tinyblob",
            DbType::Blob => "blob",
            DbType::Mediumblob => "mediumblob",
            DbType::Longblob => "longblob",
            DbType::Boolean => "boolean",
        }
    }

    pub fn class(&self) -> TypeClass {
        match self {
            DbType::Tinyint
            | DbType::Smallint
            | DbType::Mediumint
            | DbType::Int
            | DbType::Bigint
            | DbType::Bit => TypeClass::Integer,
            DbType::Float | DbType::Double | DbType::Decimal => TypeClass::Float,
            DbType::Char | DbType::Varchar => TypeClass::Char,
            DbType::Tinytext | DbType::Text | DbType::Mediumtext | DbType::Longtext => {
                TypeClass::Text
            }
            DbType::Date | DbType::Datetime | DbType::Time | DbType::Timestamp => TypeClass::Date,
            DbType::Tinyblob | DbType::Blob | DbType::Mediumblob | DbType::Longblob => {
                TypeClass::Blob
            }
            DbType::Boolean => TypeClass::Boolean,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.class(), TypeClass::Integer | TypeClass::Float)
    }

    /// Text and blob columns never carry a default and derive nullability
    /// from `required`
    pub fn is_text_like(&self) -> bool {
        matches!(self.class(), TypeClass::Text | TypeClass::Blob)
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DbType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let db_type = match s.trim().to_lowercase().as_str() {
            "tinyint" => DbType::Tinyint,
            "smallint" => DbType::Smallint,
            "mediumint" => DbType::Mediumint,
            "int" | "integer" => DbType::Int,
            "bigint" => DbType::Bigint,
            "bit" => DbType::Bit,
            "float" => DbType::Float,
            "double" => DbType::Double,
            "decimal" => DbType::Decimal,
            "char" => DbType::Char,
            "varchar" => DbType::Varchar,
            "tinytext" => DbType::Tinytext,
            "text" => DbType::Text,
            "mediumtext" => DbType::Mediumtext,
            "longtext" => DbType::Longtext,
            "date" => DbType::Date,
            "datetime" => DbType::Datetime,
            "time" => DbType::Time,
            "timestamp" => DbType::Timestamp,
            "tinyblob" => DbType::Tinyblob,
            "blob" => DbType::Blob,
            "mediumblob" => DbType::Mediumblob,
            "longblob" => DbType::Longblob,
            "boolean" | "bool" => DbType::Boolean,
            other => return Err(format!("unknown db_type '{}'", other)),
        };
        Ok(db_type)
    }
}

impl Serialize for DbType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DbType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of link a field declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Single reference to another object
    Object,
    /// Several references to another object
    Multi,
    /// Reference to a dictionary entry
    Dictionary,
}

/// How a multi link is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationsType {
    Polymorphic,
    ManyToMany,
}

/// Link target of a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    pub link_type: LinkType,
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations_type: Option<RelationsType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations_object: Option<String>,
}

/// One declared field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(skip)]
    pub name: String,
    /// `"link"` for link fields
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub db_type: DbType,
    #[serde(rename = "db_len", default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Total digits of a float type
    #[serde(rename = "db_scale", default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    /// Digits after the decimal point of a float type
    #[serde(rename = "db_precision", default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(rename = "db_isNull", default)]
    pub nullable: bool,
    #[serde(
        rename = "db_default",
        default,
        deserialize_with = "deserialize_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub default: Option<String>,
    #[serde(rename = "db_unsigned", default)]
    pub unsigned: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_config: Option<LinkConfig>,
}

/// `db_default` accepts strings, numbers and booleans. `false` and `null`
/// mean "no default", `true` is stored as `1`.
fn deserialize_default<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => None,
        Some(serde_json::Value::Bool(true)) => Some("1".to_string()),
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "unsupported db_default value: {}",
                other
            )));
        }
    })
}

impl FieldSpec {
    /// Create a NOT NULL field of the given type
    pub fn new(name: impl Into<String>, db_type: DbType) -> Self {
        Self {
            name: name.into(),
            kind: None,
            db_type,
            length: None,
            scale: None,
            precision: None,
            nullable: false,
            default: None,
            unsigned: false,
            required: false,
            is_virtual: false,
            link_config: None,
        }
    }

    /// Create a link field pointing at `object`
    pub fn link(name: impl Into<String>, link_type: LinkType, object: impl Into<String>) -> Self {
        let db_type = match link_type {
            LinkType::Object => DbType::Bigint,
            LinkType::Multi => DbType::Longtext,
            LinkType::Dictionary => DbType::Varchar,
        };
        let mut field = Self::new(name, db_type);
        field.kind = Some("link".to_string());
        field.unsigned = link_type == LinkType::Object;
        field.link_config = Some(LinkConfig {
            link_type,
            object: object.into(),
            relations_type: None,
            relations_object: None,
        });
        field
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Set float digits: `scale` total digits, `precision` after the point
    pub fn with_scale_precision(mut self, scale: u32, precision: u32) -> Self {
        self.scale = Some(scale);
        self.precision = Some(precision);
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn virtual_field(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    /// Mark a multi link as backed by a junction object
    pub fn many_to_many(mut self, relations_object: Option<&str>) -> Self {
        if let Some(link) = self.link_config.as_mut() {
            link.relations_type = Some(RelationsType::ManyToMany);
            link.relations_object = relations_object.map(str::to_string);
        }
        self
    }

    pub fn is_link(&self) -> bool {
        self.link_config.is_some()
    }

    pub fn link_type(&self) -> Option<LinkType> {
        self.link_config.as_ref().map(|l| l.link_type)
    }

    pub fn linked_object(&self) -> Option<&str> {
        self.link_config.as_ref().map(|l| l.object.as_str())
    }

    /// Multi links have no column of their own
    pub fn is_virtual(&self) -> bool {
        self.is_virtual || self.link_type() == Some(LinkType::Multi)
    }

    pub fn is_many_to_many(&self) -> bool {
        self.link_config.as_ref().is_some_and(|l| {
            l.link_type == LinkType::Multi && l.relations_type == Some(RelationsType::ManyToMany)
        })
    }

    pub fn is_text(&self) -> bool {
        self.db_type.class() == TypeClass::Text
    }

    /// Effective nullability, with the text/blob rule applied
    pub fn is_nullable(&self) -> bool {
        if self.db_type.is_text_like() {
            !self.required
        } else {
            self.nullable
        }
    }

    /// Effective default, `None` for text and blob fields
    pub fn effective_default(&self) -> Option<&str> {
        if self.db_type.is_text_like() {
            None
        } else {
            self.default.as_deref()
        }
    }
}

/// One declared index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    #[serde(skip)]
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub fulltext: bool,
    #[serde(default)]
    pub primary: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            fulltext: false,
            primary: false,
        }
    }

    pub fn primary(name: impl Into<String>, column: &str) -> Self {
        let mut index = Self::new(name, &[column]);
        index.primary = true;
        index.unique = true;
        index
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn fulltext(mut self) -> Self {
        self.fulltext = true;
        self
    }
}

fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

fn default_connection() -> String {
    "default".to_string()
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Declarative schema of one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectConfig {
    #[serde(default)]
    pub name: String,
    /// Table name without prefix
    pub table: String,
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_connection")]
    pub connection: String,
    #[serde(default)]
    pub use_db_prefix: bool,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub disable_keys: bool,
    #[serde(default)]
    pub rev_control: bool,
    #[serde(default)]
    pub save_history: bool,
    #[serde(default)]
    pub system: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_object: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSpec>,
    #[serde(default)]
    pub indexes: IndexMap<String, IndexSpec>,
}

impl ObjectConfig {
    /// Create an empty InnoDB object whose table is named after it
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.to_lowercase(),
            name,
            engine: default_engine(),
            connection: default_connection(),
            use_db_prefix: false,
            primary_key: default_primary_key(),
            locked: false,
            readonly: false,
            disable_keys: false,
            rev_control: false,
            save_history: false,
            system: false,
            parent_object: None,
            link_title: None,
            title: None,
            fields: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    /// Parse a JSON document, naming the object `name`
    pub fn from_json(name: &str, json: &str) -> Result<Self, ConfigError> {
        let mut config: ObjectConfig =
            serde_json::from_str(json).map_err(|source| ConfigError::Document {
                name: name.to_string(),
                source,
            })?;
        config.name = name.to_string();
        config.normalize();
        config.check()?;
        Ok(config)
    }

    /// Serialize to a pretty JSON document
    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|source| ConfigError::Document {
            name: self.name.clone(),
            source,
        })
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn with_field(mut self, field: FieldSpec) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    pub fn with_index(mut self, index: IndexSpec) -> Self {
        self.indexes.insert(index.name.clone(), index);
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Copy map keys into the `name` of each field and index
    pub fn normalize(&mut self) {
        for (name, field) in self.fields.iter_mut() {
            field.name = name.clone();
        }
        for (name, index) in self.indexes.iter_mut() {
            index.name = name.clone();
        }
    }

    /// Structural checks that must hold before anything is diffed
    pub fn check(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::Invalid {
            name: self.name.clone(),
            message,
        };

        if self.table.trim().is_empty() {
            return Err(invalid("table name is empty".to_string()));
        }

        let mut primary_seen = false;
        for (name, index) in &self.indexes {
            if index.columns.is_empty() {
                return Err(invalid(format!("index '{}' has no columns", name)));
            }
            if index.primary {
                if index.columns.len() != 1 {
                    return Err(invalid(format!(
                        "primary index '{}' must have exactly one column",
                        name
                    )));
                }
                if primary_seen {
                    return Err(invalid("more than one primary index".to_string()));
                }
                primary_seen = true;
            }
            for column in &index.columns {
                match self.fields.get(column) {
                    Some(field) if !field.is_virtual() => {}
                    _ => {
                        return Err(invalid(format!(
                            "index '{}' references unknown column '{}'",
                            name, column
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Locked and read-only objects reject every schema change
    pub fn is_locked(&self) -> bool {
        self.locked || self.readonly
    }

    /// Whether the engine supports foreign keys
    pub fn is_transactional(&self) -> bool {
        self.engine.eq_ignore_ascii_case(DEFAULT_ENGINE)
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Fields that are backed by a column, in declaration order
    pub fn stored_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values().filter(|f| !f.is_virtual())
    }

    /// Object and multi links grouped by target object
    pub fn links(&self) -> IndexMap<String, Vec<(&str, LinkType)>> {
        let mut links: IndexMap<String, Vec<(&str, LinkType)>> = IndexMap::new();
        for field in self.fields.values() {
            if let Some(link) = &field.link_config
                && link.link_type != LinkType::Dictionary
            {
                links
                    .entry(link.object.clone())
                    .or_default()
                    .push((field.name.as_str(), link.link_type));
            }
        }
        links
    }

    /// Fields declaring a many-to-many relation
    pub fn many_to_many_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.values().filter(|f| f.is_many_to_many())
    }

    /// Name of the junction object backing a many-to-many field
    pub fn relations_object(&self, field: &str) -> Option<String> {
        let link = self.fields.get(field)?.link_config.as_ref()?;
        Some(match &link.relations_object {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("{}_{}_to_{}", self.name, field, link.object).to_lowercase(),
        })
    }
}
