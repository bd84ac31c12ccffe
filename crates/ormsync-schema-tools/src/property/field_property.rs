//! Field to column mapping

use ormsync_core::ColumnDefinition;

use crate::migration::DdlEmitter;
use crate::object::{DbType, FieldSpec, ObjectConfig, TypeClass};

/// Character length used for char/varchar fields without `db_len`
pub const DEFAULT_CHAR_LENGTH: u32 = 255;

/// Length the live database is expected to report for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedLength {
    /// Compared against NUMERIC_PRECISION and NUMERIC_SCALE.
    ///
    /// `precision` comes from the field's `db_scale` and `scale` from its
    /// `db_precision`: the declared names are swapped relative to the
    /// live metadata.
    Digits { precision: u32, scale: u32 },
    /// Compared against NUMERIC_PRECISION
    Numeric(u32),
    /// Compared against CHARACTER_MAXIMUM_LENGTH
    Chars(u32),
    /// Length is not checked
    Unchecked,
}

/// Canonical display width reported for integer types
pub fn numeric_length(db_type: DbType, unsigned: bool) -> Option<u32> {
    match db_type {
        DbType::Tinyint => Some(3),
        DbType::Smallint => Some(5),
        DbType::Mediumint => Some(7),
        DbType::Int => Some(10),
        DbType::Bigint if unsigned => Some(20),
        DbType::Bigint => Some(19),
        _ => None,
    }
}

/// Column view of one declared field
#[derive(Debug, Clone, Copy)]
pub struct FieldProperty<'a> {
    field: &'a FieldSpec,
    primary_key: bool,
}

impl<'a> FieldProperty<'a> {
    pub fn new(field: &'a FieldSpec) -> Self {
        Self {
            field,
            primary_key: false,
        }
    }

    /// Property of a field within its object, so the primary key is known
    pub fn of(config: &ObjectConfig, field: &'a FieldSpec) -> Self {
        Self {
            field,
            primary_key: config.primary_key == field.name,
        }
    }

    pub fn field(&self) -> &FieldSpec {
        self.field
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Storage type name as the live database reports it
    pub fn storage_type(&self) -> &'static str {
        match self.field.db_type {
            DbType::Boolean => "tinyint",
            other => other.as_str(),
        }
    }

    /// Full column definition for DDL
    pub fn column_definition(&self) -> ColumnDefinition {
        let field = self.field;
        let mut column = ColumnDefinition::new(field.name.clone(), self.storage_type());
        column.nullable = field.is_nullable();
        column.default = field.effective_default().map(str::to_string);

        match field.db_type.class() {
            TypeClass::Boolean => {
                column.length = Some(1);
                column.unsigned = true;
            }
            TypeClass::Integer => {
                column.length = field.length;
                column.unsigned = field.unsigned;
                if field.db_type == DbType::Bit && column.length.is_none() {
                    column.length = Some(1);
                }
                if self.primary_key && field.db_type != DbType::Bit {
                    column.auto_increment = true;
                    column.nullable = false;
                    column.default = None;
                }
            }
            TypeClass::Float => {
                column.precision = field.scale;
                column.scale = field.precision;
                column.unsigned = field.unsigned;
            }
            TypeClass::Char => {
                column.length = Some(field.length.unwrap_or(DEFAULT_CHAR_LENGTH));
            }
            TypeClass::Text | TypeClass::Blob | TypeClass::Date => {}
        }
        column
    }

    /// Column definition fragment as SQL
    pub fn to_sql(&self, emitter: &dyn DdlEmitter) -> String {
        emitter.column_sql(&self.column_definition())
    }

    /// What the length comparison checks for this field
    pub fn expected_length(&self) -> ExpectedLength {
        let field = self.field;
        match field.db_type.class() {
            // without declared digits the server picks its own defaults
            TypeClass::Float => match field.scale {
                Some(precision) => ExpectedLength::Digits {
                    precision,
                    scale: field.precision.unwrap_or(0),
                },
                None => ExpectedLength::Unchecked,
            },
            TypeClass::Integer => match numeric_length(field.db_type, field.unsigned) {
                Some(len) => ExpectedLength::Numeric(len),
                None => ExpectedLength::Numeric(field.length.unwrap_or(1)),
            },
            TypeClass::Char => match field.length {
                Some(len) => ExpectedLength::Chars(len),
                None => ExpectedLength::Unchecked,
            },
            TypeClass::Boolean | TypeClass::Text | TypeClass::Blob | TypeClass::Date => {
                ExpectedLength::Unchecked
            }
        }
    }

    /// Whether the default value takes part in the comparison
    pub fn compares_default(&self) -> bool {
        !self.column_definition().nullable
            && !matches!(
                self.field.db_type.class(),
                TypeClass::Date | TypeClass::Text | TypeClass::Blob
            )
    }
}
