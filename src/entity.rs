//! Typed records bound to a declared field schema.
//!
//! Every record type implements [`Entity`], which exposes its table name,
//! ordered schema and primary key, plus field-level `get`/`set` accessors.
//! Rows coming back from storage are loose name → [`Value`] maps; filling a
//! record from a row only ever touches schema-declared fields, so unknown
//! row columns are dropped rather than errored.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::schema::{FieldType, Fields};

/// A runtime scalar value for a schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    DateTime(DateTime<Utc>),
    Null,
}

impl Value {
    /// Integer view of the value, if it has one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// String view of the value, if it has one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value as display text (used for LIKE patterns).
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Int(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::DateTime(dt) => Some(dt.to_rfc3339()),
            Value::Null => None,
        }
    }

    /// True for `Null`, zero integers and empty strings.
    ///
    /// This is the "unset" test used for primary keys: a record whose key
    /// is zero or empty has never been persisted.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Int(i) => *i == 0,
            Value::Str(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}

impl FieldType {
    /// Convert a runtime value into a SeaQuery value according to this
    /// field's declared semantic type.
    ///
    /// This is the single funnel through which every caller-supplied value
    /// reaches SQL text. A value that cannot be represented in the declared
    /// type yields `None` and the clause it belongs to is dropped.
    pub fn coerce(&self, value: &Value) -> Option<sea_query::Value> {
        match self {
            FieldType::Integer => value.as_i64().map(sea_query::Value::from),
            FieldType::Float => match value {
                Value::Float(f) => Some(sea_query::Value::from(*f)),
                Value::Int(i) => Some(sea_query::Value::from(*i as f64)),
                Value::Str(s) => s.trim().parse::<f64>().ok().map(sea_query::Value::from),
                _ => None,
            },
            FieldType::Str => value.to_text().map(sea_query::Value::from),
            FieldType::Bool => match value {
                Value::Bool(b) => Some(sea_query::Value::from(*b)),
                Value::Int(i) => Some(sea_query::Value::from(*i != 0)),
                Value::Str(s) => match s.trim() {
                    "1" | "true" => Some(sea_query::Value::from(true)),
                    "0" | "false" | "" => Some(sea_query::Value::from(false)),
                    _ => None,
                },
                _ => None,
            },
            FieldType::DateTime => match value {
                Value::DateTime(dt) => Some(sea_query::Value::from(*dt)),
                Value::Str(s) => parse_datetime(s).map(sea_query::Value::from),
                _ => None,
            },
        }
    }
}

/// Parse a datetime from RFC 3339 or the plain `YYYY-MM-DD HH:MM:SS` form.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// A raw result row: column name → value.
pub type Row = HashMap<String, Value>;

/// Field name used for creation timestamps.
pub const FIELD_CREATED_AT: &str = "created_at";

/// Field name used for update timestamps.
pub const FIELD_UPDATED_AT: &str = "updated_at";

/// A data type with a declared schema and physical table.
///
/// Implementations are plain structs with one field per schema entry; the
/// `get`/`set` accessors are an explicit, compile-time checked dispatch
/// table rather than reflective property access.
pub trait Entity: Default {
    /// Physical table name.
    fn table() -> &'static str;

    /// Ordered field name → semantic type mapping.
    fn schema() -> Fields;

    /// Primary key field name.
    fn primary_key() -> &'static str {
        "id"
    }

    /// Whether `created_at` / `updated_at` are auto-populated on save.
    fn timestamps() -> bool {
        true
    }

    /// Read a field by name. `None` when the field is not part of this
    /// entity's schema.
    fn get(&self, field: &str) -> Option<Value>;

    /// Write a field by name. Unknown fields are ignored.
    fn set(&mut self, field: &str, value: Value);

    /// Primary key value; zero when the record has not been persisted.
    fn primary_key_value(&self) -> i64 {
        self.get(Self::primary_key())
            .and_then(|v| v.as_i64())
            .unwrap_or(0)
    }

    /// Populate schema-declared fields from a raw row.
    ///
    /// Row columns that are not in the schema are ignored.
    fn fill(&mut self, row: &Row) {
        for (name, _) in Self::schema() {
            if let Some(value) = row.get(*name) {
                self.set(name, value.clone());
            }
        }
    }

    /// Build a fresh record from a raw row.
    ///
    /// Each call produces an independent instance; there is no identity map
    /// or caching of previously loaded records.
    fn to_object(row: &Row) -> Self {
        let mut object = Self::default();
        object.fill(row);
        object
    }
}

/// Whether the given field carries timestamp auto-population semantics.
pub fn is_timestamp_field(field: &str, ty: FieldType) -> bool {
    (field == FIELD_CREATED_AT || field == FIELD_UPDATED_AT) && ty == FieldType::DateTime
}
