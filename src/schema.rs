//! Schema registry: semantic field types and logical → physical table names.
//!
//! The registry is static and immutable at runtime. An absent table name is
//! a contract violation on the caller's side, not a recoverable condition,
//! so the lookup simply returns `None`.

use serde::{Deserialize, Serialize};

/// Physical name of the append-only media log table.
pub const LOG_TABLE: &str = "media_log";

/// Physical name of the media item table.
pub const MEDIA_TABLE: &str = "media_item";

/// Physical name of the gallery table.
pub const GALLERY_TABLE: &str = "media_gallery";

/// Semantic type of a schema field.
///
/// Every value bound into SQL is converted according to the declared
/// semantic type of its field; see [`FieldType::coerce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    #[serde(rename = "string")]
    Str,
    Bool,
    #[serde(rename = "datetime")]
    DateTime,
}

/// One declared field: name and semantic type.
pub type FieldDef = (&'static str, FieldType);

/// An entity schema: ordered mapping of field name to semantic type.
pub type Fields = &'static [FieldDef];

/// Look up the physical table for a logical entity name.
pub fn table(name: &str) -> Option<&'static str> {
    match name {
        "logs" => Some(LOG_TABLE),
        "media" => Some(MEDIA_TABLE),
        "gallery" => Some(GALLERY_TABLE),
        _ => None,
    }
}

/// Declared type of a field, or `None` when the schema does not know it.
pub fn field_type(schema: Fields, name: &str) -> Option<FieldType> {
    schema
        .iter()
        .find(|(field, _)| *field == name)
        .map(|(_, ty)| *ty)
}
