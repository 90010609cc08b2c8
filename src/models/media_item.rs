//! A single media item: the central record of the store.

use chrono::{DateTime, Utc};

use crate::entity::{Entity, Value};
use crate::schema::{FieldType, Fields, MEDIA_TABLE};

/// A media item row.
///
/// The `type` column is exposed as `media_type`; everything else keeps its
/// column name. The four `is_*` flags record how the item entered the
/// store, `storage` names the backend holding the payload and `source` is
/// the original URI for remote and embedded items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaItem {
    pub media_id: i64,
    pub user_id: i64,
    pub gallery_id: i64,
    pub media_type: String,
    pub status: String,
    pub component: String,
    pub component_id: i64,
    pub context: String,
    pub storage: String,
    pub is_orphan: bool,
    pub is_remote: bool,
    pub is_raw: bool,
    pub is_oembed: bool,
    pub source: String,
    pub oembed_content: String,
    pub oembed_time: Option<DateTime<Utc>>,
}

impl MediaItem {
    /// Whether the item is still detached from any finished upload flow.
    pub fn is_orphan(&self) -> bool {
        self.is_orphan
    }

    /// Whether the item's payload lives outside the local store.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }
}

impl Entity for MediaItem {
    fn table() -> &'static str {
        MEDIA_TABLE
    }

    fn schema() -> Fields {
        &[
            ("media_id", FieldType::Integer),
            ("user_id", FieldType::Integer),
            ("gallery_id", FieldType::Integer),
            ("type", FieldType::Str),
            ("status", FieldType::Str),
            ("component", FieldType::Str),
            ("component_id", FieldType::Integer),
            ("context", FieldType::Str),
            ("storage", FieldType::Str),
            ("is_orphan", FieldType::Bool),
            ("is_remote", FieldType::Bool),
            ("is_raw", FieldType::Bool),
            ("is_oembed", FieldType::Bool),
            ("source", FieldType::Str),
            ("oembed_content", FieldType::Str),
            ("oembed_time", FieldType::DateTime),
        ]
    }

    fn primary_key() -> &'static str {
        "media_id"
    }

    fn timestamps() -> bool {
        false
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "media_id" => Some(Value::Int(self.media_id)),
            "user_id" => Some(Value::Int(self.user_id)),
            "gallery_id" => Some(Value::Int(self.gallery_id)),
            "type" => Some(Value::Str(self.media_type.clone())),
            "status" => Some(Value::Str(self.status.clone())),
            "component" => Some(Value::Str(self.component.clone())),
            "component_id" => Some(Value::Int(self.component_id)),
            "context" => Some(Value::Str(self.context.clone())),
            "storage" => Some(Value::Str(self.storage.clone())),
            "is_orphan" => Some(Value::Bool(self.is_orphan)),
            "is_remote" => Some(Value::Bool(self.is_remote)),
            "is_raw" => Some(Value::Bool(self.is_raw)),
            "is_oembed" => Some(Value::Bool(self.is_oembed)),
            "source" => Some(Value::Str(self.source.clone())),
            "oembed_content" => Some(Value::Str(self.oembed_content.clone())),
            "oembed_time" => Some(self.oembed_time.map_or(Value::Null, Value::DateTime)),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) {
        match field {
            "media_id" => self.media_id = value.as_i64().unwrap_or(0),
            "user_id" => self.user_id = value.as_i64().unwrap_or(0),
            "gallery_id" => self.gallery_id = value.as_i64().unwrap_or(0),
            "type" => self.media_type = value.to_text().unwrap_or_default(),
            "status" => self.status = value.to_text().unwrap_or_default(),
            "component" => self.component = value.to_text().unwrap_or_default(),
            "component_id" => self.component_id = value.as_i64().unwrap_or(0),
            "context" => self.context = value.to_text().unwrap_or_default(),
            "storage" => self.storage = value.to_text().unwrap_or_default(),
            "is_orphan" => self.is_orphan = value.as_i64().unwrap_or(0) != 0,
            "is_remote" => self.is_remote = value.as_i64().unwrap_or(0) != 0,
            "is_raw" => self.is_raw = value.as_i64().unwrap_or(0) != 0,
            "is_oembed" => self.is_oembed = value.as_i64().unwrap_or(0) != 0,
            "source" => self.source = value.to_text().unwrap_or_default(),
            "oembed_content" => self.oembed_content = value.to_text().unwrap_or_default(),
            "oembed_time" => {
                if let Value::DateTime(dt) = value {
                    self.oembed_time = Some(dt);
                }
            }
            _ => {}
        }
    }
}
