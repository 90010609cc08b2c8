//! Gallery records: the containers media items belong to.

use crate::entity::{Entity, Value};
use crate::schema::{FieldType, Fields, GALLERY_TABLE};

/// A gallery row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Gallery {
    pub gallery_id: i64,
    pub user_id: i64,
    pub gallery_type: String,
    pub status: String,
    pub component: String,
    pub component_id: i64,
}

impl Entity for Gallery {
    fn table() -> &'static str {
        GALLERY_TABLE
    }

    fn schema() -> Fields {
        &[
            ("gallery_id", FieldType::Integer),
            ("user_id", FieldType::Integer),
            ("type", FieldType::Str),
            ("status", FieldType::Str),
            ("component", FieldType::Str),
            ("component_id", FieldType::Integer),
        ]
    }

    fn primary_key() -> &'static str {
        "gallery_id"
    }

    fn timestamps() -> bool {
        false
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "gallery_id" => Some(Value::Int(self.gallery_id)),
            "user_id" => Some(Value::Int(self.user_id)),
            "type" => Some(Value::Str(self.gallery_type.clone())),
            "status" => Some(Value::Str(self.status.clone())),
            "component" => Some(Value::Str(self.component.clone())),
            "component_id" => Some(Value::Int(self.component_id)),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) {
        match field {
            "gallery_id" => self.gallery_id = value.as_i64().unwrap_or(0),
            "user_id" => self.user_id = value.as_i64().unwrap_or(0),
            "type" => self.gallery_type = value.to_text().unwrap_or_default(),
            "status" => self.status = value.to_text().unwrap_or_default(),
            "component" => self.component = value.to_text().unwrap_or_default(),
            "component_id" => self.component_id = value.as_i64().unwrap_or(0),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Row;

    #[test]
    fn fills_schema_fields() {
        let mut row = Row::new();
        row.insert("gallery_id".to_string(), Value::Int(3));
        row.insert("type".to_string(), Value::Str("photo".to_string()));
        row.insert("status".to_string(), Value::Str("public".to_string()));

        let gallery = Gallery::to_object(&row);
        assert_eq!(gallery.gallery_id, 3);
        assert_eq!(gallery.gallery_type, "photo");
        assert_eq!(gallery.status, "public");
        assert_eq!(gallery.primary_key_value(), 3);
    }
}
