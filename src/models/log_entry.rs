//! Append-only activity log entries.

use chrono::{DateTime, Utc};

use crate::entity::{Entity, Value};
use crate::schema::{FieldType, Fields, LOG_TABLE};

/// One row of the append-only media log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEntry {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub action: String,
    pub value: String,
    pub logged_at: Option<DateTime<Utc>>,
}

impl Entity for LogEntry {
    fn table() -> &'static str {
        LOG_TABLE
    }

    fn schema() -> Fields {
        &[
            ("id", FieldType::Integer),
            ("user_id", FieldType::Integer),
            ("item_id", FieldType::Integer),
            ("action", FieldType::Str),
            ("value", FieldType::Str),
            ("logged_at", FieldType::DateTime),
        ]
    }

    fn timestamps() -> bool {
        false
    }

    fn get(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Int(self.id)),
            "user_id" => Some(Value::Int(self.user_id)),
            "item_id" => Some(Value::Int(self.item_id)),
            "action" => Some(Value::Str(self.action.clone())),
            "value" => Some(Value::Str(self.value.clone())),
            "logged_at" => Some(self.logged_at.map_or(Value::Null, Value::DateTime)),
            _ => None,
        }
    }

    fn set(&mut self, field: &str, value: Value) {
        match field {
            "id" => self.id = value.as_i64().unwrap_or(0),
            "user_id" => self.user_id = value.as_i64().unwrap_or(0),
            "item_id" => self.item_id = value.as_i64().unwrap_or(0),
            "action" => self.action = value.to_text().unwrap_or_default(),
            "value" => self.value = value.to_text().unwrap_or_default(),
            "logged_at" => {
                if let Value::DateTime(dt) = value {
                    self.logged_at = Some(dt);
                }
            }
            _ => {}
        }
    }
}
