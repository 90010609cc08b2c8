//! Configuration boundary: read-only named options.
//!
//! The data-access layer never writes configuration; it reads a handful of
//! named options (page size, orphan visibility, permalink structure) from
//! whatever store the host application uses.

use std::collections::HashMap;

/// Default number of media items per page.
pub const MEDIA_PER_PAGE: &str = "media_per_page";

/// When set (truthy), orphaned media rows are included in query results.
pub const SHOW_ORPHANED_MEDIA: &str = "show_orphaned_media";

/// Pretty-permalink structure; empty or absent means raw query-arg links.
pub const PERMALINK_STRUCTURE: &str = "permalink_structure";

/// Read-only access to named configuration options.
pub trait Options: Send + Sync {
    /// Raw option value, or `None` when unset.
    fn get(&self, name: &str) -> Option<serde_json::Value>;

    /// Unsigned integer option with a default.
    fn get_u64(&self, name: &str, default: u64) -> u64 {
        self.get(name)
            .and_then(|v| v.as_u64())
            .unwrap_or(default)
    }

    /// Boolean option; unset means false.
    fn get_bool(&self, name: &str) -> bool {
        self.get(name)
            .map(|v| match v {
                serde_json::Value::Bool(b) => b,
                serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
                serde_json::Value::String(s) => s == "1" || s == "true",
                _ => false,
            })
            .unwrap_or(false)
    }

    /// String option, or `None` when unset.
    fn get_str(&self, name: &str) -> Option<String> {
        self.get(name)
            .and_then(|v| v.as_str().map(String::from))
    }
}

/// In-memory option store, used in tests and embedded setups.
#[derive(Debug, Clone, Default)]
pub struct MemoryOptions {
    values: HashMap<String, serde_json::Value>,
}

impl MemoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an option value.
    pub fn set(&mut self, name: &str, value: impl Into<serde_json::Value>) -> &mut Self {
        self.values.insert(name.to_string(), value.into());
        self
    }
}

impl Options for MemoryOptions {
    fn get(&self, name: &str) -> Option<serde_json::Value> {
        self.values.get(name).cloned()
    }
}
