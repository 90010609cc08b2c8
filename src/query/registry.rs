//! Active media types, statuses and components, plus per-gallery ordering
//! state.
//!
//! The registry is the source of the default filter sets a media query
//! starts from. Hosts register what they support at startup; queries read
//! the active sets when the caller leaves a filter unspecified.

use std::collections::HashSet;

/// Registered media types, statuses, components and manually sorted
/// galleries.
#[derive(Debug, Clone, Default)]
pub struct MediaRegistry {
    types: Vec<String>,
    statuses: Vec<String>,
    components: Vec<String>,
    sorted_galleries: HashSet<i64>,
}

impl MediaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a media type (e.g. `photo`, `video`). Duplicates are kept
    /// out; registration order is preserved.
    pub fn register_type(&mut self, name: &str) -> &mut Self {
        Self::push_unique(&mut self.types, name);
        self
    }

    /// Register a status (e.g. `public`, `private`).
    pub fn register_status(&mut self, name: &str) -> &mut Self {
        Self::push_unique(&mut self.statuses, name);
        self
    }

    /// Register a component (e.g. `members`, `groups`).
    pub fn register_component(&mut self, name: &str) -> &mut Self {
        Self::push_unique(&mut self.components, name);
        self
    }

    /// All active media types, in registration order.
    pub fn active_types(&self) -> &[String] {
        &self.types
    }

    /// All active statuses, in registration order.
    pub fn active_statuses(&self) -> &[String] {
        &self.statuses
    }

    /// All active components, in registration order.
    pub fn active_components(&self) -> &[String] {
        &self.components
    }

    /// Record that a gallery's media were manually reordered; single-gallery
    /// queries then default to manual order instead of date.
    pub fn mark_gallery_sorted(&mut self, gallery_id: i64) -> &mut Self {
        self.sorted_galleries.insert(gallery_id);
        self
    }

    /// Whether the gallery's media carry a manual sort order.
    pub fn is_gallery_sorted(&self, gallery_id: i64) -> bool {
        self.sorted_galleries.contains(&gallery_id)
    }

    fn push_unique(list: &mut Vec<String>, name: &str) {
        if !list.iter().any(|n| n == name) {
            list.push(name.to_string());
        }
    }
}
