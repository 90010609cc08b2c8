//! Concrete entity types for the media store.

mod gallery;
mod log_entry;
mod media_item;

pub use gallery::Gallery;
pub use log_entry::LogEntry;
pub use media_item::MediaItem;
