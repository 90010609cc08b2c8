//! Media data-access layer.
//!
//! Turns structured, caller-facing filter parameters into safe, fully
//! parameterized SQL — callers never write query text themselves. Two
//! cooperating cores:
//!
//! - [`mapper::Mapper`]: generic CRUD over any [`entity::Entity`] with a
//!   declared schema, compiling WHERE / ORDER BY / LIMIT clauses from loose
//!   argument maps.
//! - [`query::MediaQuery`]: layers media-domain filters (type, status,
//!   component, storage origin, orphan/remote flags) onto a paginated
//!   listing engine by injecting a join and extra WHERE predicates, then
//!   exposes cursor iteration and pagination rendering over the results.
//!
//! All SQL is built with SeaQuery and rendered for PostgreSQL; literal
//! values always travel through typed [`sea_query::Value`] conversion, never
//! string concatenation.

pub mod entity;
pub mod error;
pub mod mapper;
pub mod models;
pub mod options;
pub mod query;
pub mod schema;
pub mod store;

pub use entity::{Entity, Value};
pub use error::{BulkOutcome, StoreError, StoreResult};
pub use mapper::Mapper;
pub use query::MediaQuery;
