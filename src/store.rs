//! Storage boundary: parameterized query execution.
//!
//! The compile paths in this crate only ever produce SQL text; everything
//! that touches a connection goes through [`Storage`], so the mapper and
//! media query stay testable without a database. [`PgStorage`] is the
//! production implementation over a sqlx PostgreSQL pool.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row as SqlxRow};

use crate::entity::{Row, Value};
use crate::error::StoreResult;
use crate::schema::{FieldType, Fields};

/// Parameterized query execution against the underlying store.
///
/// One call is one statement; the store provides its own transaction and
/// locking discipline. No retries are attempted here.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Run a SELECT and decode every row through the given schema.
    async fn fetch_rows(&self, sql: &str, schema: Fields) -> StoreResult<Vec<Row>>;

    /// Run a SELECT expected to produce at most one row.
    async fn fetch_optional(&self, sql: &str, schema: Fields) -> StoreResult<Option<Row>>;

    /// Run a SELECT producing a single integer scalar (e.g. COUNT).
    async fn fetch_scalar(&self, sql: &str) -> StoreResult<i64>;

    /// Run a SELECT producing a single integer column.
    async fn fetch_ids(&self, sql: &str) -> StoreResult<Vec<i64>>;

    /// Run a write statement; returns the number of rows affected.
    async fn execute(&self, sql: &str) -> StoreResult<u64>;

    /// Run an INSERT with a RETURNING clause; returns the new key.
    async fn insert(&self, sql: &str) -> StoreResult<i64>;
}

/// PostgreSQL storage over a sqlx connection pool.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Decode one row into a name → value map, guided by the schema.
    ///
    /// Columns absent from the result (or failing to decode as the declared
    /// type) are skipped, mirroring the schema-unknown defensive policy of
    /// the compile side.
    fn decode_row(row: &PgRow, schema: Fields) -> Row {
        let mut out = Row::new();
        for (name, ty) in schema {
            let value = match ty {
                FieldType::Integer => row
                    .try_get::<Option<i64>, _>(*name)
                    .ok()
                    .map(|v| v.map(Value::Int)),
                FieldType::Float => row
                    .try_get::<Option<f64>, _>(*name)
                    .ok()
                    .map(|v| v.map(Value::Float)),
                FieldType::Str => row
                    .try_get::<Option<String>, _>(*name)
                    .ok()
                    .map(|v| v.map(Value::Str)),
                FieldType::Bool => row
                    .try_get::<Option<bool>, _>(*name)
                    .ok()
                    .map(|v| v.map(Value::Bool)),
                FieldType::DateTime => row
                    .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(*name)
                    .ok()
                    .map(|v| v.map(Value::DateTime)),
            };
            match value {
                Some(Some(v)) => {
                    out.insert((*name).to_string(), v);
                }
                Some(None) => {
                    out.insert((*name).to_string(), Value::Null);
                }
                None => {
                    tracing::debug!(column = name, "column missing or undecodable; skipping");
                }
            }
        }
        out
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn fetch_rows(&self, sql: &str, schema: Fields) -> StoreResult<Vec<Row>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(|r| Self::decode_row(r, schema)).collect())
    }

    async fn fetch_optional(&self, sql: &str, schema: Fields) -> StoreResult<Option<Row>> {
        let row = sqlx::query(sql).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| Self::decode_row(&r, schema)))
    }

    async fn fetch_scalar(&self, sql: &str) -> StoreResult<i64> {
        let value: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(value)
    }

    async fn fetch_ids(&self, sql: &str) -> StoreResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(sql).fetch_all(&self.pool).await?;
        Ok(ids)
    }

    async fn execute(&self, sql: &str) -> StoreResult<u64> {
        let result = sqlx::query(sql).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn insert(&self, sql: &str) -> StoreResult<i64> {
        let id: i64 = sqlx::query_scalar(sql).fetch_one(&self.pool).await?;
        Ok(id)
    }
}
