//! Generic record mapper: schema-driven CRUD over any [`Entity`].
//!
//! The mapper is stateless per call; every operation compiles one statement
//! with SeaQuery and hands it to the [`Storage`] boundary. Bulk writes
//! refuse to run when their compiled WHERE clause is empty, so a malformed
//! argument map can never become an unbounded UPDATE or DELETE.

pub mod clause;

use chrono::Utc;
use sea_query::{Alias, Asterisk, Expr, Order, PostgresQueryBuilder, Query, SimpleExpr};

use crate::entity::{Entity, FIELD_CREATED_AT, FIELD_UPDATED_AT, Value, is_timestamp_field};
use crate::error::{BulkOutcome, StoreResult};
use crate::schema::field_type;
use crate::store::Storage;

pub use clause::{Args, BoolOp, Filter, Op, Operand, PageClause};

/// Schema-driven CRUD engine over a storage backend.
pub struct Mapper<S> {
    storage: S,
}

impl<S: Storage> Mapper<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// The underlying storage boundary.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Insert or update a record.
    ///
    /// A record with an unset (zero) primary key is inserted and the newly
    /// assigned key is written back and returned. A record with a set key
    /// is updated in place, scoped to exactly that key. When the entity
    /// enables timestamps, `updated_at` is refreshed on every save and
    /// `created_at` is filled on insert only.
    pub async fn save<E: Entity>(&self, record: &mut E) -> StoreResult<i64> {
        let pk = E::primary_key();
        let pk_value = record.primary_key_value();
        let updating = pk_value != 0;
        let now = Utc::now();

        let mut columns: Vec<(&'static str, sea_query::Value)> = Vec::new();
        for (name, ty) in E::schema() {
            if *name == pk {
                continue;
            }
            if E::timestamps() && is_timestamp_field(name, *ty) {
                if *name == FIELD_UPDATED_AT {
                    columns.push((name, sea_query::Value::from(now)));
                } else if *name == FIELD_CREATED_AT && !updating {
                    // Keep a caller-provided creation time; otherwise stamp now.
                    let provided = record
                        .get(name)
                        .filter(|v| !v.is_empty())
                        .and_then(|v| ty.coerce(&v));
                    columns.push((name, provided.unwrap_or_else(|| sea_query::Value::from(now))));
                }
                continue;
            }
            if let Some(value) = record.get(name)
                && let Some(coerced) = ty.coerce(&value)
            {
                columns.push((name, coerced));
            }
        }

        if updating {
            if columns.is_empty() {
                return Ok(pk_value);
            }
            let mut stmt = Query::update();
            stmt.table(Alias::new(E::table()));
            for (name, value) in columns {
                stmt.value(Alias::new(name), value);
            }
            stmt.and_where(Expr::col(Alias::new(pk)).eq(pk_value));
            self.storage
                .execute(&stmt.to_string(PostgresQueryBuilder))
                .await?;
            Ok(pk_value)
        } else {
            let mut stmt = Query::insert();
            stmt.into_table(Alias::new(E::table()));
            stmt.columns(columns.iter().map(|(name, _)| Alias::new(*name)));
            stmt.values_panic(
                columns
                    .iter()
                    .map(|(_, value)| SimpleExpr::from(value.clone())),
            );
            stmt.returning_col(Alias::new(pk));
            let id = self
                .storage
                .insert(&stmt.to_string(PostgresQueryBuilder))
                .await?;
            record.set(pk, Value::Int(id));
            Ok(id)
        }
    }

    /// Delete a record by primary key.
    ///
    /// A record with an unset key is refused with
    /// [`BulkOutcome::NoConditions`].
    pub async fn delete<E: Entity>(&self, record: &E) -> StoreResult<BulkOutcome> {
        let pk_value = record.primary_key_value();
        if pk_value == 0 {
            return Ok(BulkOutcome::NoConditions);
        }
        self.destroy::<E>(&Args::new().set(E::primary_key(), pk_value))
            .await
    }

    /// Bulk update: set schema-known assignments on every row matching the
    /// conditions.
    pub async fn update<E: Entity>(
        &self,
        values: &[(&str, Value)],
        conditions: &Args,
    ) -> StoreResult<BulkOutcome> {
        let mut assignments: Vec<(&str, sea_query::Value)> = Vec::new();
        for (name, value) in values {
            let Some(ty) = field_type(E::schema(), name) else {
                tracing::debug!(field = name, "unknown assignment field; skipping");
                continue;
            };
            if let Some(coerced) = ty.coerce(value) {
                assignments.push((name, coerced));
            }
        }
        if assignments.is_empty() {
            return Ok(BulkOutcome::NoAssignments);
        }

        let Some(cond) = clause::compile_where(E::schema(), conditions, BoolOp::And) else {
            return Ok(BulkOutcome::NoConditions);
        };

        let mut stmt = Query::update();
        stmt.table(Alias::new(E::table()));
        for (name, value) in assignments {
            stmt.value(Alias::new(name), value);
        }
        stmt.cond_where(cond);
        let affected = self
            .storage
            .execute(&stmt.to_string(PostgresQueryBuilder))
            .await?;
        Ok(BulkOutcome::Affected(affected))
    }

    /// Bulk delete of every row matching the conditions.
    ///
    /// Refused when no usable WHERE clause compiles from the arguments.
    pub async fn destroy<E: Entity>(&self, conditions: &Args) -> StoreResult<BulkOutcome> {
        let Some(cond) = clause::compile_where(E::schema(), conditions, BoolOp::And) else {
            return Ok(BulkOutcome::NoConditions);
        };

        let mut stmt = Query::delete();
        stmt.from_table(Alias::new(E::table()));
        stmt.cond_where(cond);
        let affected = self
            .storage
            .execute(&stmt.to_string(PostgresQueryBuilder))
            .await?;
        Ok(BulkOutcome::Affected(affected))
    }

    /// Fetch one record by primary key.
    pub async fn find<E: Entity>(&self, id: i64) -> StoreResult<Option<E>> {
        let mut stmt = Query::select();
        stmt.column(Asterisk)
            .from(Alias::new(E::table()))
            .and_where(Expr::col(Alias::new(E::primary_key())).eq(id))
            .limit(1);
        let row = self
            .storage
            .fetch_optional(&stmt.to_string(PostgresQueryBuilder), E::schema())
            .await?;
        Ok(row.map(|r| E::to_object(&r)))
    }

    /// Fetch the first record matching the conditions, or `None`.
    ///
    /// Without a valid `orderby` argument the primary key (descending) is
    /// used so "first" is deterministic.
    pub async fn first<E: Entity>(&self, args: &Args) -> StoreResult<Option<E>> {
        let mut stmt = Query::select();
        stmt.column(Asterisk).from(Alias::new(E::table()));
        if let Some(cond) = clause::compile_where(E::schema(), args, BoolOp::And) {
            stmt.cond_where(cond);
        }
        let (field, order) = clause::compile_order_by(E::schema(), args)
            .unwrap_or_else(|| (E::primary_key().to_string(), Order::Desc));
        stmt.order_by(Alias::new(&field), order).limit(1);

        let row = self
            .storage
            .fetch_optional(&stmt.to_string(PostgresQueryBuilder), E::schema())
            .await?;
        Ok(row.map(|r| E::to_object(&r)))
    }

    /// Count the rows matching the conditions.
    pub async fn exists<E: Entity>(&self, args: &Args) -> StoreResult<i64> {
        let mut stmt = Query::select();
        stmt.expr(Expr::col(Asterisk).count())
            .from(Alias::new(E::table()));
        if let Some(cond) = clause::compile_where(E::schema(), args, BoolOp::And) {
            stmt.cond_where(cond);
        }
        self.storage
            .fetch_scalar(&stmt.to_string(PostgresQueryBuilder))
            .await
    }

    /// Fetch an ordered sequence of records matching the conditions.
    pub async fn get<E: Entity>(&self, args: &Args) -> StoreResult<Vec<E>> {
        let sql = Self::select_sql::<E>(args);
        let rows = self.storage.fetch_rows(&sql, E::schema()).await?;
        Ok(rows.iter().map(|r| E::to_object(r)).collect())
    }

    /// Fetch every record of the entity.
    pub async fn all<E: Entity>(&self) -> StoreResult<Vec<E>> {
        self.get::<E>(&Args::new()).await
    }

    /// Compile the SELECT for [`Mapper::get`].
    fn select_sql<E: Entity>(args: &Args) -> String {
        let mut stmt = Query::select();
        stmt.column(Asterisk).from(Alias::new(E::table()));
        if let Some(cond) = clause::compile_where(E::schema(), args, BoolOp::And) {
            stmt.cond_where(cond);
        }
        if let Some((field, order)) = clause::compile_order_by(E::schema(), args) {
            stmt.order_by(Alias::new(&field), order);
        }
        if let Some(paged) = clause::compile_paged(args) {
            stmt.limit(paged.limit).offset(paged.offset);
        }
        stmt.to_string(PostgresQueryBuilder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Row;
    use crate::schema::{FieldType, Fields};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Entity with timestamp fields enabled, used across the mapper tests.
    #[derive(Debug, Default)]
    struct Clip {
        id: i64,
        title: String,
        views: i64,
        created_at: Option<chrono::DateTime<chrono::Utc>>,
        updated_at: Option<chrono::DateTime<chrono::Utc>>,
    }

    impl Entity for Clip {
        fn table() -> &'static str {
            "clip"
        }

        fn schema() -> Fields {
            &[
                ("id", FieldType::Integer),
                ("title", FieldType::Str),
                ("views", FieldType::Integer),
                ("created_at", FieldType::DateTime),
                ("updated_at", FieldType::DateTime),
            ]
        }

        fn get(&self, field: &str) -> Option<Value> {
            match field {
                "id" => Some(Value::Int(self.id)),
                "title" => Some(Value::Str(self.title.clone())),
                "views" => Some(Value::Int(self.views)),
                "created_at" => Some(self.created_at.map_or(Value::Null, Value::DateTime)),
                "updated_at" => Some(self.updated_at.map_or(Value::Null, Value::DateTime)),
                _ => None,
            }
        }

        fn set(&mut self, field: &str, value: Value) {
            match field {
                "id" => self.id = value.as_i64().unwrap_or(0),
                "title" => self.title = value.to_text().unwrap_or_default(),
                "views" => self.views = value.as_i64().unwrap_or(0),
                "created_at" => {
                    if let Value::DateTime(dt) = value {
                        self.created_at = Some(dt);
                    }
                }
                "updated_at" => {
                    if let Value::DateTime(dt) = value {
                        self.updated_at = Some(dt);
                    }
                }
                _ => {}
            }
        }
    }

    /// Records every statement and replays canned results.
    #[derive(Default)]
    struct FakeStorage {
        log: Mutex<Vec<String>>,
        rows: Mutex<Vec<Row>>,
        scalar: i64,
        insert_id: i64,
        affected: u64,
    }

    impl FakeStorage {
        fn sql(&self) -> Vec<String> {
            self.log.lock().map(|l| l.clone()).unwrap_or_default()
        }

        fn record(&self, sql: &str) {
            if let Ok(mut log) = self.log.lock() {
                log.push(sql.to_string());
            }
        }
    }

    #[async_trait]
    impl Storage for FakeStorage {
        async fn fetch_rows(&self, sql: &str, _schema: Fields) -> StoreResult<Vec<Row>> {
            self.record(sql);
            Ok(self.rows.lock().map(|r| r.clone()).unwrap_or_default())
        }

        async fn fetch_optional(&self, sql: &str, _schema: Fields) -> StoreResult<Option<Row>> {
            self.record(sql);
            Ok(self
                .rows
                .lock()
                .ok()
                .and_then(|r| r.first().cloned()))
        }

        async fn fetch_scalar(&self, sql: &str) -> StoreResult<i64> {
            self.record(sql);
            Ok(self.scalar)
        }

        async fn fetch_ids(&self, sql: &str) -> StoreResult<Vec<i64>> {
            self.record(sql);
            Ok(Vec::new())
        }

        async fn execute(&self, sql: &str) -> StoreResult<u64> {
            self.record(sql);
            Ok(self.affected)
        }

        async fn insert(&self, sql: &str) -> StoreResult<i64> {
            self.record(sql);
            Ok(self.insert_id)
        }
    }

    fn mapper(storage: FakeStorage) -> Mapper<FakeStorage> {
        Mapper::new(storage)
    }

    #[tokio::test]
    async fn save_with_unset_key_inserts_and_assigns_key() {
        let m = mapper(FakeStorage {
            insert_id: 101,
            ..FakeStorage::default()
        });
        let mut clip = Clip {
            title: "intro".to_string(),
            views: 3,
            ..Clip::default()
        };

        let id = m.save(&mut clip).await.unwrap();
        assert_eq!(id, 101);
        assert_eq!(clip.id, 101);

        let sql = &m.storage().sql()[0];
        assert!(sql.starts_with("INSERT INTO \"clip\""), "{sql}");
        assert!(sql.contains("RETURNING \"id\""), "{sql}");
        assert!(sql.contains("\"created_at\""), "{sql}");
        assert!(sql.contains("\"updated_at\""), "{sql}");
        assert!(!sql.contains("\"id\","), "pk must not be inserted: {sql}");
    }

    #[tokio::test]
    async fn save_with_set_key_updates_exactly_that_key() {
        let m = mapper(FakeStorage {
            affected: 1,
            ..FakeStorage::default()
        });
        let mut clip = Clip {
            id: 5,
            title: "renamed".to_string(),
            ..Clip::default()
        };

        let id = m.save(&mut clip).await.unwrap();
        assert_eq!(id, 5);

        let sql = &m.storage().sql()[0];
        assert!(sql.starts_with("UPDATE \"clip\""), "{sql}");
        assert!(sql.contains("\"id\" = 5"), "{sql}");
        assert!(sql.contains("\"updated_at\""), "{sql}");
        assert!(
            !sql.contains("\"created_at\""),
            "update must never touch created_at: {sql}"
        );
    }

    #[tokio::test]
    async fn delete_with_unset_key_is_refused() {
        let m = mapper(FakeStorage::default());
        let clip = Clip::default();

        let outcome = m.delete(&clip).await.unwrap();
        assert_eq!(outcome, BulkOutcome::NoConditions);
        assert!(m.storage().sql().is_empty(), "nothing may execute");
    }

    #[tokio::test]
    async fn delete_with_key_compiles_scoped_delete() {
        let m = mapper(FakeStorage {
            affected: 1,
            ..FakeStorage::default()
        });
        let clip = Clip {
            id: 9,
            ..Clip::default()
        };

        let outcome = m.delete(&clip).await.unwrap();
        assert_eq!(outcome, BulkOutcome::Affected(1));

        let sql = &m.storage().sql()[0];
        assert!(sql.starts_with("DELETE FROM \"clip\""), "{sql}");
        assert!(sql.contains("\"id\" = 9"), "{sql}");
    }

    #[tokio::test]
    async fn destroy_refuses_empty_conditions() {
        let m = mapper(FakeStorage::default());

        let empty = m.destroy::<Clip>(&Args::new()).await.unwrap();
        assert_eq!(empty, BulkOutcome::NoConditions);

        // Conditions that compile to nothing are just as unbounded.
        let junk_only = m
            .destroy::<Clip>(&Args::new().set("not_a_field", 1))
            .await
            .unwrap();
        assert_eq!(junk_only, BulkOutcome::NoConditions);
        assert!(m.storage().sql().is_empty());
    }

    #[tokio::test]
    async fn bulk_update_skips_unknown_fields() {
        let m = mapper(FakeStorage {
            affected: 2,
            ..FakeStorage::default()
        });

        let outcome = m
            .update::<Clip>(
                &[
                    ("views", Value::Int(0)),
                    ("bogus", Value::Str("x".to_string())),
                ],
                &Args::new().set("title", "old"),
            )
            .await
            .unwrap();
        assert_eq!(outcome, BulkOutcome::Affected(2));

        let sql = &m.storage().sql()[0];
        assert!(sql.contains("\"views\" = 0"), "{sql}");
        assert!(!sql.contains("bogus"), "{sql}");
    }

    #[tokio::test]
    async fn bulk_update_refuses_without_known_assignments() {
        let m = mapper(FakeStorage::default());
        let outcome = m
            .update::<Clip>(
                &[("bogus", Value::Int(1))],
                &Args::new().set("title", "old"),
            )
            .await
            .unwrap();
        assert_eq!(outcome, BulkOutcome::NoAssignments);
        assert!(m.storage().sql().is_empty());
    }

    #[tokio::test]
    async fn find_scopes_by_primary_key() {
        let m = mapper(FakeStorage::default());
        let found: Option<Clip> = m.find(7).await.unwrap();
        assert!(found.is_none());

        let sql = &m.storage().sql()[0];
        assert!(sql.contains("\"id\" = 7"), "{sql}");
        assert!(sql.contains("LIMIT 1"), "{sql}");
    }

    #[tokio::test]
    async fn find_returns_independent_instances() {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Int(7));
        row.insert("title".to_string(), Value::Str("one".to_string()));
        let m = mapper(FakeStorage {
            rows: Mutex::new(vec![row]),
            ..FakeStorage::default()
        });

        let a: Clip = m.find(7).await.unwrap().unwrap();
        let b: Clip = m.find(7).await.unwrap().unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.title, b.title);
        // Two reads, two statements: no identity map in between.
        assert_eq!(m.storage().sql().len(), 2);
    }

    #[tokio::test]
    async fn first_orders_by_primary_key_by_default() {
        let m = mapper(FakeStorage::default());
        let _: Option<Clip> = m.first(&Args::new().set("title", "x")).await.unwrap();

        let sql = &m.storage().sql()[0];
        assert!(sql.contains("ORDER BY \"id\" DESC"), "{sql}");
        assert!(sql.contains("LIMIT 1"), "{sql}");
    }

    #[tokio::test]
    async fn exists_compiles_count() {
        let m = mapper(FakeStorage {
            scalar: 4,
            ..FakeStorage::default()
        });
        let count = m.exists::<Clip>(&Args::new().set("views", 0)).await.unwrap();
        assert_eq!(count, 4);

        let sql = &m.storage().sql()[0];
        assert!(sql.contains("COUNT(*)"), "{sql}");
        assert!(sql.contains("\"views\" = 0"), "{sql}");
        assert!(!sql.contains("LIMIT"), "{sql}");
    }

    #[tokio::test]
    async fn get_compiles_where_order_and_window() {
        let m = mapper(FakeStorage::default());
        let args = Args::new()
            .set_op("title", Op::In, vec!["a", "b"])
            .set("orderby", "views")
            .set("order", "ASC")
            .set("per_page", 10)
            .set("page", 3);
        let _: Vec<Clip> = m.get(&args).await.unwrap();

        let sql = &m.storage().sql()[0];
        assert!(sql.contains("\"title\" IN ('a', 'b')"), "{sql}");
        assert!(sql.contains("ORDER BY \"views\" ASC"), "{sql}");
        assert!(sql.contains("LIMIT 10"), "{sql}");
        assert!(sql.contains("OFFSET 20"), "{sql}");
    }

    #[tokio::test]
    async fn get_without_limit_when_per_page_zero() {
        let m = mapper(FakeStorage::default());
        let args = Args::new().set("per_page", 0).set("page", 3);
        let _: Vec<Clip> = m.get(&args).await.unwrap();

        let sql = &m.storage().sql()[0];
        assert!(!sql.contains("LIMIT"), "{sql}");
    }

    #[tokio::test]
    async fn all_selects_everything() {
        let m = mapper(FakeStorage::default());
        let _: Vec<Clip> = m.all().await.unwrap();

        let sql = &m.storage().sql()[0];
        assert_eq!(sql, "SELECT * FROM \"clip\"");
    }
}
