//! Listing-engine boundary: native paginated listing plus per-call clause
//! modifiers.
//!
//! The engine only understands its native parameter set. Filters it cannot
//! express arrive as ordered join/where modifiers scoped to one call; each
//! modifier receives the current clause text and returns the modified text.
//! [`SqlListingEngine`] is the SQL implementation over a [`Storage`].

use std::sync::Arc;

use async_trait::async_trait;
use sea_query::extension::postgres::PgExpr;
use sea_query::{Alias, Cond, Condition, Expr};
use serde::Deserialize;

use crate::entity::{Row, Value};
use crate::error::StoreResult;
use crate::mapper::clause::{escape_like_wildcards, render_predicate};
use crate::schema::Fields;
use crate::store::Storage;

/// Sort direction for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Sort key understood natively by the listing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingOrder {
    /// Storage natural order.
    None,
    Id,
    Title,
    Slug,
    #[default]
    Date,
    Modified,
    /// Manual per-gallery position.
    MenuOrder,
    Random,
}

/// Which fields the listing projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingFields {
    #[default]
    All,
    Ids,
    IdParent,
}

/// The engine's native parameter set.
///
/// `mapped` is set by the media query once it has translated domain filters
/// into these parameters; the injection step only fires for parameter sets
/// carrying the tag, so unrelated listings sharing the engine stay
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct ListingParams {
    pub id: Option<i64>,
    pub include: Vec<i64>,
    pub exclude: Vec<i64>,
    pub slug: Option<String>,
    pub parent: Option<i64>,
    pub parent_in: Vec<i64>,
    pub parent_not_in: Vec<i64>,
    pub author: Option<i64>,
    pub author_name: Option<String>,
    pub author_in: Vec<i64>,
    pub author_not_in: Vec<i64>,
    pub year: Option<u32>,
    pub month: Option<u32>,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    /// Combined `YYYYMM` filter, e.g. `201307`.
    pub yearmonth: Option<u32>,
    pub search: Option<String>,
    pub per_page: u64,
    pub page: u64,
    pub offset: u64,
    pub nopaging: bool,
    pub order: SortDirection,
    pub orderby: ListingOrder,
    pub fields: ListingFields,
    pub mapped: bool,
}

/// One executed page of a listing.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub rows: Vec<Row>,
    pub total: i64,
    pub total_pages: u64,
    pub per_page: u64,
    pub page: u64,
    /// The executed SELECT, kept for re-derivation.
    pub sql: String,
    /// Key-only variant of the executed SELECT.
    pub ids_sql: String,
}

/// A clause-text transformer applied during query composition.
pub type ClauseModifier = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Ordered join/where modifiers for a single listing call.
///
/// Modifiers run in push order; there is no global registration, so nothing
/// has to be detached afterwards.
#[derive(Clone, Default)]
pub struct QueryModifiers {
    joins: Vec<ClauseModifier>,
    wheres: Vec<ClauseModifier>,
}

impl QueryModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a join-clause modifier.
    pub fn join(&mut self, modifier: ClauseModifier) -> &mut Self {
        self.joins.push(modifier);
        self
    }

    /// Append a where-clause modifier.
    pub fn filter(&mut self, modifier: ClauseModifier) -> &mut Self {
        self.wheres.push(modifier);
        self
    }

    /// Append all modifiers from another set, preserving order.
    pub fn extend(&mut self, other: &QueryModifiers) -> &mut Self {
        self.joins.extend(other.joins.iter().cloned());
        self.wheres.extend(other.wheres.iter().cloned());
        self
    }

    fn apply_joins(&self, initial: &str) -> String {
        self.joins
            .iter()
            .fold(initial.to_string(), |text, m| m(&text))
    }

    fn apply_wheres(&self, initial: &str) -> String {
        self.wheres
            .iter()
            .fold(initial.to_string(), |text, m| m(&text))
    }
}

/// External ordered-listing executor.
#[async_trait]
pub trait ListingEngine: Send + Sync {
    /// Physical table the listing selects from.
    fn base_table(&self) -> &str;

    /// Execute one listing call: page of rows plus totals.
    async fn run(&self, params: &ListingParams, modifiers: &QueryModifiers)
    -> StoreResult<ListingPage>;

    /// Re-derive just the matching keys from an already-composed query.
    async fn ids(&self, ids_sql: &str) -> StoreResult<Vec<i64>>;
}

/// SQL listing engine over a storage backend.
///
/// The base table carries the listing columns (`id`, `parent_id`,
/// `author_id`, `author_name`, `title`, `slug`, `status`, `created`,
/// `modified`, `position`). The projection and row schema are configurable
/// so a joined query can select and decode the joined table's columns
/// instead of the base ones.
pub struct SqlListingEngine<S> {
    storage: S,
    table: String,
    projection: Vec<String>,
    row_schema: Fields,
}

impl<S: Storage> SqlListingEngine<S> {
    pub fn new(storage: S, table: &str, row_schema: Fields) -> Self {
        Self {
            storage,
            projection: vec![format!("\"{table}\".*")],
            table: table.to_string(),
            row_schema,
        }
    }

    /// Override the projected columns (already-quoted SQL fragments).
    pub fn with_projection(mut self, projection: Vec<String>) -> Self {
        self.projection = projection;
        self
    }

    fn col(&self, name: &str) -> Expr {
        Expr::col((Alias::new(self.table.as_str()), Alias::new(name)))
    }

    /// Predicate for a date-part filter on the `created` column.
    fn date_part(&self, part: &str, value: u32) -> sea_query::SimpleExpr {
        Expr::cust_with_values(
            format!("EXTRACT({part} FROM \"{}\".\"created\") = $1", self.table),
            [i64::from(value)],
        )
    }

    /// The condition expressible with native parameters alone.
    fn native_condition(&self, params: &ListingParams) -> Condition {
        let mut cond = Cond::all();
        if let Some(id) = params.id {
            cond = cond.add(self.col("id").eq(id));
        }
        if !params.include.is_empty() {
            cond = cond.add(self.col("id").is_in(params.include.clone()));
        }
        if !params.exclude.is_empty() {
            cond = cond.add(self.col("id").is_not_in(params.exclude.clone()));
        }
        if let Some(slug) = &params.slug {
            cond = cond.add(self.col("slug").eq(slug.clone()));
        }
        if let Some(parent) = params.parent {
            cond = cond.add(self.col("parent_id").eq(parent));
        }
        if !params.parent_in.is_empty() {
            cond = cond.add(self.col("parent_id").is_in(params.parent_in.clone()));
        }
        if !params.parent_not_in.is_empty() {
            cond = cond.add(self.col("parent_id").is_not_in(params.parent_not_in.clone()));
        }
        if let Some(author) = params.author {
            cond = cond.add(self.col("author_id").eq(author));
        }
        if let Some(name) = &params.author_name {
            cond = cond.add(self.col("author_name").eq(name.clone()));
        }
        if !params.author_in.is_empty() {
            cond = cond.add(self.col("author_id").is_in(params.author_in.clone()));
        }
        if !params.author_not_in.is_empty() {
            cond = cond.add(self.col("author_id").is_not_in(params.author_not_in.clone()));
        }
        if let Some(year) = params.year {
            cond = cond.add(self.date_part("YEAR", year));
        }
        if let Some(month) = params.month {
            cond = cond.add(self.date_part("MONTH", month));
        }
        if let Some(week) = params.week {
            cond = cond.add(self.date_part("WEEK", week));
        }
        if let Some(day) = params.day {
            cond = cond.add(self.date_part("DAY", day));
        }
        if let Some(hour) = params.hour {
            cond = cond.add(self.date_part("HOUR", hour));
        }
        if let Some(minute) = params.minute {
            cond = cond.add(self.date_part("MINUTE", minute));
        }
        if let Some(second) = params.second {
            cond = cond.add(self.date_part("SECOND", second));
        }
        if let Some(yearmonth) = params.yearmonth {
            cond = cond.add(self.date_part("YEAR", yearmonth / 100));
            cond = cond.add(self.date_part("MONTH", yearmonth % 100));
        }
        if let Some(search) = params.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", escape_like_wildcards(search));
            cond = cond.add(self.col("title").ilike(pattern));
        }
        cond
    }

    fn order_text(&self, params: &ListingParams) -> Option<String> {
        let column = match params.orderby {
            ListingOrder::None => return None,
            ListingOrder::Random => return Some(" ORDER BY RANDOM()".to_string()),
            ListingOrder::Id => "id",
            ListingOrder::Title => "title",
            ListingOrder::Slug => "slug",
            ListingOrder::Date => "created",
            ListingOrder::Modified => "modified",
            ListingOrder::MenuOrder => "position",
        };
        let direction = match params.order {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        Some(format!(
            " ORDER BY \"{}\".\"{column}\" {direction}",
            self.table
        ))
    }

    /// Resolved `(limit, offset)` window, or `None` for an unbounded read.
    fn window(params: &ListingParams) -> Option<(u64, u64)> {
        if params.nopaging || params.per_page == 0 {
            return None;
        }
        let offset = if params.offset > 0 {
            params.offset
        } else {
            params.page.max(1).saturating_sub(1) * params.per_page
        };
        Some((params.per_page, offset))
    }

    fn projection_text(&self, params: &ListingParams) -> String {
        match params.fields {
            ListingFields::All => self.projection.join(", "),
            ListingFields::Ids => format!("\"{}\".\"id\"", self.table),
            ListingFields::IdParent => format!(
                "\"{0}\".\"id\", \"{0}\".\"parent_id\"",
                self.table
            ),
        }
    }

    /// Compose the final SELECT / COUNT / id-only statements.
    fn compose(&self, params: &ListingParams, modifiers: &QueryModifiers) -> (String, String, String) {
        let native = render_predicate(self.native_condition(params));
        let where_text = modifiers.apply_wheres(&native);
        let where_text = where_text
            .trim()
            .trim_start_matches("AND ")
            .trim()
            .to_string();
        let join_text = modifiers.apply_joins("");

        let from = format!("FROM \"{}\"{join_text}", self.table);
        let where_sql = if where_text.is_empty() {
            String::new()
        } else {
            format!(" WHERE {where_text}")
        };
        let order_sql = self.order_text(params).unwrap_or_default();
        let window_sql = Self::window(params)
            .map(|(limit, offset)| {
                if offset > 0 {
                    format!(" LIMIT {limit} OFFSET {offset}")
                } else {
                    format!(" LIMIT {limit}")
                }
            })
            .unwrap_or_default();

        let sql = format!(
            "SELECT {} {from}{where_sql}{order_sql}{window_sql}",
            self.projection_text(params)
        );
        let count_sql = format!("SELECT COUNT(*) {from}{where_sql}");
        let ids_sql = format!(
            "SELECT \"{}\".\"id\" {from}{where_sql}{order_sql}{window_sql}",
            self.table
        );
        (sql, count_sql, ids_sql)
    }
}

#[async_trait]
impl<S: Storage> ListingEngine for SqlListingEngine<S> {
    fn base_table(&self) -> &str {
        &self.table
    }

    async fn run(
        &self,
        params: &ListingParams,
        modifiers: &QueryModifiers,
    ) -> StoreResult<ListingPage> {
        let (sql, count_sql, ids_sql) = self.compose(params, modifiers);
        tracing::debug!(sql = %sql, "running listing query");

        let total = self.storage.fetch_scalar(&count_sql).await?;
        let rows = match params.fields {
            ListingFields::All | ListingFields::IdParent => {
                self.storage.fetch_rows(&sql, self.row_schema).await?
            }
            ListingFields::Ids => self
                .storage
                .fetch_ids(&sql)
                .await?
                .into_iter()
                .map(|id| {
                    let mut row = Row::new();
                    row.insert("id".to_string(), Value::Int(id));
                    row
                })
                .collect(),
        };

        let per_page = if params.nopaging { 0 } else { params.per_page };
        let total_pages = if per_page > 0 {
            (total.max(0) as u64).div_ceil(per_page)
        } else {
            u64::from(total > 0)
        };

        Ok(ListingPage {
            rows,
            total,
            total_pages,
            per_page,
            page: params.page.max(1),
            sql,
            ids_sql,
        })
    }

    async fn ids(&self, ids_sql: &str) -> StoreResult<Vec<i64>> {
        self.storage.fetch_ids(ids_sql).await
    }
}
