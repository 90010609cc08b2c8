//! Filtered result-set query over the listing engine.
//!
//! [`MediaQuery`] translates media-domain filters into the listing engine's
//! native parameters, injects a join against the media table plus the
//! predicates the engine cannot express, runs the composed query once and
//! then exposes cursor iteration, pagination rendering and key extraction
//! over the result.

pub mod args;
pub mod listing;
pub mod pagination;
pub mod registry;

use std::sync::Arc;

use sea_query::{Alias, Cond, Expr};

use crate::entity::Entity;
use crate::error::StoreResult;
use crate::mapper::clause::render_predicate;
use crate::models::MediaItem;
use crate::options::{Options, PERMALINK_STRUCTURE, SHOW_ORPHANED_MEDIA};
use crate::schema::MEDIA_TABLE;

pub use args::{MediaFilter, MediaQueryArgs, RequestContext, build_params};
pub use listing::{
    ClauseModifier, ListingEngine, ListingFields, ListingOrder, ListingPage, ListingParams,
    QueryModifiers, SortDirection, SqlListingEngine,
};
pub use pagination::{PaginationStyle, paginate_links, pagination_count};
pub use registry::MediaRegistry;

/// Request-scoped "current item" state, passed explicitly to the helpers
/// that need the active query's position.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    pub current_media: Option<MediaItem>,
}

type LoopStartHook = Box<dyn FnMut() + Send>;

/// A stateful, single-request media query.
///
/// One instance belongs to exactly one in-flight request; the cursor
/// methods take `&mut self`, so concurrent cursor mutation is ruled out at
/// compile time.
pub struct MediaQuery {
    engine: Arc<dyn ListingEngine>,
    registry: Arc<MediaRegistry>,
    options: Arc<dyn Options>,
    extra: QueryModifiers,
    on_loop_start: Option<LoopStartHook>,
    items: Vec<MediaItem>,
    current: isize,
    in_loop: bool,
    total: i64,
    total_pages: u64,
    per_page: u64,
    page: u64,
    sql: String,
    ids_sql: String,
}

impl MediaQuery {
    pub fn new(
        engine: Arc<dyn ListingEngine>,
        registry: Arc<MediaRegistry>,
        options: Arc<dyn Options>,
    ) -> Self {
        Self {
            engine,
            registry,
            options,
            extra: QueryModifiers::new(),
            on_loop_start: None,
            items: Vec::new(),
            current: -1,
            in_loop: false,
            total: 0,
            total_pages: 0,
            per_page: 0,
            page: 1,
            sql: String::new(),
            ids_sql: String::new(),
        }
    }

    /// Extension point: additional modifiers appended after this query's
    /// own join/where injection, scoped to this instance only.
    pub fn with_modifiers(&mut self, modifiers: &QueryModifiers) -> &mut Self {
        self.extra.extend(modifiers);
        self
    }

    /// Hook fired once, on the very first [`MediaQuery::advance`] of a run.
    pub fn on_loop_start(&mut self, hook: LoopStartHook) -> &mut Self {
        self.on_loop_start = Some(hook);
        self
    }

    /// Build and execute the query.
    ///
    /// Filters the engine understands travel as native parameters; the rest
    /// are injected as a media-table join plus WHERE predicates. Injection
    /// only happens for parameter sets this query mapped itself, so other
    /// listings sharing the engine are never touched.
    pub async fn run(
        &mut self,
        query_args: &MediaQueryArgs,
        request: &RequestContext,
    ) -> StoreResult<()> {
        let (params, filter) =
            build_params(query_args, &self.registry, self.options.as_ref(), request);

        let mut modifiers = QueryModifiers::new();
        if params.mapped {
            self.install_media_filters(&mut modifiers, &filter);
        }
        modifiers.extend(&self.extra);

        let page = self.engine.run(&params, &modifiers).await?;
        tracing::debug!(total = page.total, pages = page.total_pages, "media query ran");

        self.items = page.rows.iter().map(MediaItem::to_object).collect();
        self.current = -1;
        self.in_loop = false;
        self.total = page.total;
        self.total_pages = page.total_pages;
        self.per_page = page.per_page;
        self.page = page.page;
        self.sql = page.sql;
        self.ids_sql = page.ids_sql;
        Ok(())
    }

    /// Add the media-table join and the domain predicates to the modifier
    /// set for this call.
    fn install_media_filters(&self, modifiers: &mut QueryModifiers, filter: &MediaFilter) {
        let on = format!(
            "\"{MEDIA_TABLE}\".\"media_id\" = \"{}\".\"id\"",
            self.engine.base_table()
        );
        modifiers.join(Arc::new(move |join: &str| {
            format!("{join} INNER JOIN \"{MEDIA_TABLE}\" ON {on}")
        }));

        let predicates = self.media_predicates(filter);
        modifiers.filter(Arc::new(move |clause: &str| {
            let mut out = clause.to_string();
            for predicate in &predicates {
                out.push_str(" AND ");
                out.push_str(predicate);
            }
            out
        }));
    }

    /// The WHERE predicates not expressible as native listing parameters,
    /// rendered through the query builder so values keep their escaping.
    fn media_predicates(&self, filter: &MediaFilter) -> Vec<String> {
        let col = |name: &str| Expr::col((Alias::new(MEDIA_TABLE), Alias::new(name)));
        let mut predicates = Vec::new();
        let mut push = |expr: sea_query::SimpleExpr| {
            predicates.push(render_predicate(Cond::all().add(expr)));
        };

        if !filter.types.is_empty() {
            push(col("type").is_in(filter.types.clone()));
        }
        if !filter.statuses.is_empty() {
            push(col("status").is_in(filter.statuses.clone()));
        }
        if !filter.components.is_empty() {
            push(col("component").is_in(filter.components.clone()));
        }
        if !filter.component_ids.is_empty() {
            push(col("component_id").is_in(filter.component_ids.clone()));
        }
        if let Some(storage) = &filter.storage {
            push(col("storage").eq(storage.clone()));
        }
        if let Some(context) = &filter.context {
            push(col("context").eq(context.clone()));
        }
        // Orphaned rows stay invisible unless the host opts in.
        if !self.options.get_bool(SHOW_ORPHANED_MEDIA) {
            push(col("is_orphan").ne(true));
        }
        if filter.is_remote {
            push(col("is_remote").eq(true));
        }
        if filter.is_raw {
            push(col("is_raw").eq(true));
        }
        if filter.is_oembed {
            push(col("is_oembed").eq(true));
        }
        predicates
    }

    /// The fetched page of media items.
    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    /// Total matching rows across all pages.
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Total page count.
    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// The executed SELECT text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether the cursor loop has started.
    pub fn in_loop(&self) -> bool {
        self.in_loop
    }

    /// Whether another item remains ahead of the cursor.
    pub fn has_more(&self) -> bool {
        self.current + 1 < self.items.len() as isize
    }

    /// Move the cursor forward and make that item the context's current
    /// one. Fires the loop-start hook on the first advance of a run.
    pub fn advance(&mut self, ctx: &mut QueryContext) -> Option<&MediaItem> {
        if !self.has_more() {
            return None;
        }
        if self.current == -1 {
            self.in_loop = true;
            if let Some(hook) = self.on_loop_start.as_mut() {
                hook();
            }
        }
        self.current += 1;
        let item = &self.items[self.current as usize];
        ctx.current_media = Some(item.clone());
        Some(item)
    }

    /// Move the cursor one step back. No-op before the second item.
    pub fn step_back(&mut self) -> Option<&MediaItem> {
        if self.current <= 0 {
            return None;
        }
        self.current -= 1;
        self.items.get(self.current as usize)
    }

    /// Put the cursor back before the first item.
    pub fn rewind(&mut self) {
        self.current = -1;
    }

    /// Clear the cursor and restore the context's current item to the head
    /// of this query's result.
    pub fn reset(&mut self, ctx: &mut QueryContext) {
        self.rewind();
        self.in_loop = false;
        ctx.current_media = self.items.first().cloned();
    }

    /// Re-derive just the matching media ids from the executed query.
    pub async fn ids(&self) -> StoreResult<Vec<i64>> {
        if self.ids_sql.is_empty() {
            return Ok(Vec::new());
        }
        self.engine.ids(&self.ids_sql).await
    }

    /// Render pagination links for the executed query.
    ///
    /// Returns `None` when everything fits on one page. The standard style
    /// follows the site's permalink configuration; the query-param style
    /// pins the page number to an `mpage` parameter on the current URL.
    pub fn paginate(&self, style: PaginationStyle, request: &RequestContext) -> Option<String> {
        if self.total_pages <= 1 {
            return None;
        }

        let (base, format, current) = match style {
            PaginationStyle::Standard => {
                let pretty = self
                    .options
                    .get_str(PERMALINK_STRUCTURE)
                    .is_some_and(|s| !s.is_empty());
                let format = if pretty { "page/%#%/" } else { "&page=%#%" };
                let base = format!("{}%_%", pagination::trailingslash(&request.current_url));
                (base, format.to_string(), self.page.max(1))
            }
            PaginationStyle::QueryParam => {
                let current = request.page_param.filter(|p| *p > 0).unwrap_or(1);
                let link = request.current_url.split('?').next().unwrap_or_default();
                let base = format!("{}%_%", pagination::trailingslash(link));
                (base, "?mpage=%#%".to_string(), current)
            }
        };

        paginate_links(&pagination::PaginateArgs {
            base: &base,
            format: &format,
            current,
            total: self.total_pages,
            mid_size: 4,
            end_size: 1,
        })
    }

    /// "Viewing X to Y (of Z ...)" summary for the current page.
    pub fn pagination_count(&self, label: &str) -> String {
        pagination_count(self.page, self.per_page, self.total, label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Entity, Row, Value};
    use crate::options::{MEDIA_PER_PAGE, MemoryOptions};
    use crate::schema::Fields;
    use crate::store::Storage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct FakeStorage {
        rows: Vec<Row>,
        total: i64,
        ids: Vec<i64>,
    }

    #[async_trait]
    impl Storage for FakeStorage {
        async fn fetch_rows(&self, _sql: &str, _schema: Fields) -> StoreResult<Vec<Row>> {
            Ok(self.rows.clone())
        }

        async fn fetch_optional(&self, _sql: &str, _schema: Fields) -> StoreResult<Option<Row>> {
            Ok(self.rows.first().cloned())
        }

        async fn fetch_scalar(&self, _sql: &str) -> StoreResult<i64> {
            Ok(self.total)
        }

        async fn fetch_ids(&self, _sql: &str) -> StoreResult<Vec<i64>> {
            Ok(self.ids.clone())
        }

        async fn execute(&self, _sql: &str) -> StoreResult<u64> {
            Ok(0)
        }

        async fn insert(&self, _sql: &str) -> StoreResult<i64> {
            Ok(0)
        }
    }

    fn media_row(media_id: i64, media_type: &str) -> Row {
        let mut row = Row::new();
        row.insert("media_id".to_string(), Value::Int(media_id));
        row.insert("type".to_string(), Value::Str(media_type.to_string()));
        row.insert("status".to_string(), Value::Str("public".to_string()));
        row
    }

    fn registry() -> Arc<MediaRegistry> {
        let mut registry = MediaRegistry::new();
        registry
            .register_type("photo")
            .register_type("video")
            .register_status("public")
            .register_status("private")
            .register_component("members")
            .register_component("groups");
        Arc::new(registry)
    }

    fn query_with(storage: FakeStorage, options: MemoryOptions) -> MediaQuery {
        let engine = SqlListingEngine::new(storage, "item", MediaItem::schema())
            .with_projection(vec![format!("\"{MEDIA_TABLE}\".*")]);
        MediaQuery::new(Arc::new(engine), registry(), Arc::new(options))
    }

    fn query(storage: FakeStorage) -> MediaQuery {
        query_with(storage, MemoryOptions::new())
    }

    #[tokio::test]
    async fn mapped_query_injects_join_and_orphan_default() {
        let mut q = query(FakeStorage::default());
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();

        let sql = q.sql();
        assert!(
            sql.contains(
                "INNER JOIN \"media_item\" ON \"media_item\".\"media_id\" = \"item\".\"id\""
            ),
            "{sql}"
        );
        assert!(sql.contains("\"media_item\".\"is_orphan\" <> TRUE"), "{sql}");
        assert!(
            sql.contains("\"media_item\".\"type\" IN ('photo', 'video')"),
            "{sql}"
        );
        assert!(
            sql.contains("\"media_item\".\"status\" IN ('public', 'private')"),
            "{sql}"
        );
    }

    #[tokio::test]
    async fn orphan_predicate_suppressed_by_option() {
        let mut options = MemoryOptions::new();
        options.set(SHOW_ORPHANED_MEDIA, true);
        let mut q = query_with(FakeStorage::default(), options);
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();

        assert!(!q.sql().contains("is_orphan"), "{}", q.sql());
    }

    #[tokio::test]
    async fn component_scenario_compiles_scoped_page() {
        let mut q = query(FakeStorage::default());
        let args = MediaQueryArgs {
            component: Some(args::StringList::from(vec!["groups"])),
            component_id: args::IdList::from(vec![42]),
            status: Some(args::StringList::from(vec!["public"])),
            per_page: Some(5),
            page: Some(1),
            ..MediaQueryArgs::default()
        };
        q.run(&args, &RequestContext::default()).await.unwrap();

        let sql = q.sql();
        assert!(sql.contains("\"media_item\".\"component\" IN ('groups')"), "{sql}");
        assert!(sql.contains("\"media_item\".\"component_id\" IN (42)"), "{sql}");
        assert!(sql.contains("\"media_item\".\"status\" IN ('public')"), "{sql}");
        assert!(sql.contains("\"media_item\".\"is_orphan\" <> TRUE"), "{sql}");
        assert!(sql.contains("LIMIT 5"), "{sql}");
        assert!(!sql.contains("OFFSET"), "{sql}");
    }

    #[tokio::test]
    async fn extra_modifiers_run_after_builtin_injection() {
        let mut q = query(FakeStorage::default());
        let mut extra = QueryModifiers::new();
        extra.filter(Arc::new(|clause: &str| {
            format!("{clause} AND \"media_item\".\"source\" <> ''")
        }));
        q.with_modifiers(&extra);
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();

        let sql = q.sql();
        let orphan = sql.find("is_orphan").unwrap();
        let source = sql.find("\"source\"").unwrap();
        assert!(orphan < source, "{sql}");
    }

    #[tokio::test]
    async fn cursor_visits_each_item_once_in_order() {
        let storage = FakeStorage {
            rows: vec![media_row(1, "photo"), media_row(2, "photo"), media_row(3, "video")],
            total: 3,
            ..FakeStorage::default()
        };
        let mut q = query(storage);
        let starts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&starts);
        q.on_loop_start(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();

        let mut ctx = QueryContext::default();
        let mut seen = Vec::new();
        while q.has_more() {
            let item = q.advance(&mut ctx).unwrap();
            seen.push(item.media_id);
        }
        assert_eq!(seen, [1, 2, 3]);
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(q.advance(&mut ctx).is_none());
        assert_eq!(ctx.current_media.as_ref().map(|m| m.media_id), Some(3));
    }

    #[tokio::test]
    async fn step_back_is_noop_at_the_boundary() {
        let storage = FakeStorage {
            rows: vec![media_row(1, "photo"), media_row(2, "photo")],
            total: 2,
            ..FakeStorage::default()
        };
        let mut q = query(storage);
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();

        assert!(q.step_back().is_none());

        let mut ctx = QueryContext::default();
        q.advance(&mut ctx);
        // After a single advance there is nothing earlier to step to.
        assert!(q.step_back().is_none());

        q.advance(&mut ctx);
        assert_eq!(q.step_back().map(|m| m.media_id), Some(1));
    }

    #[tokio::test]
    async fn rewind_restarts_and_reset_restores_context() {
        let storage = FakeStorage {
            rows: vec![media_row(7, "photo"), media_row(8, "photo")],
            total: 2,
            ..FakeStorage::default()
        };
        let mut q = query(storage);
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();

        let mut ctx = QueryContext::default();
        q.advance(&mut ctx);
        q.advance(&mut ctx);
        q.rewind();
        assert_eq!(q.advance(&mut ctx).map(|m| m.media_id), Some(7));

        q.reset(&mut ctx);
        assert!(!q.in_loop());
        assert_eq!(ctx.current_media.as_ref().map(|m| m.media_id), Some(7));
        assert!(q.has_more());
    }

    #[tokio::test]
    async fn ids_rederives_keys() {
        let storage = FakeStorage {
            ids: vec![11, 12],
            ..FakeStorage::default()
        };
        let mut q = query(storage);
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();
        assert_eq!(q.ids().await.unwrap(), [11, 12]);
    }

    #[tokio::test]
    async fn ids_without_a_run_is_empty() {
        let q = query(FakeStorage::default());
        assert!(q.ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn paginate_standard_pretty_permalinks() {
        let mut options = MemoryOptions::new();
        options
            .set(MEDIA_PER_PAGE, 10)
            .set(PERMALINK_STRUCTURE, "/%postname%/");
        let storage = FakeStorage {
            total: 35,
            ..FakeStorage::default()
        };
        let mut q = query_with(storage, options);
        q.run(
            &MediaQueryArgs {
                page: Some(2),
                ..MediaQueryArgs::default()
            },
            &RequestContext::default(),
        )
        .await
        .unwrap();

        let request = RequestContext {
            page_param: None,
            current_url: "https://example.org/gallery".to_string(),
        };
        let html = q.paginate(PaginationStyle::Standard, &request).unwrap();
        assert!(
            html.contains("https://example.org/gallery/page/3/"),
            "{html}"
        );
        assert!(html.contains("class=\"page-numbers current\">2<"), "{html}");
    }

    #[tokio::test]
    async fn paginate_query_param_style_strips_url_query() {
        let storage = FakeStorage {
            total: 35,
            ..FakeStorage::default()
        };
        let mut q = query(storage);
        let request = RequestContext {
            page_param: Some(2),
            current_url: "https://example.org/members/photos?tab=media".to_string(),
        };
        q.run(&MediaQueryArgs::default(), &request).await.unwrap();

        let html = q.paginate(PaginationStyle::QueryParam, &request).unwrap();
        assert!(
            html.contains("https://example.org/members/photos/?mpage=3"),
            "{html}"
        );
        assert!(!html.contains("tab=media"), "{html}");
    }

    #[tokio::test]
    async fn paginate_suppressed_for_single_page() {
        let storage = FakeStorage {
            total: 3,
            ..FakeStorage::default()
        };
        let mut q = query(storage);
        q.run(&MediaQueryArgs::default(), &RequestContext::default())
            .await
            .unwrap();
        assert!(
            q.paginate(PaginationStyle::Standard, &RequestContext::default())
                .is_none()
        );
    }

    #[tokio::test]
    async fn pagination_count_summary() {
        let storage = FakeStorage {
            total: 47,
            ..FakeStorage::default()
        };
        let mut q = query(storage);
        q.run(
            &MediaQueryArgs {
                per_page: Some(10),
                page: Some(3),
                ..MediaQueryArgs::default()
            },
            &RequestContext::default(),
        )
        .await
        .unwrap();
        assert_eq!(q.pagination_count("photos"), "Viewing 21 to 30 (of 47 photos)");
    }
}
