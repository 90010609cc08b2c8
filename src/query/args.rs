//! Media query arguments and their translation to listing parameters.
//!
//! Callers hand in a loose [`MediaQueryArgs`] map (often deserialized from
//! request input); [`build_params`] merges it over the declared defaults and
//! produces the engine's native [`ListingParams`] plus the [`MediaFilter`]
//! that cannot be expressed natively and has to be injected.

use serde::Deserialize;

use crate::options::{MEDIA_PER_PAGE, Options};
use crate::query::listing::{ListingFields, ListingOrder, ListingParams, SortDirection};
use crate::query::registry::MediaRegistry;

/// One or more strings, accepted as a comma-joined string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringList {
    Csv(String),
    List(Vec<String>),
}

impl Default for StringList {
    fn default() -> Self {
        StringList::List(Vec::new())
    }
}

impl StringList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StringList::List(values) => values
                .iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect(),
            StringList::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_vec().is_empty()
    }
}

impl From<Vec<&str>> for StringList {
    fn from(values: Vec<&str>) -> Self {
        StringList::List(values.into_iter().map(String::from).collect())
    }
}

impl From<&str> for StringList {
    fn from(csv: &str) -> Self {
        StringList::Csv(csv.to_string())
    }
}

/// One or more ids, accepted as a comma-joined string or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IdList {
    Csv(String),
    List(Vec<i64>),
}

impl Default for IdList {
    fn default() -> Self {
        IdList::List(Vec::new())
    }
}

impl IdList {
    pub fn to_vec(&self) -> Vec<i64> {
        match self {
            IdList::List(values) => values.clone(),
            IdList::Csv(csv) => csv
                .split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_vec().is_empty()
    }
}

impl From<Vec<i64>> for IdList {
    fn from(values: Vec<i64>) -> Self {
        IdList::List(values)
    }
}

/// Caller-facing filter map for a media query.
///
/// Every field is optional; unspecified filters fall back to the declared
/// defaults (active type/status/component sets, configured page size).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaQueryArgs {
    /// A single media id.
    pub id: Option<i64>,
    /// Specific media ids to include.
    #[serde(alias = "in")]
    pub include: IdList,
    /// Media ids to exclude.
    pub exclude: IdList,
    /// Media slug.
    pub slug: Option<String>,

    #[serde(rename = "type")]
    pub media_type: Option<StringList>,
    pub status: Option<StringList>,
    pub component: Option<StringList>,
    pub component_id: IdList,

    /// Single-gallery filter.
    pub gallery_id: Option<i64>,
    pub galleries: IdList,
    pub galleries_exclude: IdList,

    /// Storage backend identifier (`local`, `oembed`, ...).
    pub storage: Option<String>,
    /// Usage context the media was added under.
    pub context: Option<String>,

    pub per_page: Option<u64>,
    pub offset: Option<u64>,
    pub page: Option<u64>,
    pub nopaging: bool,

    pub order: SortDirection,
    pub orderby: Option<ListingOrder>,

    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub include_users: IdList,
    pub exclude_users: IdList,
    pub search_terms: Option<String>,

    pub year: Option<u32>,
    pub month: Option<u32>,
    pub week: Option<u32>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
    pub minute: Option<u32>,
    pub second: Option<u32>,
    pub yearmonth: Option<u32>,

    pub fields: ListingFields,

    pub is_remote: bool,
    pub is_raw: bool,
    pub is_oembed: bool,
}

/// Request-scoped ambient input: the current URL and the page-number
/// request parameter, passed explicitly instead of read from globals.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Value of the `mpage` request parameter, when present.
    pub page_param: Option<u64>,
    /// The URL of the request being served, used for pagination links.
    pub current_url: String,
}

/// Filters the listing engine cannot express natively; injected as an extra
/// join plus WHERE predicates.
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    pub types: Vec<String>,
    pub statuses: Vec<String>,
    pub components: Vec<String>,
    pub component_ids: Vec<i64>,
    pub storage: Option<String>,
    pub context: Option<String>,
    pub is_remote: bool,
    pub is_raw: bool,
    pub is_oembed: bool,
}

/// Merge caller args over the defaults and translate to native parameters.
///
/// The returned parameter set is tagged `mapped`, so re-entrant calls and
/// unrelated listings skip the injection step.
pub fn build_params(
    args: &MediaQueryArgs,
    registry: &MediaRegistry,
    options: &dyn Options,
    request: &RequestContext,
) -> (ListingParams, MediaFilter) {
    // Single-gallery queries over a manually sorted gallery default to the
    // manual order instead of date.
    let mut default_orderby = ListingOrder::Date;
    if let Some(gallery_id) = args.gallery_id
        && registry.is_gallery_sorted(gallery_id)
    {
        default_orderby = ListingOrder::MenuOrder;
    }

    let params = ListingParams {
        id: args.id,
        include: args.include.to_vec(),
        exclude: args.exclude.to_vec(),
        slug: args.slug.clone(),
        parent: args.gallery_id,
        parent_in: args.galleries.to_vec(),
        parent_not_in: args.galleries_exclude.to_vec(),
        author: args.user_id,
        author_name: args.user_name.clone(),
        author_in: args.include_users.to_vec(),
        author_not_in: args.exclude_users.to_vec(),
        year: args.year,
        month: args.month,
        week: args.week,
        day: args.day,
        hour: args.hour,
        minute: args.minute,
        second: args.second,
        yearmonth: args.yearmonth,
        search: args.search_terms.clone(),
        per_page: args
            .per_page
            .unwrap_or_else(|| options.get_u64(MEDIA_PER_PAGE, 10)),
        page: args.page.or(request.page_param).unwrap_or(0),
        offset: args.offset.unwrap_or(0),
        nopaging: args.nopaging,
        order: args.order,
        orderby: args.orderby.unwrap_or(default_orderby),
        fields: args.fields,
        mapped: true,
    };

    let filter = MediaFilter {
        types: args
            .media_type
            .as_ref()
            .map(StringList::to_vec)
            .unwrap_or_else(|| registry.active_types().to_vec()),
        statuses: args
            .status
            .as_ref()
            .map(StringList::to_vec)
            .unwrap_or_else(|| registry.active_statuses().to_vec()),
        components: args
            .component
            .as_ref()
            .map(StringList::to_vec)
            .unwrap_or_else(|| registry.active_components().to_vec()),
        component_ids: args.component_id.to_vec(),
        storage: args.storage.clone().filter(|s| !s.is_empty()),
        context: args.context.clone().filter(|s| !s.is_empty()),
        is_remote: args.is_remote,
        is_raw: args.is_raw,
        is_oembed: args.is_oembed,
    };

    (params, filter)
}
