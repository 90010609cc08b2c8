//! Pagination link rendering.
//!
//! Produces the windowed page-number list markup: first/last pages are
//! always shown (`end_size`), a window of pages around the current one
//! (`mid_size`), ellipses in between, and previous/next arrows.

/// Which link scheme [`crate::query::MediaQuery::paginate`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaginationStyle {
    /// Page number embedded per the site's permalink configuration.
    #[default]
    Standard,
    /// Page number carried in an `mpage` query parameter on the current
    /// URL, leaving the site's own page parameter untouched.
    QueryParam,
}

/// Inputs for [`paginate_links`].
///
/// `base` contains a `%_%` placeholder replaced by `format`, which in turn
/// contains `%#%` for the page number. Page 1 links drop the format part
/// entirely.
#[derive(Debug, Clone)]
pub struct PaginateArgs<'a> {
    pub base: &'a str,
    pub format: &'a str,
    pub current: u64,
    pub total: u64,
    pub mid_size: u64,
    pub end_size: u64,
}

/// URL of one page under the base/format scheme.
fn page_link(base: &str, format: &str, page: u64) -> String {
    if page <= 1 {
        base.replace("%_%", "")
    } else {
        base.replace("%_%", &format.replace("%#%", &page.to_string()))
    }
}

/// Whether the page number is visible in the current window.
fn in_window(page: u64, current: u64, total: u64, mid_size: u64, end_size: u64) -> bool {
    page <= end_size
        || page > total.saturating_sub(end_size)
        || (page >= current.saturating_sub(mid_size) && page <= current + mid_size)
}

/// Render the windowed page list as `<ul class="page-numbers">` markup.
///
/// Returns `None` when there is at most one page.
pub fn paginate_links(args: &PaginateArgs) -> Option<String> {
    if args.total <= 1 {
        return None;
    }
    let current = args.current.clamp(1, args.total);

    let mut items = Vec::new();
    if current > 1 {
        items.push(format!(
            "<li><a class=\"prev page-numbers\" href=\"{}\">&laquo;</a></li>",
            page_link(args.base, args.format, current - 1)
        ));
    }

    let mut in_gap = false;
    for page in 1..=args.total {
        if !in_window(page, current, args.total, args.mid_size, args.end_size) {
            if !in_gap {
                items.push("<li><span class=\"page-numbers dots\">&hellip;</span></li>".to_string());
                in_gap = true;
            }
            continue;
        }
        in_gap = false;
        if page == current {
            items.push(format!(
                "<li><span aria-current=\"page\" class=\"page-numbers current\">{page}</span></li>"
            ));
        } else {
            items.push(format!(
                "<li><a class=\"page-numbers\" href=\"{}\">{page}</a></li>",
                page_link(args.base, args.format, page)
            ));
        }
    }

    if current < args.total {
        items.push(format!(
            "<li><a class=\"next page-numbers\" href=\"{}\">&raquo;</a></li>",
            page_link(args.base, args.format, current + 1)
        ));
    }

    Some(format!(
        "<ul class=\"page-numbers\">{}</ul>",
        items.join("")
    ))
}

/// "Viewing X to Y (of Z ...)" summary for the current page.
pub fn pagination_count(page: u64, per_page: u64, total: i64, label: &str) -> String {
    let total = total.max(0) as u64;
    let page = page.max(1);
    let from = (page - 1) * per_page + 1;
    let to = (from + per_page.saturating_sub(1)).min(total);
    format!("Viewing {from} to {to} (of {total} {label})")
}

/// Ensure the URL ends with exactly one slash.
pub fn trailingslash(url: &str) -> String {
    format!("{}/", url.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links(current: u64, total: u64) -> String {
        paginate_links(&PaginateArgs {
            base: "https://example.org/gallery/%_%",
            format: "page/%#%/",
            current,
            total,
            mid_size: 4,
            end_size: 1,
        })
        .unwrap_or_default()
    }

    #[test]
    fn single_page_renders_nothing() {
        assert!(
            paginate_links(&PaginateArgs {
                base: "/x/%_%",
                format: "page/%#%/",
                current: 1,
                total: 1,
                mid_size: 4,
                end_size: 1,
            })
            .is_none()
        );
    }

    #[test]
    fn first_page_has_no_prev_and_plain_base_link() {
        let html = links(1, 3);
        assert!(!html.contains("prev page-numbers"), "{html}");
        assert!(html.contains("class=\"page-numbers current\">1<"), "{html}");
        assert!(
            html.contains("href=\"https://example.org/gallery/page/2/\""),
            "{html}"
        );
        assert!(html.contains("next page-numbers"), "{html}");
    }

    #[test]
    fn middle_page_has_both_arrows() {
        let html = links(2, 3);
        assert!(html.contains("prev page-numbers"), "{html}");
        assert!(html.contains("next page-numbers"), "{html}");
        // Previous link is page 1: the base URL without the page segment.
        assert!(
            html.contains("class=\"prev page-numbers\" href=\"https://example.org/gallery/\""),
            "{html}"
        );
    }

    #[test]
    fn distant_pages_collapse_into_dots() {
        let html = links(10, 30);
        assert!(html.contains("dots"), "{html}");
        // End pages always visible.
        assert!(html.contains(">1<"), "{html}");
        assert!(html.contains(">30<"), "{html}");
        // Mid window: 6..=14 around the current page.
        assert!(html.contains(">6<"), "{html}");
        assert!(html.contains(">14<"), "{html}");
        assert!(!html.contains(">15<"), "{html}");
    }

    #[test]
    fn count_summary() {
        assert_eq!(
            pagination_count(3, 10, 47, "photos"),
            "Viewing 21 to 30 (of 47 photos)"
        );
        assert_eq!(
            pagination_count(5, 10, 47, "photos"),
            "Viewing 41 to 47 (of 47 photos)"
        );
    }

    #[test]
    fn trailingslash_normalizes() {
        assert_eq!(trailingslash("https://a/b"), "https://a/b/");
        assert_eq!(trailingslash("https://a/b/"), "https://a/b/");
    }
}
