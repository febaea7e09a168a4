use common::error::Res;
use db::{dtos::listing::ListingFilter, store::ListingStore};

use crate::dtos::search::{Pagination, SearchRequest, SearchResponse};

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Turns query parameters into store filters: blank values are dropped, the
/// page is 1-indexed and the page size is capped at [`MAX_LIMIT`].
pub fn to_filter(req: SearchRequest) -> (ListingFilter, i64) {
    let page = parse_number(req.page.as_deref())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = match parse_number(req.limit.as_deref()) {
        Some(limit) if limit >= 1 => limit.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    };

    let filter = ListingFilter {
        query: non_blank(req.query),
        category: non_blank(req.category),
        state: non_blank(req.state),
        remote_only: is_true(req.is_remote.as_deref()),
        cause_areas: req
            .cause_areas
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|area| !area.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        subcategory: non_blank(req.subcategory),
        limit,
        offset: (page - 1).saturating_mul(limit),
    };
    (filter, page)
}

pub async fn search(store: &dyn ListingStore, req: SearchRequest) -> Res<SearchResponse> {
    let (filter, page) = to_filter(req);
    let (listings, total) = store.search(&filter).await?;
    log::debug!(
        "Resource search matched {} listings (page {}, limit {})",
        total,
        page,
        filter.limit
    );

    Ok(SearchResponse {
        listings,
        pagination: Pagination {
            page,
            limit: filter.limit,
            total,
            total_pages: (total + filter.limit - 1) / filter.limit,
        },
    })
}

fn parse_number(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Only `true` (any case) turns a flag on.
fn is_true(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
