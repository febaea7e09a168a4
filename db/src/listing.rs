use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, QueryBuilder};

use crate::{dtos::listing::ListingFilter, models::listing::ResourceListing};

const LISTING_COLUMNS: &str = "id, name, short_description, long_description, category, \
    subcategories, city, state, is_remote, is_nationwide, cause_areas, website, is_featured";

pub async fn search_listings<'e, E>(executor: E, filter: &ListingFilter) -> Res<Vec<ResourceListing>>
where
    E: Executor<'e, Database = Postgres>,
{
    let mut qb = build_search_query(filter);
    qb.build_query_as::<ResourceListing>()
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

/// Total rows matching `filter`, ignoring pagination.
pub async fn count_listings<'e, E>(executor: E, filter: &ListingFilter) -> Res<i64>
where
    E: Executor<'e, Database = Postgres>,
{
    let mut qb = build_count_query(filter);
    qb.build_query_scalar::<i64>()
        .fetch_one(executor)
        .await
        .map_err(AppError::from)
}

pub(crate) fn build_search_query(filter: &ListingFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {} FROM resource_listings", LISTING_COLUMNS));
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY is_featured DESC, name ASC");
    qb.push(" LIMIT ").push_bind(filter.limit);
    qb.push(" OFFSET ").push_bind(filter.offset);
    qb
}

pub(crate) fn build_count_query(filter: &ListingFilter) -> QueryBuilder<'static, Postgres> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM resource_listings");
    push_filters(&mut qb, filter);
    qb
}

fn push_filters(qb: &mut QueryBuilder<'static, Postgres>, filter: &ListingFilter) {
    let mut conditions_added = false;

    // Helper to add WHERE or AND
    let mut add_condition_separator = |qb: &mut QueryBuilder<'static, Postgres>| {
        if !conditions_added {
            qb.push(" WHERE ");
            conditions_added = true;
        } else {
            qb.push(" AND ");
        }
    };

    if let Some(query) = &filter.query {
        let pattern = like_pattern(query);
        add_condition_separator(qb);
        qb.push("(name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR short_description ILIKE ").push_bind(pattern.clone());
        qb.push(" OR long_description ILIKE ").push_bind(pattern);
        qb.push(")");
    }

    if let Some(category) = &filter.category {
        add_condition_separator(qb);
        qb.push("category = ").push_bind(category.clone());
    }

    if let Some(state) = &filter.state {
        add_condition_separator(qb);
        qb.push("state = ").push_bind(state.clone());
    }

    if filter.remote_only {
        add_condition_separator(qb);
        qb.push("(is_remote = TRUE OR is_nationwide = TRUE)");
    }

    if !filter.cause_areas.is_empty() {
        add_condition_separator(qb);
        qb.push("cause_areas && ").push_bind(filter.cause_areas.clone());
    }

    if let Some(subcategory) = &filter.subcategory {
        add_condition_separator(qb);
        qb.push("subcategories @> ").push_bind(vec![subcategory.clone()]);
    }
}

/// `%term%` with LIKE metacharacters escaped so user input matches literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ListingFilter {
        ListingFilter {
            limit: 20,
            offset: 0,
            ..Default::default()
        }
    }

    #[test]
    fn no_filters_means_no_where_clause() {
        let qb = build_search_query(&filter());
        assert_eq!(
            qb.sql(),
            format!(
                "SELECT {} FROM resource_listings ORDER BY is_featured DESC, name ASC LIMIT $1 OFFSET $2",
                LISTING_COLUMNS
            )
        );
    }

    #[test]
    fn category_and_state_are_combined_with_and() {
        let qb = build_count_query(&ListingFilter {
            category: Some("grant".to_string()),
            state: Some("TX".to_string()),
            ..filter()
        });
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM resource_listings WHERE category = $1 AND state = $2"
        );
    }

    #[test]
    fn text_query_is_ored_across_descriptions() {
        let qb = build_count_query(&ListingFilter {
            query: Some("cowork".to_string()),
            remote_only: true,
            ..filter()
        });
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM resource_listings WHERE (name ILIKE $1 OR short_description ILIKE $2 \
             OR long_description ILIKE $3) AND (is_remote = TRUE OR is_nationwide = TRUE)"
        );
    }

    #[test]
    fn array_filters_use_overlap_and_containment() {
        let qb = build_count_query(&ListingFilter {
            cause_areas: vec!["climate".to_string(), "health".to_string()],
            subcategory: Some("seed".to_string()),
            ..filter()
        });
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM resource_listings WHERE cause_areas && $1 AND subcategories @> $2"
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
        assert_eq!(like_pattern("SBA"), "%SBA%");
    }
}
