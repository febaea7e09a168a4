use std::sync::Arc;

use actix_web::{HttpResponse, get, web};
use common::{error::Res, http::Success};
use db::store::ListingStore;

use crate::{dtos::search::SearchRequest, services};

/// Searches the entrepreneurship resource directory.
///
/// # Query parameters
/// `query, category, state, is_remote, cause_areas (csv), subcategory, page, limit`
///
/// # Output
/// `{listings: [...], pagination: {page, limit, total, totalPages}}`
#[get("")]
pub async fn get_resources(
    store: web::Data<Arc<dyn ListingStore>>,
    req: web::Query<SearchRequest>,
) -> Res<HttpResponse> {
    let response = services::search::search(store.get_ref().as_ref(), req.into_inner()).await?;
    Success::ok(response)
}

#[cfg(test)]
mod tests {
    use actix_web::{App, http::StatusCode, test::{self as http_test}};
    use db::{memory::MemoryStore, models::listing::ResourceListing};
    use serde_json::Value;
    use uuid::Uuid;

    use super::*;

    fn listing(name: &str) -> ResourceListing {
        ResourceListing {
            id: Uuid::new_v4(),
            name: name.to_string(),
            short_description: None,
            long_description: None,
            category: "grant".to_string(),
            subcategories: Vec::new(),
            city: None,
            state: Some("TX".to_string()),
            is_remote: false,
            is_nationwide: false,
            cause_areas: Vec::new(),
            website: None,
            is_featured: false,
        }
    }

    #[actix_web::test]
    async fn query_string_is_translated() {
        let climate = ResourceListing {
            short_description: Some("Grants for climate founders".to_string()),
            subcategories: vec!["seed".to_string()],
            city: Some("Houston".to_string()),
            cause_areas: vec!["climate".to_string()],
            ..listing("Houston Climate Fund")
        };
        let store: Arc<dyn ListingStore> = Arc::new(MemoryStore::new().with_listings(vec![climate]));
        let app = http_test::init_service(
            App::new()
                .app_data(web::Data::new(store))
                .service(crate::mount_resources()),
        )
        .await;

        let req = http_test::TestRequest::get()
            .uri("/resources?query=CLIMATE&state=TX&cause_areas=health,climate&subcategory=seed&page=1&limit=10")
            .to_request();
        let res = http_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = http_test::read_body_json(res).await;
        assert_eq!(body["listings"][0]["name"], "Houston Climate Fund");
        assert_eq!(body["listings"][0]["causeAreas"][0], "climate");
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["pagination"]["totalPages"], 1);

        let req = http_test::TestRequest::get()
            .uri("/resources?category=coworking")
            .to_request();
        let body: Value = http_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["listings"].as_array().map(Vec::len), Some(0));
        assert_eq!(body["pagination"]["totalPages"], 0);
    }

    #[actix_web::test]
    async fn malformed_numbers_and_flags_fall_back_to_defaults() {
        let mut remote = listing("Remote Founders Fund");
        remote.is_remote = true;
        let store: Arc<dyn ListingStore> = Arc::new(
            MemoryStore::new().with_listings(vec![listing("Austin Cowork"), remote]),
        );
        let app = http_test::init_service(
            App::new()
                .app_data(web::Data::new(store))
                .service(crate::mount_resources()),
        )
        .await;

        for uri in [
            "/resources?page=abc",
            "/resources?limit=",
            "/resources?is_remote=1",
            "/resources?page=-4&limit=many&is_remote=maybe",
        ] {
            let req = http_test::TestRequest::get().uri(uri).to_request();
            let res = http_test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::OK, "{}", uri);
            let body: Value = http_test::read_body_json(res).await;
            assert_eq!(body["pagination"]["page"], 1, "{}", uri);
            assert_eq!(body["pagination"]["limit"], 20, "{}", uri);
            assert_eq!(body["pagination"]["total"], 2, "{}", uri);
        }

        let req = http_test::TestRequest::get()
            .uri("/resources?is_remote=true")
            .to_request();
        let body: Value = http_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["pagination"]["total"], 1);
        assert_eq!(body["listings"][0]["name"], "Remote Founders Fund");
    }

    #[actix_web::test]
    async fn store_failure_is_a_500() {
        let memory = MemoryStore::new();
        memory.fail_reads(true);
        let store: Arc<dyn ListingStore> = Arc::new(memory);
        let app = http_test::init_service(
            App::new()
                .app_data(web::Data::new(store))
                .service(crate::mount_resources()),
        )
        .await;

        let req = http_test::TestRequest::get().uri("/resources").to_request();
        assert_eq!(
            http_test::call_service(&app, req).await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
