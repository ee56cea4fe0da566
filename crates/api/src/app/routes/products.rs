use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use catalog_core::ProductId;
use catalog_products::{ProductRequest, SortField};

use crate::app::dto::{
    CategoryCount, CategoryParams, InStockParams, LowStockParams, PageParams, PriceRangeParams,
    SearchParams,
};
use crate::app::errors;
use crate::app::services::AppServices;

type Params<T> = Result<Query<T>, QueryRejection>;
type Body<T> = Result<Json<T>, JsonRejection>;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/search", get(search_products))
        .route("/active", get(active_products))
        .route("/categories", get(all_categories))
        .route("/price-range", get(products_by_price_range))
        .route("/low-stock", get(low_stock_products))
        .route("/in-stock", get(in_stock_products))
        .route("/code/:code", get(get_product_by_code))
        .route("/category/:category", get(products_by_category))
        .route("/category/:category/active-count", get(count_active_in_category))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

fn parse_id(raw: &str) -> Result<ProductId, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id")
    })
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    body: Body<ProductRequest>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.products.create(body).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.get_by_id(id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product_by_code(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    match services.products.get_by_code(&code).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    body: Body<ProductRequest>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::body_rejection(e),
    };

    match services.products.update(id, body).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.products.delete(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    paging: Params<PageParams>,
) -> axum::response::Response {
    let request = match paging {
        Ok(Query(p)) => p.into_request(SortField::Id),
        Err(e) => return errors::query_rejection(e),
    };
    let request = match request {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.list(request).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn search_products(
    Extension(services): Extension<Arc<AppServices>>,
    search: Params<SearchParams>,
    paging: Params<PageParams>,
) -> axum::response::Response {
    let (Query(search), Query(paging)) = match (search, paging) {
        (Ok(s), Ok(p)) => (s, p),
        (Err(e), _) | (_, Err(e)) => return errors::query_rejection(e),
    };
    let request = match paging.into_request(SortField::Name) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.search(&search.q, request).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn products_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
    filter: Params<CategoryParams>,
    paging: Params<PageParams>,
) -> axum::response::Response {
    let (Query(filter), Query(paging)) = match (filter, paging) {
        (Ok(f), Ok(p)) => (f, p),
        (Err(e), _) | (_, Err(e)) => return errors::query_rejection(e),
    };
    let request = match paging.into_request(SortField::Name) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .products
        .by_category(&category, filter.active, request)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn count_active_in_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(category): Path<String>,
) -> axum::response::Response {
    match services.products.count_active_in_category(&category).await {
        Ok(count) => (StatusCode::OK, Json(CategoryCount { category, count })).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn products_by_price_range(
    Extension(services): Extension<Arc<AppServices>>,
    range: Params<PriceRangeParams>,
    paging: Params<PageParams>,
) -> axum::response::Response {
    let (Query(range), Query(paging)) = match (range, paging) {
        (Ok(r), Ok(p)) => (r, p),
        (Err(e), _) | (_, Err(e)) => return errors::query_rejection(e),
    };
    let (min, max) = match range.bounds() {
        Ok(b) => b,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let request = match paging.into_request(SortField::Price) {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.by_price_range(min, max, request).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn active_products(
    Extension(services): Extension<Arc<AppServices>>,
    paging: Params<PageParams>,
) -> axum::response::Response {
    let request = match paging {
        Ok(Query(p)) => p.into_request(SortField::Name),
        Err(e) => return errors::query_rejection(e),
    };
    let request = match request {
        Ok(r) => r,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.products.active_only(request).await {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn all_categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.products.all_categories().await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn low_stock_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Params<LowStockParams>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };

    match services.products.low_stock(params.threshold).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn in_stock_products(
    Extension(services): Extension<Arc<AppServices>>,
    params: Params<InStockParams>,
) -> axum::response::Response {
    let Query(params) = match params {
        Ok(p) => p,
        Err(e) => return errors::query_rejection(e),
    };

    match services.products.in_stock(params.above).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
