use crate::handlers::common::{map_service_error, success_response, PaginationParams};
use crate::{
    cache::CachedValue,
    entities::{BrandModel, CategoryModel},
    errors::ApiError,
    services::catalog::ProductListQuery,
    AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::time::Duration;

const CATALOG_CACHE_TTL: Duration = Duration::from_secs(60);

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/slug/:slug", get(get_product_by_slug))
        .route("/:id", get(get_product))
}

pub fn categories_routes() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

pub fn brands_routes() -> Router<AppState> {
    Router::new().route("/", get(list_brands))
}

#[derive(Debug, Deserialize)]
pub struct ListProductsParams {
    // serde_urlencoded cannot deserialize numbers through #[serde(flatten)],
    // so pagination fields are inlined rather than embedding PaginationParams
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
}

/// Browse the catalog
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListProductsParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let pagination = PaginationParams {
        page: params.page.unwrap_or(1),
        per_page: params
            .per_page
            .unwrap_or(state.config.api_default_page_size as u64),
    }
    .clamped(state.config.api_max_page_size as u64);

    let query = ProductListQuery {
        page: pagination.page,
        per_page: pagination.per_page,
        category: params.category,
        brand: params.brand,
        search: params.search,
    };

    let (products, total) = state
        .services
        .catalog
        .list_products(query)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        products,
        total,
        pagination.page,
        pagination.per_page,
    )))
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

async fn get_product_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let product = state
        .services
        .catalog
        .get_product_by_slug(&slug)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Category listing, memoized for a minute: the tree changes rarely and the
/// storefront requests it on every page load.
async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cached: CachedValue<Vec<CategoryModel>> =
        CachedValue::new("catalog:categories", CATALOG_CACHE_TTL);

    let categories = cached
        .get_or_load(&*state.cache, || async {
            state.services.catalog.list_categories().await
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(categories))
}

async fn list_brands(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cached: CachedValue<Vec<BrandModel>> =
        CachedValue::new("catalog:brands", CATALOG_CACHE_TTL);

    let brands = cached
        .get_or_load(&*state.cache, || async {
            state.services.catalog.list_brands().await
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(brands))
}
