use crate::handlers::common::{
    created_response, map_service_error, success_response, validate_input, PaginationParams,
};
use crate::{
    entities::DiscountType,
    errors::ApiError,
    services::coupons::CreateCouponInput,
    AppState, PaginatedResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use validator::Validate;

/// Creates the router for coupon endpoints
pub fn coupons_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_coupon).get(list_coupons))
        .route("/valid", get(list_valid_coupons))
        .route("/validate", post(validate_coupon))
        .route("/:code", get(get_coupon))
        .route("/:code/redeem", post(redeem_coupon))
}

/// Create a coupon (admin)
async fn create_coupon(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = CreateCouponInput {
        code: payload.code,
        name: payload.name,
        discount_type: payload.discount_type,
        value: payload.value,
        minimum_amount: payload.minimum_amount,
        maximum_discount: payload.maximum_discount,
        usage_limit: payload.usage_limit,
        is_active: payload.is_active,
        starts_at: payload.starts_at,
        expires_at: payload.expires_at,
    };

    let coupon = state
        .services
        .coupons
        .create(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(coupon))
}

/// Paginated coupon listing (admin)
async fn list_coupons(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let pagination = pagination.clamped(state.config.api_max_page_size as u64);

    let (coupons, total) = state
        .services
        .coupons
        .list(pagination.page, pagination.per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(PaginatedResponse::new(
        coupons,
        total,
        pagination.page,
        pagination.per_page,
    )))
}

/// Coupons currently inside their validity window (admin autocomplete)
async fn list_valid_coupons(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let coupons = state
        .services
        .coupons
        .currently_valid()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(coupons))
}

/// Quote a coupon against a cart total. An inapplicable coupon is a normal
/// 200 with `valid: false`; only an unknown code is an error.
async fn validate_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let quote = state
        .services
        .coupons
        .validate(&payload.code, payload.cart_total)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(quote))
}

async fn get_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .find_by_code(&code)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(coupon))
}

/// Record one use of a coupon (called by checkout orchestration)
async fn redeem_coupon(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let coupon = state
        .services
        .coupons
        .find_by_code(&code)
        .await
        .map_err(map_service_error)?;

    state
        .services
        .coupons
        .redeem(coupon.id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "message": "Coupon redeemed"
    })))
}

// Request DTOs

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub minimum_amount: Option<Decimal>,
    pub maximum_discount: Option<Decimal>,
    #[validate(range(min = 1))]
    pub usage_limit: Option<i32>,
    pub is_active: Option<bool>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub cart_total: Decimal,
}
