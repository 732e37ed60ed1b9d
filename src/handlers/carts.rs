use crate::handlers::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::carts::{AddToCartInput, CreateCartInput},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Creates the router for cart endpoints
pub fn carts_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_cart))
        .route("/:id", get(get_cart))
        .route("/:id/items", post(add_to_cart))
        .route("/:id/items/:item_id", put(update_cart_item))
        .route("/:id/items/:item_id", delete(remove_cart_item))
        .route("/:id/coupon", post(apply_coupon))
        .route("/:id/coupon", delete(remove_coupon))
}

/// Create a new cart
async fn create_cart(
    State(state): State<AppState>,
    Json(payload): Json<CreateCartRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let input = CreateCartInput {
        session_id: payload.session_id,
        customer_id: payload.customer_id,
        currency: payload.currency,
    };

    let cart = state
        .services
        .carts
        .create_cart(input)
        .await
        .map_err(map_service_error)?;

    Ok(created_response(cart))
}

/// Get cart with items
async fn get_cart(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart_with_items = state
        .services
        .carts
        .get_cart(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart_with_items))
}

/// Add item to cart
async fn add_to_cart(
    State(state): State<AppState>,
    Path(cart_id): Path<Uuid>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let input = AddToCartInput {
        product_id: payload.product_id,
        quantity: payload.quantity,
    };

    let cart = state
        .services
        .carts
        .add_item(cart_id, input)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Update cart item quantity
async fn update_cart_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .carts
        .update_item_quantity(cart_id, item_id, payload.quantity)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Remove item from cart
async fn remove_cart_item(
    State(state): State<AppState>,
    Path((cart_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state
        .services
        .carts
        .update_item_quantity(cart_id, item_id, 0)
        .await
        .map_err(map_service_error)?;

    Ok(no_content_response())
}

/// Apply a coupon code to the cart
async fn apply_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApplyCouponRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .carts
        .apply_coupon(id, &payload.code)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

/// Remove the applied coupon
async fn remove_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let cart = state
        .services
        .carts
        .remove_coupon(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(cart))
}

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct CreateCartRequest {
    pub session_id: Option<String>,
    pub customer_id: Option<Uuid>,
    pub currency: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    pub product_id: i64,
    #[validate(range(min = 1))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuantityRequest {
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyCouponRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
}
