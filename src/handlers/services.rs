use crate::handlers::common::{map_service_error, success_response};
use crate::{errors::ApiError, AppState};
use axum::{
    extract::{Json, State},
    routing::{get, post},
    Router,
};
use serde::Deserialize;

/// Creates the router for product-service endpoints
pub fn services_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_services))
        .route("/cost", post(calculate_cost))
}

async fn list_services(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let services = state
        .services
        .pricing
        .list_active_services()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(services))
}

#[derive(Debug, Deserialize)]
pub struct CostQuoteRequest {
    #[serde(default)]
    pub service_ids: Vec<i64>,
    #[serde(default)]
    pub product_ids: Vec<i64>,
}

/// Price every requested service against every requested product. Empty
/// lists quote zero rather than failing.
async fn calculate_cost(
    State(state): State<AppState>,
    Json(payload): Json<CostQuoteRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let breakdown = state
        .services
        .pricing
        .calculate_service_cost(&payload.service_ids, &payload.product_ids)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(breakdown))
}
