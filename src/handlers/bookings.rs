use crate::handlers::common::{created_response, map_service_error, success_response};
use crate::{errors::ApiError, services::scheduling::BookSlotInput, AppState};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

/// Creates the router for booking endpoints
pub fn bookings_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/:id", get(get_booking))
        .route("/:id/cancel", post(cancel_booking))
}

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub provider_id: i64,
    pub order_id: Option<i64>,
    pub service_date: NaiveDate,
    /// HH:MM or HH:MM:SS
    pub start_time: String,
}

/// Book a provider slot. A 409 means the slot was taken between the
/// availability read and this write; the client should offer another slot.
async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if payload.service_date < Utc::now().date_naive() {
        return Err(ApiError::ValidationError(
            "service_date must not be in the past".to_string(),
        ));
    }

    let start_time = NaiveTime::parse_from_str(&payload.start_time, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(&payload.start_time, "%H:%M"))
        .map_err(|_| {
            ApiError::ValidationError(format!("Invalid start_time: {}", payload.start_time))
        })?;

    let booking = state
        .services
        .scheduling
        .book_slot(BookSlotInput {
            provider_id: payload.provider_id,
            order_id: payload.order_id,
            service_date: payload.service_date,
            start_time,
        })
        .await
        .map_err(map_service_error)?;

    Ok(created_response(booking))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let booking = state
        .services
        .scheduling
        .get_booking(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(booking))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let booking = state
        .services
        .scheduling
        .cancel_booking(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(booking))
}
