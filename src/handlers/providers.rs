use crate::handlers::common::{map_service_error, success_response};
use crate::{
    entities::service_provider::ProviderCategory,
    errors::ApiError,
    services::scheduling::ProviderSearchQuery,
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Router,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::ActiveEnum;
use serde::Deserialize;

/// Creates the router for service-provider endpoints
pub fn providers_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search_providers))
        .route("/:id", get(get_provider))
        .route("/:id/slots", get(get_provider_slots))
}

#[derive(Debug, Deserialize)]
pub struct SearchProvidersParams {
    pub city: String,
    pub area: String,
    pub category: String,
    /// Comma-separated service ids; a provider must offer every one
    pub service_ids: String,
    pub preferred_date: Option<NaiveDate>,
    /// HH:MM or HH:MM:SS
    pub preferred_time: Option<String>,
}

fn parse_category(slug: &str) -> Result<ProviderCategory, ApiError> {
    ProviderCategory::try_from_value(&slug.to_string()).map_err(|_| {
        ApiError::ValidationError(format!("Unknown provider category: {}", slug))
    })
}

fn parse_service_ids(raw: &str) -> Result<Vec<i64>, ApiError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| ApiError::ValidationError(format!("Invalid service id: {}", s)))
        })
        .collect::<Result<Vec<i64>, ApiError>>()?;

    if ids.is_empty() {
        return Err(ApiError::ValidationError(
            "service_ids must contain at least one id".to_string(),
        ));
    }
    Ok(ids)
}

fn parse_time(raw: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| ApiError::ValidationError(format!("Invalid time: {}", raw)))
}

/// Providers able to perform every requested service in the given
/// city/area, best-rated first. An empty list is a normal outcome.
async fn search_providers(
    State(state): State<AppState>,
    Query(params): Query<SearchProvidersParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let category = parse_category(&params.category)?;
    let service_ids = parse_service_ids(&params.service_ids)?;

    let preferred = match (params.preferred_date, params.preferred_time.as_deref()) {
        (Some(date), Some(time)) => Some((date, parse_time(time)?)),
        (None, None) => None,
        _ => {
            return Err(ApiError::ValidationError(
                "preferred_date and preferred_time must be provided together".to_string(),
            ))
        }
    };

    let providers = state
        .services
        .scheduling
        .available_providers(ProviderSearchQuery {
            city: params.city,
            area: params.area,
            category,
            service_ids,
            preferred,
        })
        .await
        .map_err(map_service_error)?;

    Ok(success_response(providers))
}

async fn get_provider(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let provider = state
        .services
        .scheduling
        .get_provider(id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(provider))
}

#[derive(Debug, Deserialize)]
pub struct SlotsParams {
    pub date: NaiveDate,
}

/// Free slots for a provider on a date. A day off or a fully booked day is
/// an empty list, not an error; past dates are rejected here.
async fn get_provider_slots(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<SlotsParams>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    if params.date < Utc::now().date_naive() {
        return Err(ApiError::ValidationError(
            "date must not be in the past".to_string(),
        ));
    }

    let slots = state
        .services
        .scheduling
        .available_time_slots(id, params.date)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(slots))
}
