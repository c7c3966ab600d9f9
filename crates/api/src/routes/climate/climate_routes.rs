use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use log::error;
use std::sync::Arc;

use crate::{
    queries::{self, QueryError, WindowField},
    AppState, PrecipitationReading,
};

/// Map a query-layer error to the HTTP outcome. The query layer only signals
/// kind + message; picking status codes happens here.
fn error_response(err: QueryError) -> (StatusCode, String) {
    match err {
        QueryError::InvalidDate(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        QueryError::NoMatchingStation | QueryError::NoDataInRange => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        QueryError::Store(e) => {
            error!("store query failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                String::from("internal error"),
            )
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1.0/precipitation",
    responses(
        (status = OK, description = "Every stored precipitation row, one entry per row, nulls preserved", body = Vec<PrecipitationReading>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset")
    ))]
pub async fn precipitation(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PrecipitationReading>>, (StatusCode, String)> {
    let readings = queries::precipitation_dump(state.climate_db.as_ref())
        .await
        .map_err(error_response)?;
    Ok(Json(readings))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/stations",
    responses(
        (status = OK, description = "All stations as a flat list: [id_1, name_1, id_2, name_2, ...]", body = Vec<String>),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset")
    ))]
pub async fn stations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, (StatusCode, String)> {
    let flat = queries::station_listing(state.climate_db.as_ref())
        .await
        .map_err(error_response)?;
    Ok(Json(flat))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/tobs",
    responses(
        (status = OK, description = "Last 365 days of observations for the most-active station, flattened as [date_1, tobs_1, ...]"),
        (status = NOT_FOUND, description = "Empty dataset"),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset")
    ))]
pub async fn tobs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WindowField>>, (StatusCode, String)> {
    let flat = queries::active_station_window(state.climate_db.as_ref())
        .await
        .map_err(error_response)?;
    Ok(Json(flat))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/{start}",
    params(
        ("start" = String, Path, description = "ISO-8601 calendar date lower bound (inclusive)"),
    ),
    responses(
        (status = OK, description = "Temperature summary [min, avg, max] for dates >= start", body = Vec<f64>),
        (status = BAD_REQUEST, description = "Start date is not a valid ISO-8601 calendar date"),
        (status = NOT_FOUND, description = "No observations on or after the start date"),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset")
    ))]
pub async fn temperature_from(
    State(state): State<Arc<AppState>>,
    Path(start): Path<String>,
) -> Result<Json<[f64; 3]>, (StatusCode, String)> {
    let summary = queries::temperature_summary(state.climate_db.as_ref(), &start, None)
        .await
        .map_err(error_response)?;
    Ok(Json(summary.as_triple()))
}

#[utoipa::path(
    get,
    path = "/api/v1.0/{start}/{end}",
    params(
        ("start" = String, Path, description = "ISO-8601 calendar date lower bound (inclusive)"),
        ("end" = String, Path, description = "ISO-8601 calendar date upper bound (inclusive)"),
    ),
    responses(
        (status = OK, description = "Temperature summary [min, avg, max] for start <= date <= end", body = Vec<f64>),
        (status = BAD_REQUEST, description = "A bound is not a valid ISO-8601 calendar date"),
        (status = NOT_FOUND, description = "No observations inside the range"),
        (status = INTERNAL_SERVER_ERROR, description = "Failed to query the dataset")
    ))]
pub async fn temperature_range(
    State(state): State<Arc<AppState>>,
    Path((start, end)): Path<(String, String)>,
) -> Result<Json<[f64; 3]>, (StatusCode, String)> {
    let summary = queries::temperature_summary(state.climate_db.as_ref(), &start, Some(&end))
        .await
        .map_err(error_response)?;
    Ok(Json(summary.as_triple()))
}
