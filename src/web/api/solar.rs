use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::measurement::{check_range, MeasurementRecord, MeasurementSubmission};
use crate::solar::SunOracle;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::server::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SolarPositionRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// Defaults to the current time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SolarPositionResponse {
    pub azimuth: f64,
    pub altitude: f64,
    pub timestamp: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/solar/calculate",
    tag = "solar",
    request_body = SolarPositionRequest,
    responses(
        (status = 200, description = "Computed sun position", body = SolarPositionResponse),
        (status = 400, description = "Coordinates out of range"),
        (status = 500, description = "Ephemeris failure")
    )
)]
pub async fn calculate(
    State(state): State<AppState>,
    Json(request): Json<SolarPositionRequest>,
) -> ApiResult<Json<SolarPositionResponse>> {
    check_range("latitude", request.latitude, -90.0, 90.0)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    check_range("longitude", request.longitude, -180.0, 180.0)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let timestamp = request.timestamp.unwrap_or_else(Utc::now);
    let position = state
        .oracle
        .sun_position(request.latitude, request.longitude, timestamp)?;

    Ok(Json(SolarPositionResponse {
        azimuth: position.azimuth,
        altitude: position.altitude,
        timestamp,
    }))
}

#[utoipa::path(
    post,
    path = "/api/solar/measure",
    tag = "solar",
    request_body = MeasurementSubmission,
    responses(
        (status = 200, description = "Stored measurement with deltas", body = MeasurementRecord),
        (status = 400, description = "Invalid submission"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Oracle or storage failure")
    )
)]
pub async fn measure(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(submission): Json<MeasurementSubmission>,
) -> ApiResult<Json<MeasurementRecord>> {
    let origin = addr.ip().to_string();
    let record = state.pipeline.ingest(submission, Some(&origin)).await?;
    Ok(Json(record))
}
