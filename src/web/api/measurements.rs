use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::measurement::{daily_stats, to_csv, DailyStats, MeasurementRecord};
use crate::storage::MeasurementStore;
use crate::web::api::error::ApiResult;
use crate::web::server::AppState;

const DEFAULT_LIMIT: i64 = 5000;
const MAX_LIMIT: i64 = 5000;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DateQuery {
    /// Calendar date (YYYY-MM-DD), defaults to today (UTC).
    pub date: Option<NaiveDate>,
    pub limit: Option<i64>,
}

fn day_bounds(date: Option<NaiveDate>) -> (DateTime<Utc>, DateTime<Utc>, NaiveDate) {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + Duration::days(1), date)
}

#[utoipa::path(
    get,
    path = "/api/solar/measurements",
    tag = "solar",
    params(
        ("date" = Option<String>, Query, description = "Calendar date (YYYY-MM-DD), defaults to today"),
        ("limit" = Option<i64>, Query, description = "Maximum records returned (default and cap 5000)")
    ),
    responses(
        (status = 200, description = "Measurements for the date, newest first", body = [MeasurementRecord]),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Vec<MeasurementRecord>>> {
    let (start, end, _) = day_bounds(query.date);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let records = state.measurements.records_between(start, end, limit).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/api/solar/stats",
    tag = "solar",
    params(
        ("date" = Option<String>, Query, description = "Calendar date (YYYY-MM-DD), defaults to today")
    ),
    responses(
        (status = 200, description = "Delta statistics for the date", body = DailyStats),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn stats(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<DailyStats>> {
    let (start, end, _) = day_bounds(query.date);
    let records = state
        .measurements
        .records_between(start, end, MAX_LIMIT)
        .await?;
    Ok(Json(daily_stats(&records)))
}

#[utoipa::path(
    get,
    path = "/api/solar/export",
    tag = "solar",
    params(
        ("date" = Option<String>, Query, description = "Calendar date (YYYY-MM-DD), defaults to today")
    ),
    responses(
        (status = 200, description = "Measurements as CSV", content_type = "text/csv"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn export(
    State(state): State<AppState>,
    Query(query): Query<DateQuery>,
) -> ApiResult<impl IntoResponse> {
    let (start, end, date) = day_bounds(query.date);
    let records = state
        .measurements
        .records_between(start, end, MAX_LIMIT)
        .await?;
    let csv = to_csv(&records);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=helios_data_{}.csv", date),
            ),
        ],
        csv,
    ))
}
