use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::verdict::VerdictRecord;
use crate::web::api::error::{ApiError, ApiResult};
use crate::web::server::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct TriggerResponse {
    pub success: bool,
    pub verdict: VerdictRecord,
    pub message: String,
}

#[utoipa::path(
    get,
    path = "/api/verdict/latest",
    tag = "verdict",
    responses(
        (status = 200, description = "Most recent verdict", body = VerdictRecord),
        (status = 404, description = "No verdict computed yet"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn latest(State(state): State<AppState>) -> ApiResult<Json<VerdictRecord>> {
    let verdict = state
        .verdicts
        .latest()
        .await?
        .ok_or(ApiError::NotFound("no_verdict"))?;
    Ok(Json(verdict))
}

#[utoipa::path(
    post,
    path = "/api/verdict/trigger",
    tag = "verdict",
    responses(
        (status = 200, description = "Verdict computed over the analysis window", body = TriggerResponse),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn trigger(State(state): State<AppState>) -> ApiResult<Json<TriggerResponse>> {
    let verdict = state.verdicts.run_analysis(Utc::now()).await?;
    let message = format!(
        "{} wins with {:.2}% confidence",
        verdict.winning_model.label(),
        verdict.confidence_score
    );
    Ok(Json(TriggerResponse {
        success: true,
        verdict,
        message,
    }))
}
