use utoipa::OpenApi;

use super::api::error::ErrorResponse;
use super::api::measurements::DateQuery;
use super::api::solar::{SolarPositionRequest, SolarPositionResponse};
use super::api::verdict::TriggerResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::solar::calculate,
        super::api::solar::measure,
        super::api::measurements::list,
        super::api::measurements::stats,
        super::api::measurements::export,
        super::api::verdict::latest,
        super::api::verdict::trigger,
    ),
    components(
        schemas(
            SolarPositionRequest,
            SolarPositionResponse,
            DateQuery,
            TriggerResponse,
            ErrorResponse,
            crate::measurement::MeasurementSubmission,
            crate::measurement::MeasurementRecord,
            crate::measurement::DailyStats,
            crate::solar::SunPosition,
            crate::verdict::VerdictRecord,
            crate::verdict::VerdictSummary,
            crate::verdict::WinningModel,
        )
    ),
    info(
        title = "Helios Measurement API",
        description = "Crowdsourced sun position measurements compared against the NREL SPA ephemeris",
        version = "0.1.0"
    ),
    tags(
        (name = "solar", description = "Sun position calculation and measurement ingestion"),
        (name = "verdict", description = "Aggregate analysis of measurement accuracy")
    )
)]
pub struct ApiDoc;
