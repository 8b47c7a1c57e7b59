use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw submission as parsed by the HTTP layer. Request-scoped: it either
/// becomes exactly one [`MeasurementRecord`] or is rejected and discarded.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MeasurementSubmission {
    /// Opaque anonymous identifier, used for rate limiting only.
    #[serde(default)]
    pub device_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub device_azimuth: f64,
    pub device_altitude: f64,
    /// Defaults to the submission time when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A submission that passed validation. The timestamp is resolved.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub device_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub device_azimuth: f64,
    pub device_altitude: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fully computed measurement, ready to persist.
#[derive(Debug, Clone)]
pub struct NewMeasurement {
    pub device_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub device_azimuth: f64,
    pub device_altitude: f64,
    pub nasa_azimuth: f64,
    pub nasa_altitude: f64,
    pub delta_azimuth: f64,
    pub delta_altitude: f64,
}

/// Persisted measurement. Append-only: never mutated or deleted.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MeasurementRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub device_id: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub device_azimuth: f64,
    pub device_altitude: f64,
    pub nasa_azimuth: f64,
    pub nasa_altitude: f64,
    pub delta_azimuth: f64,
    pub delta_altitude: f64,
}

/// Key submissions are counted against. Submissions without a device id
/// share a coarse anonymous bucket; the HTTP layer passes the caller's
/// network origin when it has one so key-value backends can narrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateKey {
    Device(String),
    Anonymous(Option<String>),
}
