use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::debug;
use thiserror::Error;

use super::delta::deltas;
use super::rate_limit::{RateDecision, RateLimitPolicy, RateLimiter};
use super::types::{MeasurementRecord, MeasurementSubmission, NewMeasurement, RateKey};
use super::validate::{validate, ValidationError};
use crate::solar::{OracleError, SunOracle};
use crate::storage::{MeasurementStore, StorageError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Orchestrates a submission through validate, rate-check, oracle, delta
/// and persist, in that order. Each call is independent; the only shared
/// state is the store. All four failure kinds are terminal for the call,
/// nothing is retried here. A persist failure needs no limiter rollback
/// since the limiter only counts persisted rows.
pub struct IngestionPipeline {
    store: Arc<dyn MeasurementStore>,
    oracle: Arc<dyn SunOracle>,
    limiter: RateLimiter,
    future_tolerance: Duration,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<dyn MeasurementStore>,
        oracle: Arc<dyn SunOracle>,
        rate_limit: RateLimitPolicy,
        future_tolerance: Duration,
    ) -> Self {
        IngestionPipeline {
            store,
            oracle,
            limiter: RateLimiter::new(rate_limit),
            future_tolerance,
        }
    }

    /// `origin` is whatever fallback rate key the caller can supply
    /// (typically the client network address) for submissions without a
    /// device id.
    pub async fn ingest(
        &self,
        submission: MeasurementSubmission,
        origin: Option<&str>,
    ) -> Result<MeasurementRecord, IngestError> {
        self.ingest_at(submission, origin, Utc::now()).await
    }

    pub(crate) async fn ingest_at(
        &self,
        submission: MeasurementSubmission,
        origin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<MeasurementRecord, IngestError> {
        let validated = validate(submission, now, self.future_tolerance)?;

        let key = match &validated.device_id {
            Some(id) => RateKey::Device(id.clone()),
            None => RateKey::Anonymous(origin.map(String::from)),
        };
        if let RateDecision::Rejected { retry_after } =
            self.limiter.check(self.store.as_ref(), &key, now).await?
        {
            return Err(IngestError::RateLimited { retry_after });
        }

        let reference = self.oracle.sun_position(
            validated.latitude,
            validated.longitude,
            validated.timestamp,
        )?;
        let (delta_azimuth, delta_altitude) =
            deltas(validated.device_azimuth, validated.device_altitude, &reference);

        let record = self
            .store
            .insert(NewMeasurement {
                device_id: validated.device_id,
                latitude: validated.latitude,
                longitude: validated.longitude,
                device_azimuth: validated.device_azimuth,
                device_altitude: validated.device_altitude,
                nasa_azimuth: reference.azimuth,
                nasa_altitude: reference.altitude,
                delta_azimuth,
                delta_altitude,
            })
            .await?;

        debug!(
            "ingested measurement {} (delta_az {:.2}, delta_alt {:.2})",
            record.id, record.delta_azimuth, record.delta_altitude
        );
        Ok(record)
    }
}
