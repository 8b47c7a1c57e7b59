use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{MeasurementStore, StorageError, VerdictStore};
use crate::measurement::{MeasurementRecord, NewMeasurement, RateKey};
use crate::verdict::{VerdictRecord, VerdictSummary};

/// In-memory store for tests and database-less local runs. Counts reset
/// with the process, so rate limits are not durable here.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    measurements: Vec<MeasurementRecord>,
    verdicts: Vec<VerdictRecord>,
    next_measurement_id: i64,
    next_verdict_id: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches_key(record: &MeasurementRecord, key: &RateKey) -> bool {
    match key {
        RateKey::Device(id) => record.device_id.as_deref() == Some(id.as_str()),
        RateKey::Anonymous(_) => record.device_id.is_none(),
    }
}

#[async_trait]
impl MeasurementStore for MemoryStore {
    async fn insert(&self, m: NewMeasurement) -> Result<MeasurementRecord, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_measurement_id += 1;
        let record = MeasurementRecord {
            id: inner.next_measurement_id,
            created_at: Utc::now(),
            device_id: m.device_id,
            latitude: m.latitude,
            longitude: m.longitude,
            device_azimuth: m.device_azimuth,
            device_altitude: m.device_altitude,
            nasa_azimuth: m.nasa_azimuth,
            nasa_altitude: m.nasa_altitude,
            delta_azimuth: m.delta_azimuth,
            delta_altitude: m.delta_altitude,
        };
        inner.measurements.push(record.clone());
        Ok(record)
    }

    async fn submission_times_since(
        &self,
        key: &RateKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StorageError> {
        let inner = self.inner.lock().unwrap();
        let mut times: Vec<_> = inner
            .measurements
            .iter()
            .filter(|r| r.created_at >= since && matches_key(r, key))
            .map(|r| r.created_at)
            .collect();
        times.sort();
        Ok(times)
    }

    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MeasurementRecord>, StorageError> {
        let inner = self.inner.lock().unwrap();
        let mut records: Vec<_> = inner
            .measurements
            .iter()
            .filter(|r| r.created_at >= start && r.created_at < end)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit.max(0) as usize);
        Ok(records)
    }
}

#[async_trait]
impl VerdictStore for MemoryStore {
    async fn insert_verdict(&self, v: &VerdictSummary) -> Result<VerdictRecord, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_verdict_id += 1;
        let record = VerdictRecord {
            id: inner.next_verdict_id,
            created_at: Utc::now(),
            total_samples: v.total_samples,
            valid_samples: v.valid_samples,
            avg_error_azimuth: v.avg_error_azimuth,
            avg_error_altitude: v.avg_error_altitude,
            confidence_score: v.confidence_score,
            winning_model: v.winning_model,
        };
        inner.verdicts.push(record.clone());
        Ok(record)
    }

    async fn latest_verdict(&self) -> Result<Option<VerdictRecord>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.verdicts.last().cloned())
    }
}
