use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::Row;

use super::{MeasurementStore, StorageError, VerdictStore};
use crate::measurement::{MeasurementRecord, NewMeasurement, RateKey};
use crate::verdict::{VerdictRecord, VerdictSummary, WinningModel};

const POOL_SIZE: usize = 16;

/// PostgreSQL-backed store. The windowed count queries lean on the
/// measurements indexes on device_id and created_at.
#[derive(Clone)]
pub struct PostgresStore {
    pool: Pool,
}

impl PostgresStore {
    pub fn connect(url: &str) -> Result<Self, StorageError> {
        let pg_config: tokio_postgres::Config = url.parse().map_err(StorageError::Db)?;
        let manager = Manager::from_config(
            pg_config,
            tokio_postgres::NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );
        let pool = Pool::builder(manager)
            .max_size(POOL_SIZE)
            .build()
            .map_err(|e| StorageError::PoolBuild(e.to_string()))?;
        Ok(PostgresStore { pool })
    }
}

fn row_to_record(row: &Row) -> MeasurementRecord {
    MeasurementRecord {
        id: row.get(0),
        created_at: row.get(1),
        device_id: row.get(2),
        latitude: row.get(3),
        longitude: row.get(4),
        device_azimuth: row.get(5),
        device_altitude: row.get(6),
        nasa_azimuth: row.get(7),
        nasa_altitude: row.get(8),
        delta_azimuth: row.get(9),
        delta_altitude: row.get(10),
    }
}

fn row_to_verdict(row: &Row) -> VerdictRecord {
    VerdictRecord {
        id: row.get(0),
        created_at: row.get(1),
        total_samples: row.get(2),
        valid_samples: row.get(3),
        avg_error_azimuth: row.get(4),
        avg_error_altitude: row.get(5),
        confidence_score: row.get(6),
        winning_model: WinningModel::from_label(row.get(7)),
    }
}

#[async_trait]
impl MeasurementStore for PostgresStore {
    async fn insert(&self, m: NewMeasurement) -> Result<MeasurementRecord, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO measurements
                   (device_id, latitude, longitude, device_azimuth, device_altitude,
                    nasa_azimuth, nasa_altitude, delta_azimuth, delta_altitude)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 RETURNING id, created_at",
                &[
                    &m.device_id,
                    &m.latitude,
                    &m.longitude,
                    &m.device_azimuth,
                    &m.device_altitude,
                    &m.nasa_azimuth,
                    &m.nasa_altitude,
                    &m.delta_azimuth,
                    &m.delta_altitude,
                ],
            )
            .await?;

        Ok(MeasurementRecord {
            id: row.get(0),
            created_at: row.get(1),
            device_id: m.device_id,
            latitude: m.latitude,
            longitude: m.longitude,
            device_azimuth: m.device_azimuth,
            device_altitude: m.device_altitude,
            nasa_azimuth: m.nasa_azimuth,
            nasa_altitude: m.nasa_altitude,
            delta_azimuth: m.delta_azimuth,
            delta_altitude: m.delta_altitude,
        })
    }

    async fn submission_times_since(
        &self,
        key: &RateKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StorageError> {
        let client = self.pool.get().await?;
        let rows = match key {
            RateKey::Device(id) => {
                client
                    .query(
                        "SELECT created_at FROM measurements
                         WHERE device_id = $1 AND created_at >= $2
                         ORDER BY created_at ASC",
                        &[id, &since],
                    )
                    .await?
            }
            RateKey::Anonymous(_) => {
                client
                    .query(
                        "SELECT created_at FROM measurements
                         WHERE device_id IS NULL AND created_at >= $1
                         ORDER BY created_at ASC",
                        &[&since],
                    )
                    .await?
            }
        };
        Ok(rows.iter().map(|r| r.get(0)).collect())
    }

    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MeasurementRecord>, StorageError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, created_at, device_id, latitude, longitude,
                        device_azimuth, device_altitude, nasa_azimuth, nasa_altitude,
                        delta_azimuth, delta_altitude
                 FROM measurements
                 WHERE created_at >= $1 AND created_at < $2
                 ORDER BY created_at DESC
                 LIMIT $3",
                &[&start, &end, &limit],
            )
            .await?;
        Ok(rows.iter().map(row_to_record).collect())
    }
}

#[async_trait]
impl VerdictStore for PostgresStore {
    async fn insert_verdict(&self, v: &VerdictSummary) -> Result<VerdictRecord, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "INSERT INTO verdicts
                   (total_samples, valid_samples, avg_error_azimuth, avg_error_altitude,
                    confidence_score, winning_model)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, created_at",
                &[
                    &v.total_samples,
                    &v.valid_samples,
                    &v.avg_error_azimuth,
                    &v.avg_error_altitude,
                    &v.confidence_score,
                    &v.winning_model.label(),
                ],
            )
            .await?;

        Ok(VerdictRecord {
            id: row.get(0),
            created_at: row.get(1),
            total_samples: v.total_samples,
            valid_samples: v.valid_samples,
            avg_error_azimuth: v.avg_error_azimuth,
            avg_error_altitude: v.avg_error_altitude,
            confidence_score: v.confidence_score,
            winning_model: v.winning_model,
        })
    }

    async fn latest_verdict(&self) -> Result<Option<VerdictRecord>, StorageError> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, created_at, total_samples, valid_samples,
                        avg_error_azimuth, avg_error_altitude, confidence_score, winning_model
                 FROM verdicts
                 ORDER BY created_at DESC
                 LIMIT 1",
                &[],
            )
            .await?;
        Ok(row.as_ref().map(row_to_verdict))
    }
}
