mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::measurement::{MeasurementRecord, NewMeasurement, RateKey};
use crate::verdict::{VerdictRecord, VerdictSummary};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),
    #[error("database error: {0}")]
    Db(#[from] tokio_postgres::Error),
    #[error("pool build error: {0}")]
    PoolBuild(String),
    #[error("insert returned no row")]
    MissingRow,
}

/// Persistence collaborator for the ingestion pipeline. Records are
/// append-only; nothing here mutates or deletes them.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Persist one measurement; id and created_at are assigned here.
    async fn insert(&self, measurement: NewMeasurement) -> Result<MeasurementRecord, StorageError>;

    /// created_at of persisted submissions for the rate key at or after
    /// `since`, ascending. Device keys count that device's rows;
    /// anonymous keys count rows without a device id.
    async fn submission_times_since(
        &self,
        key: &RateKey,
        since: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, StorageError>;

    /// Records with created_at in [start, end), newest first, capped at
    /// `limit`.
    async fn records_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<MeasurementRecord>, StorageError>;
}

#[async_trait]
pub trait VerdictStore: Send + Sync {
    async fn insert_verdict(&self, verdict: &VerdictSummary) -> Result<VerdictRecord, StorageError>;

    async fn latest_verdict(&self) -> Result<Option<VerdictRecord>, StorageError>;
}
