use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::measurement::MeasurementRecord;
use crate::storage::{MeasurementStore, StorageError, VerdictStore};

// Upper bound on records pulled into one analysis.
const MAX_ANALYSIS_ROWS: i64 = 100_000;

#[derive(Debug, Clone, Copy)]
pub struct VerdictPolicy {
    /// Measurements with |delta| above this on either axis are treated
    /// as user error and excluded.
    pub outlier_threshold_deg: f64,
    /// Confidence above this declares the reference model the winner.
    pub confidence_threshold: f64,
    pub analysis_window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum WinningModel {
    #[serde(rename = "NASA")]
    Nasa,
    #[serde(rename = "ANOMALY")]
    Anomaly,
}

impl WinningModel {
    pub fn label(&self) -> &'static str {
        match self {
            WinningModel::Nasa => "NASA",
            WinningModel::Anomaly => "ANOMALY",
        }
    }

    pub fn from_label(label: &str) -> Self {
        if label == "NASA" {
            WinningModel::Nasa
        } else {
            WinningModel::Anomaly
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct VerdictSummary {
    pub total_samples: i64,
    pub valid_samples: i64,
    pub avg_error_azimuth: f64,
    pub avg_error_altitude: f64,
    pub confidence_score: f64,
    pub winning_model: WinningModel,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct VerdictRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub total_samples: i64,
    pub valid_samples: i64,
    pub avg_error_azimuth: f64,
    pub avg_error_altitude: f64,
    pub confidence_score: f64,
    pub winning_model: WinningModel,
}

/// Score a batch of measurements: drop outliers, take the mean absolute
/// error per axis, then confidence = 100 - (mae_az + mae_alt) clamped to
/// [0, 100].
pub fn score(records: &[MeasurementRecord], policy: &VerdictPolicy) -> VerdictSummary {
    let total_samples = records.len() as i64;

    let valid: Vec<_> = records
        .iter()
        .filter(|r| {
            r.delta_azimuth.abs() <= policy.outlier_threshold_deg
                && r.delta_altitude.abs() <= policy.outlier_threshold_deg
        })
        .collect();
    let valid_samples = valid.len() as i64;

    if valid.is_empty() {
        return VerdictSummary {
            total_samples,
            valid_samples: 0,
            avg_error_azimuth: 0.0,
            avg_error_altitude: 0.0,
            confidence_score: 0.0,
            winning_model: WinningModel::Anomaly,
        };
    }

    let n = valid_samples as f64;
    let mae_az = valid.iter().map(|r| r.delta_azimuth.abs()).sum::<f64>() / n;
    let mae_alt = valid.iter().map(|r| r.delta_altitude.abs()).sum::<f64>() / n;

    let confidence = (100.0 - (mae_az + mae_alt)).clamp(0.0, 100.0);
    let winning_model = if confidence > policy.confidence_threshold {
        WinningModel::Nasa
    } else {
        WinningModel::Anomaly
    };

    VerdictSummary {
        total_samples,
        valid_samples,
        avg_error_azimuth: round4(mae_az),
        avg_error_altitude: round4(mae_alt),
        confidence_score: round2(confidence),
        winning_model,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Runs the analysis over the trailing window and appends the result to
/// the verdict log.
pub struct VerdictService {
    measurements: Arc<dyn MeasurementStore>,
    verdicts: Arc<dyn VerdictStore>,
    policy: VerdictPolicy,
}

impl VerdictService {
    pub fn new(
        measurements: Arc<dyn MeasurementStore>,
        verdicts: Arc<dyn VerdictStore>,
        policy: VerdictPolicy,
    ) -> Self {
        VerdictService {
            measurements,
            verdicts,
            policy,
        }
    }

    pub async fn run_analysis(&self, now: DateTime<Utc>) -> Result<VerdictRecord, StorageError> {
        let since = now - self.policy.analysis_window;
        let records = self
            .measurements
            .records_between(since, now, MAX_ANALYSIS_ROWS)
            .await?;

        let summary = score(&records, &self.policy);
        let record = self.verdicts.insert_verdict(&summary).await?;

        info!(
            "verdict {}: {} with {:.2}% confidence ({} of {} samples)",
            record.id,
            record.winning_model.label(),
            record.confidence_score,
            record.valid_samples,
            record.total_samples
        );
        Ok(record)
    }

    pub async fn latest(&self) -> Result<Option<VerdictRecord>, StorageError> {
        self.verdicts.latest_verdict().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> VerdictPolicy {
        VerdictPolicy {
            outlier_threshold_deg: 20.0,
            confidence_threshold: 85.0,
            analysis_window: Duration::hours(24),
        }
    }

    fn record(delta_az: f64, delta_alt: f64) -> MeasurementRecord {
        MeasurementRecord {
            id: 1,
            created_at: Utc.with_ymd_and_hms(2023, 6, 21, 12, 0, 0).unwrap(),
            device_id: None,
            latitude: 40.0,
            longitude: -75.0,
            device_azimuth: 180.0,
            device_altitude: 45.0,
            nasa_azimuth: 182.0,
            nasa_altitude: 44.0,
            delta_azimuth: delta_az,
            delta_altitude: delta_alt,
        }
    }

    #[test]
    fn no_samples_is_an_anomaly_with_zero_confidence() {
        let summary = score(&[], &policy());
        assert_eq!(summary.total_samples, 0);
        assert_eq!(summary.valid_samples, 0);
        assert_eq!(summary.confidence_score, 0.0);
        assert_eq!(summary.winning_model, WinningModel::Anomaly);
    }

    #[test]
    fn outliers_are_excluded_from_the_error_averages() {
        let records = vec![record(1.0, 1.0), record(45.0, 0.0), record(0.0, -30.0)];
        let summary = score(&records, &policy());
        assert_eq!(summary.total_samples, 3);
        assert_eq!(summary.valid_samples, 1);
        assert_eq!(summary.avg_error_azimuth, 1.0);
        assert_eq!(summary.avg_error_altitude, 1.0);
        assert_eq!(summary.winning_model, WinningModel::Nasa);
    }

    #[test]
    fn only_outliers_means_anomaly() {
        let records = vec![record(45.0, 0.0)];
        let summary = score(&records, &policy());
        assert_eq!(summary.valid_samples, 0);
        assert_eq!(summary.winning_model, WinningModel::Anomaly);
    }

    #[test]
    fn accurate_measurements_favor_the_reference_model() {
        let records = vec![record(0.5, -0.5), record(-1.0, 0.25)];
        let summary = score(&records, &policy());
        assert!(summary.confidence_score > 85.0);
        assert_eq!(summary.winning_model, WinningModel::Nasa);
    }

    #[test]
    fn moderate_errors_fall_below_the_confidence_threshold() {
        let records = vec![record(20.0, 20.0), record(19.0, 18.0), record(20.0, 19.0)];
        let summary = score(&records, &policy());
        assert_eq!(summary.winning_model, WinningModel::Anomaly);
        assert!(summary.confidence_score > 0.0 && summary.confidence_score < 85.0);
    }

    #[test]
    fn confidence_is_clamped_at_zero() {
        let loose = VerdictPolicy {
            outlier_threshold_deg: 90.0,
            ..policy()
        };
        let summary = score(&[record(80.0, 80.0)], &loose);
        assert_eq!(summary.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn analysis_persists_and_surfaces_the_latest_verdict() {
        use crate::storage::MemoryStore;

        let store = Arc::new(MemoryStore::new());
        let service = VerdictService::new(store.clone(), store.clone(), policy());

        assert!(service.latest().await.unwrap().is_none());

        let run = service.run_analysis(Utc::now()).await.unwrap();
        let latest = service.latest().await.unwrap().unwrap();
        assert_eq!(latest.id, run.id);
        assert_eq!(latest.winning_model, WinningModel::Anomaly);
    }
}
