use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::types::{MeasurementSubmission, ValidatedSubmission};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("timestamp too far in the future")]
    InvalidTimestamp,
}

/// Inclusive range check. NaN fails.
pub fn check_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<(), ValidationError> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

fn check_azimuth(field: &'static str, value: f64) -> Result<(), ValidationError> {
    // Half-open: 360 wraps to 0.
    if value >= 0.0 && value < 360.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { field, value })
    }
}

/// Structural and range validation, short-circuiting on the first failure.
/// A missing timestamp defaults to `now`; a present one may lead the
/// server clock by at most `future_tolerance`.
pub fn validate(
    submission: MeasurementSubmission,
    now: DateTime<Utc>,
    future_tolerance: Duration,
) -> Result<ValidatedSubmission, ValidationError> {
    check_range("latitude", submission.latitude, -90.0, 90.0)?;
    check_range("longitude", submission.longitude, -180.0, 180.0)?;
    check_azimuth("device_azimuth", submission.device_azimuth)?;
    check_range("device_altitude", submission.device_altitude, -90.0, 90.0)?;

    let timestamp = submission.timestamp.unwrap_or(now);
    if timestamp > now + future_tolerance {
        return Err(ValidationError::InvalidTimestamp);
    }

    Ok(ValidatedSubmission {
        device_id: submission.device_id,
        latitude: submission.latitude,
        longitude: submission.longitude,
        device_azimuth: submission.device_azimuth,
        device_altitude: submission.device_altitude,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> MeasurementSubmission {
        MeasurementSubmission {
            device_id: Some("abc".into()),
            latitude: 40.0,
            longitude: -75.0,
            device_azimuth: 180.0,
            device_altitude: 45.0,
            timestamp: None,
        }
    }

    fn tolerance() -> Duration {
        Duration::minutes(5)
    }

    #[test]
    fn accepts_valid_submission_and_resolves_timestamp() {
        let now = Utc::now();
        let v = validate(submission(), now, tolerance()).unwrap();
        assert_eq!(v.timestamp, now);
        assert_eq!(v.device_id.as_deref(), Some("abc"));
    }

    #[test]
    fn latitude_poles_are_inclusive() {
        let now = Utc::now();
        for lat in [90.0, -90.0] {
            let mut s = submission();
            s.latitude = lat;
            assert!(validate(s, now, tolerance()).is_ok());
        }
    }

    #[test]
    fn latitude_just_past_pole_is_rejected() {
        let mut s = submission();
        s.latitude = 90.0001;
        let err = validate(s, Utc::now(), tolerance()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "latitude", .. }
        ));
    }

    #[test]
    fn azimuth_upper_bound_is_exclusive() {
        let now = Utc::now();
        let mut s = submission();
        s.device_azimuth = 0.0;
        assert!(validate(s, now, tolerance()).is_ok());

        let mut s = submission();
        s.device_azimuth = 360.0;
        let err = validate(s, now, tolerance()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "device_azimuth", .. }
        ));
    }

    #[test]
    fn nan_fields_are_rejected() {
        let mut s = submission();
        s.device_altitude = f64::NAN;
        let err = validate(s, Utc::now(), tolerance()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "device_altitude", .. }
        ));
    }

    #[test]
    fn future_timestamp_within_tolerance_is_accepted() {
        let now = Utc::now();
        let mut s = submission();
        s.timestamp = Some(now + Duration::minutes(2));
        assert!(validate(s, now, tolerance()).is_ok());
    }

    #[test]
    fn future_timestamp_past_tolerance_is_rejected() {
        let now = Utc::now();
        let mut s = submission();
        s.timestamp = Some(now + Duration::minutes(10));
        let err = validate(s, now, tolerance()).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidTimestamp));
    }

    #[test]
    fn checks_run_in_declared_order() {
        // Both latitude and azimuth invalid: latitude reported first.
        let mut s = submission();
        s.latitude = 120.0;
        s.device_azimuth = 400.0;
        let err = validate(s, Utc::now(), tolerance()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutOfRange { field: "latitude", .. }
        ));
    }
}
