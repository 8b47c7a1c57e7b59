use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use solar_positioning::{spa, time::DeltaT, RefractionCorrection};
use utoipa::ToSchema;

use super::error::OracleError;

// Standard atmosphere for the refraction correction.
const PRESSURE_HPA: f64 = 1013.25;
const TEMPERATURE_C: f64 = 15.0;

// Years for which the delta-T estimate is trustworthy.
const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 2100;

/// Topocentric sun position. Azimuth in degrees from north, [0, 360);
/// altitude in degrees above the horizon, [-90, 90].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct SunPosition {
    pub azimuth: f64,
    pub altitude: f64,
}

/// Pure ephemeris interface: same place and time in, same position out.
pub trait SunOracle: Send + Sync {
    fn sun_position(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<SunPosition, OracleError>;
}

/// NREL SPA implementation via the `solar-positioning` crate,
/// sub-0.01 degree accuracy for Earth-based observers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpaOracle;

impl SunOracle for SpaOracle {
    fn sun_position(
        &self,
        latitude: f64,
        longitude: f64,
        at: DateTime<Utc>,
    ) -> Result<SunPosition, OracleError> {
        if !latitude.is_finite() {
            return Err(OracleError::NonFiniteInput("latitude"));
        }
        if !longitude.is_finite() {
            return Err(OracleError::NonFiniteInput("longitude"));
        }

        let year = at.year();
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(OracleError::UnsupportedEpoch(year));
        }

        let delta_t = DeltaT::estimate_from_date(year, at.month())
            .map_err(|e| OracleError::Computation(e.to_string()))?;

        let refraction = RefractionCorrection::new(PRESSURE_HPA, TEMPERATURE_C)
            .map_err(|e| OracleError::Computation(e.to_string()))?;

        let position = spa::solar_position(at, latitude, longitude, 0.0, delta_t, Some(refraction))
            .map_err(|e| OracleError::Computation(e.to_string()))?;

        Ok(SunPosition {
            azimuth: position.azimuth().rem_euclid(360.0),
            altitude: position.elevation_angle(),
        })
    }
}
