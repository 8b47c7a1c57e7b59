use crate::solar::SunPosition;

/// Signed shortest angular difference in degrees, mapped to [-180, 180).
/// Keeps readings that straddle the 0/360 seam from producing a
/// spurious ~360 degree delta.
pub fn wrap_signed(device: f64, reference: f64) -> f64 {
    (device - reference + 180.0).rem_euclid(360.0) - 180.0
}

/// Device-minus-reference deltas. Altitude is bounded and does not wrap,
/// so it is a plain subtraction.
pub fn deltas(device_azimuth: f64, device_altitude: f64, reference: &SunPosition) -> (f64, f64) {
    (
        wrap_signed(device_azimuth, reference.azimuth),
        device_altitude - reference.altitude,
    )
}
