use serde::Serialize;
use utoipa::ToSchema;

use super::types::MeasurementRecord;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyStats {
    pub count: usize,
    pub avg_delta_azimuth: f64,
    pub avg_delta_altitude: f64,
    pub std_dev_azimuth: f64,
    pub std_dev_altitude: f64,
}

/// Mean and sample standard deviation of the deltas. Standard deviation
/// is 0 for fewer than two records.
pub fn daily_stats(records: &[MeasurementRecord]) -> DailyStats {
    let count = records.len();
    if count == 0 {
        return DailyStats {
            count: 0,
            avg_delta_azimuth: 0.0,
            avg_delta_altitude: 0.0,
            std_dev_azimuth: 0.0,
            std_dev_altitude: 0.0,
        };
    }

    let n = count as f64;
    let avg_az = records.iter().map(|r| r.delta_azimuth).sum::<f64>() / n;
    let avg_alt = records.iter().map(|r| r.delta_altitude).sum::<f64>() / n;

    let (std_az, std_alt) = if count < 2 {
        (0.0, 0.0)
    } else {
        let var_az = records
            .iter()
            .map(|r| (r.delta_azimuth - avg_az).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        let var_alt = records
            .iter()
            .map(|r| (r.delta_altitude - avg_alt).powi(2))
            .sum::<f64>()
            / (n - 1.0);
        (var_az.sqrt(), var_alt.sqrt())
    };

    DailyStats {
        count,
        avg_delta_azimuth: avg_az,
        avg_delta_altitude: avg_alt,
        std_dev_azimuth: std_az,
        std_dev_altitude: std_alt,
    }
}

/// Render records as CSV, header row first, timestamps in RFC 3339.
pub fn to_csv(records: &[MeasurementRecord]) -> String {
    let mut out = String::from(
        "id,created_at,device_id,latitude,longitude,device_azimuth,device_altitude,\
         nasa_azimuth,nasa_altitude,delta_azimuth,delta_altitude\n",
    );
    for r in records {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{}\n",
            r.id,
            r.created_at.to_rfc3339(),
            r.device_id.as_deref().unwrap_or(""),
            r.latitude,
            r.longitude,
            r.device_azimuth,
            r.device_altitude,
            r.nasa_azimuth,
            r.nasa_altitude,
            r.delta_azimuth,
            r.delta_altitude,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, delta_az: f64, delta_alt: f64) -> MeasurementRecord {
        MeasurementRecord {
            id,
            created_at: Utc.with_ymd_and_hms(2023, 6, 21, 12, 0, 0).unwrap(),
            device_id: Some("d1".into()),
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
    fn empty_input_yields_zeroed_stats() {
        let stats = daily_stats(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.avg_delta_azimuth, 0.0);
        assert_eq!(stats.std_dev_azimuth, 0.0);
    }

    #[test]
    fn averages_and_deviation_match_known_values() {
        let records = vec![record(1, 1.0, 2.0), record(2, 3.0, 2.0), record(3, 5.0, 2.0)];
        let stats = daily_stats(&records);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.avg_delta_azimuth, 3.0);
        assert_eq!(stats.avg_delta_altitude, 2.0);
        // Sample std dev of [1, 3, 5] is 2.
        assert!((stats.std_dev_azimuth - 2.0).abs() < 1e-12);
        assert_eq!(stats.std_dev_altitude, 0.0);
    }

    #[test]
    fn csv_has_header_and_one_line_per_record() {
        let csv = to_csv(&[record(7, -2.0, 1.0)]);
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("id,created_at,device_id"));
        assert!(lines[1].starts_with("7,2023-06-21T12:00:00"));
        assert!(lines[1].ends_with("-2,1"));
    }
}
