use chrono::{DateTime, Duration, Utc};

use super::types::RateKey;
use crate::storage::{MeasurementStore, StorageError};

#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Quota for submissions carrying a device id.
    pub max_per_window: u32,
    /// Coarser quota shared by submissions without a device id.
    pub anonymous_max_per_window: u32,
    pub window: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateDecision {
    Allowed,
    Rejected { retry_after: Duration },
}

/// Windowed submission counter over the persisted store, so the limit
/// survives restarts and holds across server instances. Two concurrent
/// submissions can both pass the check before either is persisted; the
/// quota is a soft abuse-mitigation bound, not a hard one.
pub struct RateLimiter {
    policy: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        RateLimiter { policy }
    }

    pub async fn check(
        &self,
        store: &dyn MeasurementStore,
        key: &RateKey,
        now: DateTime<Utc>,
    ) -> Result<RateDecision, StorageError> {
        let quota = match key {
            RateKey::Device(_) => self.policy.max_per_window,
            RateKey::Anonymous(_) => self.policy.anonymous_max_per_window,
        } as usize;

        if quota == 0 {
            return Ok(RateDecision::Rejected {
                retry_after: self.policy.window,
            });
        }

        let since = now - self.policy.window;
        let times = store.submission_times_since(key, since).await?;
        if times.len() < quota {
            return Ok(RateDecision::Allowed);
        }

        // The count drops below quota when the oldest of the last
        // `quota` submissions leaves the window.
        let oldest_counted = times[times.len() - quota];
        let retry_after = (oldest_counted + self.policy.window - now).max(Duration::zero());
        Ok(RateDecision::Rejected { retry_after })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::types::NewMeasurement;
    use crate::storage::MemoryStore;

    fn new_measurement(device_id: Option<&str>) -> NewMeasurement {
        NewMeasurement {
            device_id: device_id.map(String::from),
            latitude: 40.0,
            longitude: -75.0,
            device_azimuth: 180.0,
            device_altitude: 45.0,
            nasa_azimuth: 182.0,
            nasa_altitude: 44.0,
            delta_azimuth: -2.0,
            delta_altitude: 1.0,
        }
    }

    fn limiter(max: u32, anon: u32) -> RateLimiter {
        RateLimiter::new(RateLimitPolicy {
            max_per_window: max,
            anonymous_max_per_window: anon,
            window: Duration::hours(1),
        })
    }

    #[tokio::test]
    async fn allows_until_quota_is_reached() {
        let store = MemoryStore::new();
        let limiter = limiter(3, 1);
        let key = RateKey::Device("d1".into());
        let now = Utc::now();

        for _ in 0..3 {
            assert_eq!(
                limiter.check(&store, &key, now).await.unwrap(),
                RateDecision::Allowed
            );
            store.insert(new_measurement(Some("d1"))).await.unwrap();
        }

        let decision = limiter.check(&store, &key, now).await.unwrap();
        match decision {
            RateDecision::Rejected { retry_after } => {
                assert!(retry_after > Duration::zero());
                assert!(retry_after <= Duration::hours(1));
            }
            RateDecision::Allowed => panic!("expected rejection"),
        }
    }

    #[tokio::test]
    async fn quota_frees_up_after_window_elapses() {
        let store = MemoryStore::new();
        let limiter = limiter(3, 1);
        let key = RateKey::Device("d1".into());

        for _ in 0..3 {
            store.insert(new_measurement(Some("d1"))).await.unwrap();
        }

        let later = Utc::now() + Duration::minutes(61);
        assert_eq!(
            limiter.check(&store, &key, later).await.unwrap(),
            RateDecision::Allowed
        );
    }

    #[tokio::test]
    async fn different_devices_do_not_interfere() {
        let store = MemoryStore::new();
        let limiter = limiter(1, 1);
        let now = Utc::now();

        store.insert(new_measurement(Some("d1"))).await.unwrap();

        let other = RateKey::Device("d2".into());
        assert_eq!(
            limiter.check(&store, &other, now).await.unwrap(),
            RateDecision::Allowed
        );
    }

    #[tokio::test]
    async fn anonymous_submissions_share_the_coarse_bucket() {
        let store = MemoryStore::new();
        let limiter = limiter(10, 1);
        let now = Utc::now();

        store.insert(new_measurement(None)).await.unwrap();

        // Different origin, same bucket.
        let key = RateKey::Anonymous(Some("10.0.0.7".into()));
        assert!(matches!(
            limiter.check(&store, &key, now).await.unwrap(),
            RateDecision::Rejected { .. }
        ));
    }
}
