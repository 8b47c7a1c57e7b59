mod delta;
mod pipeline;
mod rate_limit;
mod stats;
mod types;
mod validate;

pub use delta::{deltas, wrap_signed};
pub use pipeline::{IngestError, IngestionPipeline};
pub use rate_limit::{RateDecision, RateLimitPolicy, RateLimiter};
pub use stats::{daily_stats, to_csv, DailyStats};
pub use types::{MeasurementRecord, MeasurementSubmission, NewMeasurement, RateKey, ValidatedSubmission};
pub use validate::{check_range, validate, ValidationError};
