use thiserror::Error;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("non-finite {0}")]
    NonFiniteInput(&'static str),
    #[error("timestamp outside supported ephemeris range (year {0})")]
    UnsupportedEpoch(i32),
    #[error("solar position computation failed: {0}")]
    Computation(String),
}
