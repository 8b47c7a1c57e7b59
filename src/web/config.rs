use chrono::Duration;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::measurement::RateLimitPolicy;
use crate::verdict::VerdictPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub verdict: VerdictConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_per_window")]
    pub max_per_window: u32,
    #[serde(default = "default_anonymous_max_per_window")]
    pub anonymous_max_per_window: u32,
    #[serde(default = "default_window", deserialize_with = "deserialize_duration")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig {
            max_per_window: default_max_per_window(),
            anonymous_max_per_window: default_anonymous_max_per_window(),
            window: default_window(),
        }
    }
}

impl RateLimitConfig {
    pub fn policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            max_per_window: self.max_per_window,
            anonymous_max_per_window: self.anonymous_max_per_window,
            window: self.window,
        }
    }
}

fn default_max_per_window() -> u32 {
    60
}

fn default_anonymous_max_per_window() -> u32 {
    10
}

fn default_window() -> Duration {
    Duration::hours(1)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    #[serde(
        default = "default_future_tolerance",
        deserialize_with = "deserialize_duration"
    )]
    pub future_tolerance: Duration,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        ValidationConfig {
            future_tolerance: default_future_tolerance(),
        }
    }
}

fn default_future_tolerance() -> Duration {
    Duration::minutes(5)
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerdictConfig {
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold_deg: f64,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    #[serde(
        default = "default_analysis_window",
        deserialize_with = "deserialize_duration"
    )]
    pub analysis_window: Duration,
}

impl Default for VerdictConfig {
    fn default() -> Self {
        VerdictConfig {
            outlier_threshold_deg: default_outlier_threshold(),
            confidence_threshold: default_confidence_threshold(),
            analysis_window: default_analysis_window(),
        }
    }
}

impl VerdictConfig {
    pub fn policy(&self) -> VerdictPolicy {
        VerdictPolicy {
            outlier_threshold_deg: self.outlier_threshold_deg,
            confidence_threshold: self.confidence_threshold,
            analysis_window: self.analysis_window,
        }
    }
}

fn default_outlier_threshold() -> f64 {
    20.0
}

fn default_confidence_threshold() -> f64 {
    85.0
}

fn default_analysis_window() -> Duration {
    Duration::hours(24)
}

/// Durations are written humantime-style ("1h", "5m", "90s").
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let std = humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)?;
    Duration::from_std(std).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_gets_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.web.bind, "0.0.0.0:8080");
        assert!(config.database.is_none());
        assert_eq!(config.rate_limit.max_per_window, 60);
        assert_eq!(config.rate_limit.window, Duration::hours(1));
        assert_eq!(config.validation.future_tolerance, Duration::minutes(5));
        assert_eq!(config.verdict.outlier_threshold_deg, 20.0);
    }

    #[test]
    fn durations_parse_humantime_strings() {
        let yaml = "
rate_limit:
  max_per_window: 3
  window: 30m
validation:
  future_tolerance: 90s
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.rate_limit.max_per_window, 3);
        assert_eq!(config.rate_limit.window, Duration::minutes(30));
        assert_eq!(config.validation.future_tolerance, Duration::seconds(90));
    }

    #[test]
    fn bad_duration_is_a_parse_error() {
        let yaml = "rate_limit:\n  window: nonsense\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }
}
