//! Counter configuration

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ENV_PREFIX: &str = "ACCELPROF";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be greater than 0")]
    ZeroLimit(&'static str),

    #[error("max host transfer rate must be a positive number of MB/s, got {0}")]
    InvalidRate(f64),

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Number of longest kernel executions kept for the top-kernel report
    pub top_kernel_limit: usize,

    /// Number of longest transfers kept per transfer top list
    pub top_transfer_limit: usize,

    /// Keep one host transfer accumulator per context instead of one overall
    pub per_context_buffer_stats: bool,

    /// Peak host link rate, used to floor reported host transfer times
    pub max_host_transfer_rate_mbps: f64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            top_kernel_limit: env_or("ACCELPROF_TOP_KERNEL_LIMIT", 10),
            top_transfer_limit: env_or("ACCELPROF_TOP_TRANSFER_LIMIT", 10),
            per_context_buffer_stats: env_or("ACCELPROF_PER_CONTEXT_BUFFER_STATS", false),
            max_host_transfer_rate_mbps: env_or("ACCELPROF_MAX_HOST_TRANSFER_RATE_MBPS", 8000.0),
        }
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl CounterConfig {
    /// Load from a TOML/JSON/YAML file, with `ACCELPROF_*` environment
    /// variables taking precedence. Unset keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: CounterConfig = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_kernel_limit == 0 {
            return Err(ConfigError::ZeroLimit("top_kernel_limit"));
        }
        if self.top_transfer_limit == 0 {
            return Err(ConfigError::ZeroLimit("top_transfer_limit"));
        }
        let rate = self.max_host_transfer_rate_mbps;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::InvalidRate(rate));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base() -> CounterConfig {
        CounterConfig {
            top_kernel_limit: 10,
            top_transfer_limit: 10,
            per_context_buffer_stats: false,
            max_host_transfer_rate_mbps: 8000.0,
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(base().validate().is_ok());

        let invalid = CounterConfig {
            top_kernel_limit: 0,
            ..base()
        };
        assert!(matches!(
            invalid.validate(),
            Err(ConfigError::ZeroLimit("top_kernel_limit"))
        ));

        let invalid = CounterConfig {
            top_transfer_limit: 0,
            ..base()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_rates() {
        for rate in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let config = CounterConfig {
                max_host_transfer_rate_mbps: rate,
                ..base()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidRate(_))),
                "rate {} accepted",
                rate
            );
        }
    }

    #[test]
    fn test_load_partial_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "top_kernel_limit = 3").unwrap();
        writeln!(file, "per_context_buffer_stats = true").unwrap();

        let config = CounterConfig::load(file.path()).unwrap();
        assert_eq!(config.top_kernel_limit, 3);
        assert!(config.per_context_buffer_stats);
        // keys missing from the file keep their defaults
        assert_eq!(
            config.top_transfer_limit,
            CounterConfig::default().top_transfer_limit
        );
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "top_transfer_limit = 0").unwrap();

        assert!(CounterConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = CounterConfig::load("/nonexistent/accelprof.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
