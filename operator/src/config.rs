use std::net::SocketAddr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

fn parse_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration::parse(&raw).map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbesConfig {
    pub addr: SocketAddr,
    #[serde(deserialize_with = "parse_duration")]
    pub write_timeout: Duration,
    #[serde(deserialize_with = "parse_duration")]
    pub read_timeout: Duration,
    #[serde(deserialize_with = "parse_duration")]
    pub shutdown_timeout: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub cluster_name: String,
    pub metrics_bind_address: SocketAddr,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PeriodicMetricsReporterConfig {
    #[serde(deserialize_with = "parse_duration")]
    pub initial_delay: Duration,
    #[serde(deserialize_with = "parse_duration")]
    pub report_interval: Duration,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub probes: ProbesConfig,
    pub logging: LoggingConfig,
    pub periodic_metrics_reporter: PeriodicMetricsReporterConfig,
}

impl AppConfig {
    /// Loads configuration from `appconfig.<env>.yaml` (or `appconfig.yaml`
    /// when `APPLICATION_ENVIRONMENT` is unset), then layers environment
    /// overrides under the `ARCANE_OPERATOR_` prefix on top, e.g.
    /// `ARCANE_OPERATOR_PROBES__ADDR` overrides `probes.addr`.
    pub fn load() -> Result<Self, Error> {
        let env = std::env::var("APPLICATION_ENVIRONMENT").unwrap_or_default().to_lowercase();
        let file_name = if env.is_empty() { "appconfig.yaml".to_string() } else { format!("appconfig.{env}.yaml") };

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&file_name).required(false))
            .add_source(config::Environment::with_prefix("ARCANE_OPERATOR").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_from_environment_when_no_file_present() {
        // SAFETY: tests run single-threaded within this module via the harness's default isolation.
        unsafe {
            std::env::set_var("ARCANE_OPERATOR_PROBES__ADDR", "0.0.0.0:8080");
            std::env::set_var("ARCANE_OPERATOR_PROBES__WRITE_TIMEOUT", "5s");
            std::env::set_var("ARCANE_OPERATOR_PROBES__READ_TIMEOUT", "5s");
            std::env::set_var("ARCANE_OPERATOR_PROBES__SHUTDOWN_TIMEOUT", "10s");
            std::env::set_var("ARCANE_OPERATOR_LOGGING__CLUSTER_NAME", "test-cluster");
            std::env::set_var("ARCANE_OPERATOR_LOGGING__METRICS_BIND_ADDRESS", "0.0.0.0:9090");
            std::env::set_var("ARCANE_OPERATOR_LOGGING__LOG_LEVEL", "info");
            std::env::set_var("ARCANE_OPERATOR_PERIODIC_METRICS_REPORTER__INITIAL_DELAY", "30s");
            std::env::set_var("ARCANE_OPERATOR_PERIODIC_METRICS_REPORTER__REPORT_INTERVAL", "60s");
        }

        let config = AppConfig::load().expect("config should parse from env overrides alone");
        assert_eq!(config.logging.cluster_name, "test-cluster");
        assert_eq!(config.periodic_metrics_reporter.initial_delay, Duration::from_secs(30));
    }
}
