use chrono::NaiveTime;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub mongodb: MongoConfig,
    pub scheduler: SchedulerConfig,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    /// Unset outside production means "use the in-memory store".
    pub uri: Option<String>,
    pub database: String,
    pub server_selection_timeout_secs: u64,
    /// Set in production: no fallback to memory when MongoDB is unreachable.
    pub required: bool,
}

impl MongoConfig {
    pub fn server_selection_timeout(&self) -> Duration {
        Duration::from_secs(self.server_selection_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Daily run time, UTC.
    pub run_at: NaiveTime,
}

impl CustomerConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;
        Self::from_lookup(common, |key| env::var(key).ok())
    }

    /// Builds the service settings from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(
        common: core_config::Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let is_prod = lookup("ENVIRONMENT").as_deref() == Some("prod");
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let uri = lookup("MONGODB_URI").filter(|uri| !uri.trim().is_empty());
        if is_prod && uri.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "MONGODB_URI is required in production but not set"
            )));
        }

        Ok(CustomerConfig {
            common,
            mongodb: MongoConfig {
                uri,
                database: get("MONGODB_DATABASE", "collection_db"),
                server_selection_timeout_secs: parse(
                    "MONGODB_TIMEOUT_SECS",
                    &get("MONGODB_TIMEOUT_SECS", "8"),
                )?,
                required: is_prod,
            },
            scheduler: SchedulerConfig {
                enabled: parse("ROLLOVER_ENABLED", &get("ROLLOVER_ENABLED", "true"))?,
                run_at: parse_run_at(&get("ROLLOVER_RUN_AT", "00:01"))?,
            },
            log_level: get("LOG_LEVEL", "info"),
            otlp_endpoint: lookup("OTLP_ENDPOINT").filter(|endpoint| !endpoint.is_empty()),
        })
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, value, e))
    })
}

fn parse_run_at(value: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(
            "Invalid value for ROLLOVER_RUN_AT: '{}' (expected HH:MM, {})",
            value,
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<CustomerConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CustomerConfig::from_lookup(core_config::Config::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.mongodb.uri.is_none());
        assert!(!config.mongodb.required);
        assert_eq!(config.mongodb.database, "collection_db");
        assert_eq!(config.mongodb.server_selection_timeout(), Duration::from_secs(8));
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.run_at, NaiveTime::from_hms_opt(0, 1, 0).unwrap());
        assert_eq!(config.log_level, "info");
        assert!(config.otlp_endpoint.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MONGODB_URI", "mongodb://db:27017"),
            ("MONGODB_TIMEOUT_SECS", "3"),
            ("ROLLOVER_ENABLED", "false"),
            ("ROLLOVER_RUN_AT", "06:30"),
        ])
        .unwrap();
        assert_eq!(config.mongodb.uri.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(config.mongodb.server_selection_timeout_secs, 3);
        assert!(!config.scheduler.enabled);
        assert_eq!(config.scheduler.run_at, NaiveTime::from_hms_opt(6, 30, 0).unwrap());
    }

    #[test]
    fn test_prod_requires_mongodb_uri() {
        let err = load(&[("ENVIRONMENT", "prod")]).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
        let config = load(&[("ENVIRONMENT", "prod"), ("MONGODB_URI", "mongodb://db")]).unwrap();
        assert!(config.mongodb.required);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        for vars in [
            [("ROLLOVER_RUN_AT", "25:00")],
            [("ROLLOVER_RUN_AT", "noon")],
            [("MONGODB_TIMEOUT_SECS", "eight")],
            [("ROLLOVER_ENABLED", "maybe")],
        ] {
            assert!(matches!(load(&vars), Err(AppError::ConfigError(_))));
        }
    }
}
