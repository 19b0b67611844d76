//! Sync pipeline settings from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `SYNC_CONCURRENCY` | 5 |
//! | `SYNC_MAX_ATTEMPTS` | 3 |
//! | `SYNC_BACKOFF_BASE_MS` | 2000 |
//! | `SYNC_POLL_INTERVAL_MS` | 250 |
//! | `SYNC_KEEP_COMPLETED` | 100 |
//! | `SYNC_KEEP_FAILED` | 50 |
//! | `LOG_LEVEL` | `info` |

use std::str::FromStr;
use std::time::Duration;

use crate::jobs::{JobExecutorConfig, RetentionPolicy, RetryPolicy};

const LOG_LEVELS: [&str; 4] = ["error", "warn", "info", "debug"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub concurrency: usize,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub poll_interval: Duration,
    pub retention: RetentionPolicy,
    pub log_level: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            concurrency: 5,
            max_attempts: 3,
            backoff_base: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(250),
            retention: RetentionPolicy::default(),
            log_level: "info".to_string(),
        }
    }
}

impl SyncSettings {
    /// Read the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let concurrency: usize = parse(&lookup, "SYNC_CONCURRENCY", defaults.concurrency)?;
        if concurrency == 0 {
            return Err(invalid("SYNC_CONCURRENCY", "0"));
        }

        let log_level = match lookup("LOG_LEVEL") {
            None => defaults.log_level,
            Some(level) => {
                let normalized = level.trim().to_lowercase();
                if !LOG_LEVELS.contains(&normalized.as_str()) {
                    return Err(invalid("LOG_LEVEL", &level));
                }
                normalized
            }
        };

        Ok(Self {
            concurrency,
            max_attempts: parse(&lookup, "SYNC_MAX_ATTEMPTS", defaults.max_attempts)?,
            backoff_base: Duration::from_millis(parse(
                &lookup,
                "SYNC_BACKOFF_BASE_MS",
                defaults.backoff_base.as_millis() as u64,
            )?),
            poll_interval: Duration::from_millis(parse(
                &lookup,
                "SYNC_POLL_INTERVAL_MS",
                defaults.poll_interval.as_millis() as u64,
            )?),
            retention: RetentionPolicy {
                keep_completed: parse(&lookup, "SYNC_KEEP_COMPLETED", defaults.retention.keep_completed)?,
                keep_failed: parse(&lookup, "SYNC_KEEP_FAILED", defaults.retention.keep_failed)?,
            },
            log_level,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_attempts, self.backoff_base)
    }

    pub fn executor_config(&self) -> JobExecutorConfig {
        JobExecutorConfig::default()
            .with_concurrency(self.concurrency)
            .with_poll_interval(self.poll_interval)
            .with_retention(self.retention)
    }

    /// Install the JSON log subscriber with `log_level` as the default
    /// filter. `RUST_LOG` still takes precedence.
    pub fn init_logging(&self) {
        tally_observability::init_with_filter(&self.log_level);
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| invalid(key, &raw)),
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(pairs: &[(&str, &str)]) -> Result<SyncSettings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncSettings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let s = settings(&[]).unwrap();
        assert_eq!(s, SyncSettings::default());
        assert_eq!(s.retry_policy(), RetryPolicy::default());
        assert_eq!(s.executor_config().concurrency, 5);
    }

    #[test]
    fn overrides_are_applied() {
        let s = settings(&[
            ("SYNC_CONCURRENCY", "2"),
            ("SYNC_MAX_ATTEMPTS", "5"),
            ("SYNC_BACKOFF_BASE_MS", "100"),
            ("SYNC_KEEP_FAILED", "10"),
            ("LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();

        assert_eq!(s.concurrency, 2);
        assert_eq!(s.retry_policy().max_attempts, 5);
        assert_eq!(s.retry_policy().delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(s.retention.keep_failed, 10);
        assert_eq!(s.retention.keep_completed, 100);
        assert_eq!(s.log_level, "debug");
    }

    #[test]
    fn configured_level_drives_logging() {
        let s = settings(&[("LOG_LEVEL", "WARN")]).unwrap();
        s.init_logging();
        s.init_logging();
        tracing::warn!(log_level = %s.log_level, "logging initialized");
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            settings(&[("SYNC_CONCURRENCY", "0")]),
            Err(ConfigError::Invalid {
                key: "SYNC_CONCURRENCY".to_string(),
                value: "0".to_string()
            })
        );
        assert!(settings(&[("SYNC_MAX_ATTEMPTS", "three")]).is_err());
        assert!(settings(&[("LOG_LEVEL", "verbose")]).is_err());
    }
}
