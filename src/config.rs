use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use thiserror::Error;

use crate::application::batcher::DEFAULT_MAX_BATCH_BYTES;
use crate::application::transmitter::TransmissionSettings;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("{0}")]
    Inconsistent(String),
}

/// Runtime settings read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct OutboxConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub broker_url: Option<String>,
    pub broker_timeout: StdDuration,
    pub max_batch_bytes: usize,
    pub lock_duration: Duration,
    pub lock_duration_buffer: Duration,
    pub poll_interval: StdDuration,
    pub scheduler_enabled: bool,
    pub claim_batch_size: i64,
    pub random_eids: bool,
}

impl OutboxConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let scheduler_enabled = parse_or(&lookup, "OUTBOX_SCHEDULER_ENABLED", true)?;
        let broker_url = lookup("EVENT_BROKER_URL");

        let config = Self {
            database_url,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            broker_url,
            broker_timeout: StdDuration::from_secs(parse_or(
                &lookup,
                "EVENT_BROKER_TIMEOUT_SECS",
                30,
            )?),
            max_batch_bytes: parse_or(
                &lookup,
                "EVENT_BROKER_MAX_BATCH_BYTES",
                DEFAULT_MAX_BATCH_BYTES,
            )?,
            lock_duration: parse_seconds_or(&lookup, "OUTBOX_LOCK_DURATION_SECS", 600)?,
            lock_duration_buffer: parse_seconds_or(
                &lookup,
                "OUTBOX_LOCK_DURATION_BUFFER_SECS",
                60,
            )?,
            poll_interval: StdDuration::from_millis(parse_or(
                &lookup,
                "OUTBOX_POLL_INTERVAL_MS",
                1000,
            )?),
            scheduler_enabled,
            claim_batch_size: parse_or(&lookup, "OUTBOX_CLAIM_BATCH_SIZE", 1000)?,
            random_eids: parse_or(&lookup, "OUTBOX_RANDOM_EIDS", false)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler_enabled {
            let url = self
                .broker_url
                .as_deref()
                .ok_or(ConfigError::Missing("EVENT_BROKER_URL"))?;
            if reqwest::Url::parse(url).is_err() {
                return Err(ConfigError::Invalid {
                    key: "EVENT_BROKER_URL",
                    value: url.to_string(),
                });
            }
        }
        if self.claim_batch_size <= 0 {
            return Err(ConfigError::Invalid {
                key: "OUTBOX_CLAIM_BATCH_SIZE",
                value: self.claim_batch_size.to_string(),
            });
        }
        if self.lock_duration <= Duration::zero() {
            return Err(ConfigError::Invalid {
                key: "OUTBOX_LOCK_DURATION_SECS",
                value: self.lock_duration.num_seconds().to_string(),
            });
        }
        if self.lock_duration_buffer >= self.lock_duration {
            return Err(ConfigError::Inconsistent(
                "OUTBOX_LOCK_DURATION_BUFFER_SECS must be shorter than OUTBOX_LOCK_DURATION_SECS"
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn transmission_settings(&self) -> TransmissionSettings {
        TransmissionSettings {
            lock_duration: self.lock_duration,
            lock_duration_buffer: self.lock_duration_buffer,
            claim_batch_size: self.claim_batch_size,
            max_batch_bytes: self.max_batch_bytes,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => {
            let parsed = value.trim().parse::<T>();
            parsed.map_err(|_| ConfigError::Invalid { key, value })
        }
    }
}

/// Non-negative whole seconds; anything chrono cannot represent is invalid.
fn parse_seconds_or<F>(lookup: &F, key: &'static str, default: u32) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let seconds: u64 = parse_or(lookup, key, u64::from(default))?;
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigError::Invalid {
            key,
            value: seconds.to_string(),
        })
}
