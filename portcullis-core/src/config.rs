//! Tunables for the login guard.
//!
//! [`ProtectionConfig::default`] carries the production policy: five failed
//! attempts inside a fifteen minute window lock a client out for thirty
//! minutes, and a sweep runs every five minutes.
//!
//! ## Environment
//!
//! [`ProtectionConfig::from_env`] starts from the defaults and overrides them
//! with any of these variables:
//!
//! - `PORTCULLIS_ENABLED`: `true`/`false`
//! - `PORTCULLIS_MAX_ATTEMPTS`: failures allowed per window
//! - `PORTCULLIS_WINDOW_SECS`: sliding window length
//! - `PORTCULLIS_BLOCK_SECS`: lockout length
//! - `PORTCULLIS_SWEEP_SECS`: background sweep period
//! - `PORTCULLIS_BACKEND_TIMEOUT_SECS`: identity backend timeout (`0` disables it)
//! - `PORTCULLIS_ELEVATED_ROLES`: comma separated role names

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_WINDOW_MINUTES: i64 = 15;
pub const DEFAULT_BLOCK_MINUTES: i64 = 30;
pub const DEFAULT_SWEEP_MINUTES: i64 = 5;
pub const DEFAULT_MAX_EVENTS: usize = 1000;
pub const DEFAULT_MAX_ATTEMPT_RECORDS: usize = 1000;
pub const DEFAULT_SUSPICIOUS_EMAIL_THRESHOLD: usize = 10;
/// Longest duration any setting may hold.
pub const MAX_DURATION_DAYS: i64 = 365;

/// Configuration for the rate limiter, attempt ledger and audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Whether rate limiting is enforced. Threat and credential checks always run.
    pub enabled: bool,
    /// Failures within `window` that trigger a lockout
    pub max_attempts: u32,
    /// Inactivity after which a client's failure count starts over
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// How long a lockout lasts
    #[serde(with = "duration_secs")]
    pub block_duration: Duration,
    /// Period of the background sweep
    #[serde(with = "duration_secs")]
    pub sweep_interval: Duration,
    /// How far back the attempt ledger keeps records
    #[serde(with = "duration_secs")]
    pub attempt_horizon: Duration,
    /// Hard cap on retained attempt records
    pub max_attempt_records: usize,
    /// Hard cap on retained audit events
    pub max_events: usize,
    /// Age after which any audit event is pruned
    #[serde(with = "duration_secs")]
    pub event_retention: Duration,
    /// Age after which `login_attempt` audit events are pruned
    #[serde(with = "duration_secs")]
    pub login_event_retention: Duration,
    /// Distinct emails per client per horizon above which activity is suspicious
    pub suspicious_email_threshold: usize,
    /// Upper bound on the identity backend call
    #[serde(with = "optional_duration_secs")]
    pub backend_timeout: Option<Duration>,
    /// Roles that qualify a principal for access
    pub elevated_roles: Vec<String>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: Duration::minutes(DEFAULT_WINDOW_MINUTES),
            block_duration: Duration::minutes(DEFAULT_BLOCK_MINUTES),
            sweep_interval: Duration::minutes(DEFAULT_SWEEP_MINUTES),
            attempt_horizon: Duration::hours(1),
            max_attempt_records: DEFAULT_MAX_ATTEMPT_RECORDS,
            max_events: DEFAULT_MAX_EVENTS,
            event_retention: Duration::days(7),
            login_event_retention: Duration::hours(24),
            suspicious_email_threshold: DEFAULT_SUSPICIOUS_EMAIL_THRESHOLD,
            backend_timeout: Some(Duration::seconds(10)),
            elevated_roles: vec!["admin".to_string()],
        }
    }
}

impl ProtectionConfig {
    /// Defaults with rate limiting switched off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Records idle for longer than this are removed by the sweep.
    pub fn stale_record_age(&self) -> Duration {
        self.window.checked_mul(2).unwrap_or(Duration::MAX)
    }

    /// Load configuration from `PORTCULLIS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Missing keys keep their default; present but unparseable keys fail.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("PORTCULLIS_ENABLED") {
            config.enabled = parse("PORTCULLIS_ENABLED", &value)?;
        }
        if let Some(value) = lookup("PORTCULLIS_MAX_ATTEMPTS") {
            config.max_attempts = parse("PORTCULLIS_MAX_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("PORTCULLIS_WINDOW_SECS") {
            config.window = parse_secs("PORTCULLIS_WINDOW_SECS", &value)?;
        }
        if let Some(value) = lookup("PORTCULLIS_BLOCK_SECS") {
            config.block_duration = parse_secs("PORTCULLIS_BLOCK_SECS", &value)?;
        }
        if let Some(value) = lookup("PORTCULLIS_SWEEP_SECS") {
            config.sweep_interval = parse_secs("PORTCULLIS_SWEEP_SECS", &value)?;
        }
        if let Some(value) = lookup("PORTCULLIS_BACKEND_TIMEOUT_SECS") {
            let timeout = parse_secs("PORTCULLIS_BACKEND_TIMEOUT_SECS", &value)?;
            config.backend_timeout = (timeout > Duration::zero()).then_some(timeout);
        }
        if let Some(value) = lookup("PORTCULLIS_ELEVATED_ROLES") {
            config.elevated_roles = value
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that the settings describe a usable policy.
    ///
    /// Every duration must be positive and at most [`MAX_DURATION_DAYS`], so
    /// adding one to the current time cannot overflow.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let max_duration = Duration::days(MAX_DURATION_DAYS);
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let durations = [
            ("window", self.window),
            ("block_duration", self.block_duration),
            ("sweep_interval", self.sweep_interval),
            ("attempt_horizon", self.attempt_horizon),
            ("event_retention", self.event_retention),
            ("login_event_retention", self.login_event_retention),
        ];
        let timeout = self.backend_timeout.map(|timeout| ("backend_timeout", timeout));
        for (name, duration) in durations.into_iter().chain(timeout) {
            if duration <= Duration::zero() {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
            if duration > max_duration {
                return Err(ConfigError::Invalid(format!(
                    "{name} must not exceed {MAX_DURATION_DAYS} days"
                )));
            }
        }

        if self.max_events == 0 || self.max_attempt_records == 0 {
            return Err(ConfigError::Invalid(
                "retention caps must be at least 1".to_string(),
            ));
        }

        if self.elevated_roles.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one elevated role is required".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let secs: i64 = parse(key, value)?;
    Duration::try_seconds(secs).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

pub(crate) mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(duration.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(deserializer)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| D::Error::custom(format!("duration of {secs} seconds is out of range")))
    }
}

pub(crate) mod optional_duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        duration: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_some(&duration.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        match Option::<i64>::deserialize(deserializer)? {
            Some(secs) => Duration::try_seconds(secs).map(Some).ok_or_else(|| {
                D::Error::custom(format!("duration of {secs} seconds is out of range"))
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_policy() {
        let config = ProtectionConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.window, Duration::minutes(15));
        assert_eq!(config.block_duration, Duration::minutes(30));
        assert_eq!(config.sweep_interval, Duration::minutes(5));
        assert_eq!(config.stale_record_age(), Duration::minutes(30));
        assert_eq!(config.max_events, 1000);
        assert_eq!(config.event_retention, Duration::days(7));
        assert_eq!(config.login_event_retention, Duration::hours(24));
        assert_eq!(config.suspicious_email_threshold, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_disabled() {
        let config = ProtectionConfig::disabled();
        assert!(!config.enabled);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ProtectionConfig::from_lookup(lookup_from(&[
            ("PORTCULLIS_MAX_ATTEMPTS", "3"),
            ("PORTCULLIS_WINDOW_SECS", "60"),
            ("PORTCULLIS_BLOCK_SECS", " 120 "),
            ("PORTCULLIS_BACKEND_TIMEOUT_SECS", "0"),
            ("PORTCULLIS_ELEVATED_ROLES", "admin, owner,,"),
        ]))
        .unwrap();

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.window, Duration::seconds(60));
        assert_eq!(config.block_duration, Duration::seconds(120));
        assert_eq!(config.backend_timeout, None);
        assert_eq!(config.elevated_roles, vec!["admin", "owner"]);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = ProtectionConfig::from_lookup(lookup_from(&[(
            "PORTCULLIS_MAX_ATTEMPTS",
            "lots",
        )]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "PORTCULLIS_MAX_ATTEMPTS"
        ));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let config = ProtectionConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_durations() {
        let config = ProtectionConfig {
            window: Duration::zero(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProtectionConfig {
            backend_timeout: Some(Duration::seconds(-1)),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_requires_roles() {
        let config = ProtectionConfig {
            elevated_roles: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serde_roundtrip_uses_seconds() {
        let config = ProtectionConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["window"], 900);
        assert_eq!(json["block_duration"], 1800);
        assert_eq!(json["backend_timeout"], 10);

        let parsed: ProtectionConfig =
            serde_json::from_str(r#"{"max_attempts": 3, "backend_timeout": null}"#).unwrap();
        assert_eq!(parsed.max_attempts, 3);
        assert_eq!(parsed.backend_timeout, None);
        assert_eq!(parsed.window, Duration::minutes(15));
    }

    #[test]
    fn test_from_lookup_rejects_out_of_range_seconds() {
        let result = ProtectionConfig::from_lookup(lookup_from(&[(
            "PORTCULLIS_WINDOW_SECS",
            "9223372036854775807",
        )]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref key, .. }) if key == "PORTCULLIS_WINDOW_SECS"
        ));
    }

    #[test]
    fn test_validate_rejects_oversized_durations() {
        let result = ProtectionConfig::from_lookup(lookup_from(&[(
            "PORTCULLIS_BLOCK_SECS",
            "9000000000000000",
        )]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let config = ProtectionConfig {
            backend_timeout: Some(Duration::days(MAX_DURATION_DAYS + 1)),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProtectionConfig {
            window: Duration::days(MAX_DURATION_DAYS),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.stale_record_age(), Duration::days(2 * MAX_DURATION_DAYS));
    }

    #[test]
    fn test_stale_record_age_saturates() {
        let config = ProtectionConfig {
            window: Duration::MAX,
            ..Default::default()
        };
        assert_eq!(config.stale_record_age(), Duration::MAX);
    }

    #[test]
    fn test_serde_rejects_out_of_range_seconds() {
        let result = serde_json::from_str::<ProtectionConfig>(
            r#"{"block_duration": 9223372036854775807}"#,
        );
        assert!(result.is_err());

        let result = serde_json::from_str::<ProtectionConfig>(
            r#"{"backend_timeout": -9223372036854775807}"#,
        );
        assert!(result.is_err());
    }
}
