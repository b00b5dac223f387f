//! Funnel configuration: load/save from the app data directory.

use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Slowest typewriter accepted from a config file.
pub const MAX_TYPEWRITER_SPEED_MS: u64 = 1_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FunnelConfig {
    /// Product-match endpoint (direct value).
    pub product_url: Option<String>,
    /// Or read the endpoint from this environment variable.
    pub product_url_env: Option<String>,
    /// Contact-submission endpoint (direct value).
    pub contact_url: Option<String>,
    /// Or read the endpoint from this environment variable.
    pub contact_url_env: Option<String>,

    /// Inactivity window before the spirit nudges the user.
    pub idle_timeout_ms: u64,
    /// How long a nudge stays up before the previous message returns.
    pub nudge_hold_ms: u64,
    /// Chance of a digression between two questions.
    pub digression_probability: f64,
    /// "Another one" requests allowed before the cool-down kicks in.
    pub retry_limit: u32,
    pub retry_cooldown_ms: u64,
    /// Beat between pressing start and the first question.
    pub start_beat_ms: u64,
    /// Delay before the welcome bubble appears.
    pub bubble_delay_ms: u64,
    /// How long the thank-you message stays before the funnel restarts.
    pub thank_you_hold_ms: u64,
    /// Typewriter speed per character.
    pub typewriter_speed_ms: u64,
    /// A previous visit within this many hours marks a returning visitor.
    pub returning_window_hours: i64,

    pub http_max_retries: u32,
    pub http_timeout_secs: u64,

    /// Optional dialogue pack replacing the built-in script.
    pub dialogue_path: Option<PathBuf>,
    /// Where the last-visit store lives; defaults to the platform data dir.
    pub store_path: Option<PathBuf>,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            product_url: None,
            product_url_env: Some("FOREST_GUIDE_PRODUCT_URL".to_string()),
            contact_url: None,
            contact_url_env: Some("FOREST_GUIDE_CONTACT_URL".to_string()),
            idle_timeout_ms: 20_000,
            nudge_hold_ms: 3_000,
            digression_probability: super::digression::DIGRESSION_PROBABILITY,
            retry_limit: super::personality::RETRY_LIMIT,
            retry_cooldown_ms: 10_000,
            start_beat_ms: 1_000,
            bubble_delay_ms: 500,
            thank_you_hold_ms: 3_000,
            typewriter_speed_ms: 50,
            returning_window_hours: 24,
            http_max_retries: 2,
            http_timeout_secs: 15,
            dialogue_path: None,
            store_path: None,
        }
    }
}

impl FunnelConfig {
    pub fn resolve_product_url(&self) -> Option<String> {
        crate::config::resolve_setting(&self.product_url, &self.product_url_env)
    }

    pub fn resolve_contact_url(&self) -> Option<String> {
        crate::config::resolve_setting(&self.contact_url, &self.contact_url_env)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Saturates at the largest representable span; `validate` rejects
    /// windows that would need it.
    pub fn returning_window(&self) -> chrono::Duration {
        chrono::Duration::try_hours(self.returning_window_hours).unwrap_or(chrono::Duration::MAX)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.digression_probability) {
            return Err(ConfigError::Invalid {
                field: "digression_probability",
                reason: format!("{} is not within 0..=1", self.digression_probability),
            });
        }
        if self.retry_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "retry_limit",
                reason: "must allow at least one retry".to_string(),
            });
        }
        if self.idle_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "idle_timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.returning_window_hours < 0 {
            return Err(ConfigError::Invalid {
                field: "returning_window_hours",
                reason: "must not be negative".to_string(),
            });
        }
        if chrono::Duration::try_hours(self.returning_window_hours).is_none() {
            return Err(ConfigError::Invalid {
                field: "returning_window_hours",
                reason: format!("{} hours is out of range", self.returning_window_hours),
            });
        }
        if self.typewriter_speed_ms > MAX_TYPEWRITER_SPEED_MS {
            return Err(ConfigError::Invalid {
                field: "typewriter_speed_ms",
                reason: format!(
                    "{} exceeds {}ms per character",
                    self.typewriter_speed_ms, MAX_TYPEWRITER_SPEED_MS
                ),
            });
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> FunnelConfig {
    crate::config::load_json_config(path, "Config")
}

pub fn save_config(path: &Path, config: &FunnelConfig) -> Result<(), ConfigError> {
    crate::config::save_json_config(path, config, "Config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = FunnelConfig::default();
        config.validate().unwrap();
        assert_eq!(config.retry_limit, 3);
        assert!((config.digression_probability - 0.35).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("funnel.json");
        std::fs::write(&path, r#"{ "idle_timeout_ms": 5000, "retry_limit": 5 }"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.idle_timeout_ms, 5000);
        assert_eq!(config.retry_limit, 5);
        assert_eq!(config.retry_cooldown_ms, 10_000);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let config = FunnelConfig {
            digression_probability: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = FunnelConfig {
            retry_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn huge_returning_window_is_rejected_not_panicking() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("funnel.json");
        std::fs::write(&path, r#"{ "returning_window_hours": 9000000000000 }"#).unwrap();

        let config = load_config(&path);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "returning_window_hours",
                ..
            })
        ));
        assert_eq!(config.returning_window(), chrono::Duration::MAX);
    }

    #[test]
    fn slow_typewriter_is_rejected() {
        let config = FunnelConfig {
            typewriter_speed_ms: u64::MAX,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "typewriter_speed_ms",
                ..
            })
        ));

        let config = FunnelConfig {
            typewriter_speed_ms: MAX_TYPEWRITER_SPEED_MS,
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn direct_url_wins() {
        let config = FunnelConfig {
            product_url: Some("http://localhost/match".to_string()),
            product_url_env: None,
            ..Default::default()
        };
        assert_eq!(
            config.resolve_product_url().as_deref(),
            Some("http://localhost/match")
        );
    }
}
