//! Bus configuration module
//!
//! Sprint S-5: Connection settings for the durable message bus.
//! Handles loading configuration from environment variables and applying
//! production defaults before a connection attempt.

use crate::error::BusError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default reconnect wait / connection timeout when unset
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default maximum reconnect attempts when unset
pub const DEFAULT_MAX_RECONNECT: usize = 5;

/// Message bus connection configuration
///
/// `timeout` and `max_reconnect` are zero-valued when unset; defaults are
/// applied by [`BusConfig::normalized`] before connecting.
#[derive(Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// NATS server URL(s) - comma-separated for multiple servers
    pub url: String,

    /// Client display name, shown in broker monitoring
    pub name: String,

    /// Username for broker authentication
    pub user: String,

    /// Password for broker authentication
    pub password: String,

    /// Connection timeout and reconnect wait (0 = use default)
    #[serde(default)]
    pub timeout: Duration,

    /// Maximum reconnect attempts (0 = use default)
    #[serde(default)]
    pub max_reconnect: usize,
}

impl BusConfig {
    /// Create a configuration with default timeout and reconnect policy
    pub fn new(
        url: impl Into<String>,
        name: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            user: user.into(),
            password: password.into(),
            timeout: Duration::ZERO,
            max_reconnect: 0,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BusError> {
        dotenvy::dotenv().ok();

        let url = env::var("NATS_URL")
            .map_err(|_| BusError::Config("NATS_URL must be set".to_string()))?;

        let name = env::var("BUS_NAME")
            .map_err(|_| BusError::Config("BUS_NAME must be set".to_string()))?;

        let user = env::var("NATS_USER")
            .map_err(|_| BusError::Config("NATS_USER must be set".to_string()))?;

        let password = env::var("NATS_PASSWORD")
            .map_err(|_| BusError::Config("NATS_PASSWORD must be set".to_string()))?;

        let timeout_secs: u64 = env::var("BUS_TIMEOUT_SECS")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|e| BusError::Config(format!("BUS_TIMEOUT_SECS must be a valid number: {e}")))?;

        let max_reconnect: usize = env::var("BUS_MAX_RECONNECT")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|e| {
                BusError::Config(format!("BUS_MAX_RECONNECT must be a valid number: {e}"))
            })?;

        Ok(Self {
            url,
            name,
            user,
            password,
            timeout: Duration::from_secs(timeout_secs),
            max_reconnect,
        })
    }

    /// Validate required fields
    ///
    /// `name`, `user` and `password` must be non-empty; the broker rejects
    /// anonymous connections in every deployed environment.
    pub fn validate(&self) -> Result<(), BusError> {
        if self.name.is_empty() {
            return Err(BusError::Config("bus name is required".to_string()));
        }
        if self.user.is_empty() {
            return Err(BusError::Config("bus user is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(BusError::Config("bus password is required".to_string()));
        }
        Ok(())
    }

    /// Return a copy with defaults applied to zero-valued fields
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if config.timeout.is_zero() {
            config.timeout = DEFAULT_TIMEOUT;
        }
        if config.max_reconnect == 0 {
            config.max_reconnect = DEFAULT_MAX_RECONNECT;
        }
        config
    }
}

// Manual Debug so credentials never end up in logs.
impl std::fmt::Debug for BusConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusConfig")
            .field("url", &self.url)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("max_reconnect", &self.max_reconnect)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> BusConfig {
        BusConfig::new("nats://localhost:4222", "billing", "svc", "hunter2")
    }

    #[test]
    fn validate_accepts_complete_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_required_fields() {
        let mut config = valid_config();
        config.name = String::new();
        assert!(matches!(config.validate(), Err(BusError::Config(_))));

        let mut config = valid_config();
        config.user = String::new();
        assert!(matches!(config.validate(), Err(BusError::Config(_))));

        let mut config = valid_config();
        config.password = String::new();
        assert!(matches!(config.validate(), Err(BusError::Config(_))));
    }

    #[test]
    fn normalized_applies_defaults_to_zero_values() {
        let config = valid_config().normalized();
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.max_reconnect, DEFAULT_MAX_RECONNECT);
    }

    #[test]
    fn normalized_preserves_explicit_values() {
        let mut config = valid_config();
        config.timeout = Duration::from_secs(5);
        config.max_reconnect = 12;

        let config = config.normalized();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_reconnect, 12);
    }

    #[test]
    fn debug_redacts_password() {
        let rendered = format!("{:?}", valid_config());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("hunter2"));
    }
}
