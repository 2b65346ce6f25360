use serde::Deserialize;
use std::time::Duration;

use crate::prohibition::error::{Error, Result};

/// Environment variable overriding [`ControllerConfig::confirm_interval_ms`]
pub const ENV_CONFIRM_INTERVAL_MS: &str = "PROHIBITION_CONFIRM_INTERVAL_MS";

/// Environment variable overriding [`ControllerConfig::confirm_max_retries`]
pub const ENV_CONFIRM_MAX_RETRIES: &str = "PROHIBITION_CONFIRM_MAX_RETRIES";

/// Configuration for the prohibition controller
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Wait between two group-exit confirmation polls (milliseconds)
    pub confirm_interval_ms: u64,

    /// Confirmation polls before the suspension is rolled back
    pub confirm_max_retries: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            confirm_interval_ms: 1000,
            confirm_max_retries: 5,
        }
    }
}

impl ControllerConfig {
    /// Create a configuration with the default confirmation window
    ///
    /// # Example
    ///
    /// ```
    /// use mq_consume_prohibition::prohibition::ControllerConfig;
    ///
    /// let config = ControllerConfig::new()
    ///     .with_confirm_interval_ms(200)
    ///     .with_confirm_max_retries(10);
    /// assert_eq!(config.confirmation_window().as_millis(), 2000);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confirmation poll interval in milliseconds (builder pattern)
    pub fn with_confirm_interval_ms(mut self, interval_ms: u64) -> Self {
        self.confirm_interval_ms = interval_ms;
        self
    }

    /// Set the maximum number of confirmation polls (builder pattern)
    pub fn with_confirm_max_retries(mut self, max_retries: u32) -> Self {
        self.confirm_max_retries = max_retries;
        self
    }

    /// Read overrides from the environment on top of the defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_CONFIRM_INTERVAL_MS) {
            config.confirm_interval_ms = value.trim().parse().map_err(|_| {
                Error::ConfigError(format!("{} is not a number: {}", ENV_CONFIRM_INTERVAL_MS, value))
            })?;
        }

        if let Some(value) = lookup(ENV_CONFIRM_MAX_RETRIES) {
            config.confirm_max_retries = value.trim().parse().map_err(|_| {
                Error::ConfigError(format!("{} is not a number: {}", ENV_CONFIRM_MAX_RETRIES, value))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the confirmation loop meaningless
    pub fn validate(&self) -> Result<()> {
        if self.confirm_interval_ms == 0 {
            return Err(Error::ConfigError(
                "confirm_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.confirm_max_retries == 0 {
            return Err(Error::ConfigError(
                "confirm_max_retries must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn confirm_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_interval_ms)
    }

    /// Upper bound on how long a suspension can stay unconfirmed
    pub fn confirmation_window(&self) -> Duration {
        self.confirm_interval() * self.confirm_max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = ControllerConfig::default();
        assert_eq!(config.confirm_interval_ms, 1000);
        assert_eq!(config.confirm_max_retries, 5);
        assert_eq!(config.confirmation_window(), Duration::from_secs(5));
    }

    #[test]
    fn test_config_builder() {
        let config = ControllerConfig::new()
            .with_confirm_interval_ms(50)
            .with_confirm_max_retries(3);
        assert_eq!(config.confirm_interval(), Duration::from_millis(50));
        assert_eq!(config.confirm_max_retries, 3);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ControllerConfig::from_lookup(lookup(&[
            (ENV_CONFIRM_INTERVAL_MS, "250"),
            (ENV_CONFIRM_MAX_RETRIES, " 8 "),
        ]))
        .unwrap();
        assert_eq!(config.confirm_interval_ms, 250);
        assert_eq!(config.confirm_max_retries, 8);
    }

    #[test]
    fn test_from_lookup_without_overrides() {
        let config = ControllerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let err = ControllerConfig::from_lookup(lookup(&[(ENV_CONFIRM_MAX_RETRIES, "five")]))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_validate_rejects_zero() {
        assert!(ControllerConfig::new().with_confirm_interval_ms(0).validate().is_err());
        assert!(ControllerConfig::new().with_confirm_max_retries(0).validate().is_err());
    }

    #[test]
    fn test_config_deserialization() {
        let config: ControllerConfig =
            serde_json::from_str(r#"{"confirm_max_retries":2}"#).unwrap();
        assert_eq!(config.confirm_max_retries, 2);
        assert_eq!(config.confirm_interval_ms, 1000);
    }
}
