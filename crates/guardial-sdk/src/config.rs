//! Configuration resolution.
//!
//! Each setting is resolved as explicit value, then `GUARDIAL_*` environment
//! variable, then built-in default. Resolution is layered with the `config`
//! crate so the environment source can be swapped out in tests.

use crate::error::{GuardialError, Result};
use crate::session;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Default Guardial service endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.guardial.in";
/// Customer identifier used when none is configured.
pub const DEFAULT_CUSTOMER_ID: &str = "default";
/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const ENV_PREFIX: &str = "GUARDIAL";

/// Resolved SDK configuration.
#[derive(Clone)]
pub struct GuardialConfig {
    /// API key sent as `X-API-Key`.
    pub api_key: String,
    /// Base URL of the Guardial service, without a trailing slash.
    pub endpoint: String,
    /// Customer identifier attached to every security event.
    pub customer_id: String,
    /// Log remote-call failures.
    pub debug: bool,
    /// Per-call timeout.
    pub timeout: Duration,
    /// Session identifier attached to every security event.
    pub session_id: String,
}

impl GuardialConfig {
    /// Start building a configuration with explicit overrides.
    pub fn builder() -> GuardialConfigBuilder {
        GuardialConfigBuilder::default()
    }

    /// Resolve a configuration purely from the environment and defaults.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }
}

impl fmt::Debug for GuardialConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardialConfig")
            .field("api_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("customer_id", &self.customer_id)
            .field("debug", &self.debug)
            .field("timeout", &self.timeout)
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Builder for [`GuardialConfig`]. Anything left unset falls back to the
/// environment, then to defaults.
#[derive(Debug, Default, Clone)]
pub struct GuardialConfigBuilder {
    api_key: Option<String>,
    endpoint: Option<String>,
    customer_id: Option<String>,
    debug: Option<bool>,
    timeout: Option<Duration>,
    session_id: Option<String>,
}

impl GuardialConfigBuilder {
    /// Set the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the service endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the customer identifier.
    pub fn customer_id(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Enable or disable debug logging of remote-call failures.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a specific session identifier instead of the process one.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Resolve against the process environment.
    pub fn build(self) -> Result<GuardialConfig> {
        self.resolve(None)
    }

    /// Resolve against an explicit set of environment variables instead of
    /// the process environment. Keys are full variable names such as
    /// `GUARDIAL_API_KEY`.
    pub fn build_with_env(self, env: config::Map<String, String>) -> Result<GuardialConfig> {
        self.resolve(Some(env))
    }

    fn resolve(self, env: Option<config::Map<String, String>>) -> Result<GuardialConfig> {
        let environment = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .ignore_empty(true)
            .source(env);

        let settings = config::Config::builder()
            .set_default("endpoint", DEFAULT_ENDPOINT)?
            .set_default("customer_id", DEFAULT_CUSTOMER_ID)?
            .set_default("debug", "false")?
            .set_default("timeout", DEFAULT_TIMEOUT_SECS.to_string())?
            .add_source(environment)
            .set_override_option("api_key", non_empty(self.api_key))?
            .set_override_option("endpoint", non_empty(self.endpoint))?
            .set_override_option("customer_id", non_empty(self.customer_id))?
            .set_override_option("debug", self.debug)?
            .build()?;

        let raw: RawSettings = settings.try_deserialize()?;

        let api_key = raw
            .api_key
            .filter(|key| !key.is_empty())
            .ok_or(GuardialError::MissingApiKey)?;

        let timeout = match self.timeout {
            Some(timeout) if timeout.is_zero() => {
                return Err(GuardialError::InvalidConfig(
                    "timeout must be greater than zero".to_string(),
                ))
            }
            Some(timeout) => timeout,
            None => parse_timeout(&raw.timeout)?,
        };

        Ok(GuardialConfig {
            api_key,
            endpoint: normalize_endpoint(&raw.endpoint)?,
            customer_id: raw.customer_id,
            debug: raw.debug.trim().eq_ignore_ascii_case("true"),
            timeout,
            session_id: self
                .session_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| session::process_session_id().to_string()),
        })
    }
}

/// Settings as they come out of the layered sources.
#[derive(Debug, Deserialize)]
struct RawSettings {
    api_key: Option<String>,
    endpoint: String,
    customer_id: String,
    debug: String,
    timeout: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(GuardialError::InvalidConfig(format!(
            "timeout must be a positive number of seconds, got {:?}",
            raw
        ))),
    }
}

fn normalize_endpoint(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = url::Url::parse(trimmed)
        .map_err(|e| GuardialError::InvalidConfig(format!("endpoint {:?}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(GuardialError::InvalidConfig(format!(
            "endpoint must use http or https, got {:?}",
            url.scheme()
        )));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> config::Map<String, String> {
        vars.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = GuardialConfig::builder()
            .api_key("key-123")
            .build_with_env(env(&[]))
            .unwrap();

        assert_eq!(config.api_key, "key-123");
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.customer_id, DEFAULT_CUSTOMER_ID);
        assert!(!config.debug);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.session_id, session::process_session_id());
    }

    #[test]
    fn test_environment_fills_gaps() {
        let config = GuardialConfig::builder()
            .build_with_env(env(&[
                ("GUARDIAL_API_KEY", "env-key"),
                ("GUARDIAL_ENDPOINT", "http://localhost:9000"),
                ("GUARDIAL_CUSTOMER_ID", "acme"),
                ("GUARDIAL_DEBUG", "true"),
                ("GUARDIAL_TIMEOUT", "5"),
            ]))
            .unwrap();

        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.customer_id, "acme");
        assert!(config.debug);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_values_win_over_environment() {
        let config = GuardialConfig::builder()
            .api_key("explicit-key")
            .endpoint("https://guardial.internal")
            .customer_id("explicit-customer")
            .debug(false)
            .timeout(Duration::from_secs(2))
            .build_with_env(env(&[
                ("GUARDIAL_API_KEY", "env-key"),
                ("GUARDIAL_ENDPOINT", "http://localhost:9000"),
                ("GUARDIAL_CUSTOMER_ID", "env-customer"),
                ("GUARDIAL_DEBUG", "true"),
                ("GUARDIAL_TIMEOUT", "5"),
            ]))
            .unwrap();

        assert_eq!(config.api_key, "explicit-key");
        assert_eq!(config.endpoint, "https://guardial.internal");
        assert_eq!(config.customer_id, "explicit-customer");
        assert!(!config.debug);
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_missing_api_key() {
        let result = GuardialConfig::builder().build_with_env(env(&[]));
        assert!(matches!(result, Err(GuardialError::MissingApiKey)));
    }

    #[test]
    fn test_empty_api_key_counts_as_missing() {
        let result = GuardialConfig::builder()
            .api_key("")
            .build_with_env(env(&[("GUARDIAL_API_KEY", "")]));
        let err = result.unwrap_err();
        assert!(matches!(err, GuardialError::MissingApiKey));
        assert!(err.is_config());
    }

    #[test]
    fn test_empty_explicit_value_falls_back_to_environment() {
        let config = GuardialConfig::builder()
            .api_key("")
            .build_with_env(env(&[("GUARDIAL_API_KEY", "env-key")]))
            .unwrap();
        assert_eq!(config.api_key, "env-key");
    }

    #[test]
    fn test_debug_flag_is_case_insensitive() {
        let config = GuardialConfig::builder()
            .api_key("k")
            .build_with_env(env(&[("GUARDIAL_DEBUG", "TRUE")]))
            .unwrap();
        assert!(config.debug);

        let config = GuardialConfig::builder()
            .api_key("k")
            .build_with_env(env(&[("GUARDIAL_DEBUG", "yes")]))
            .unwrap();
        assert!(!config.debug);
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let config = GuardialConfig::builder()
            .api_key("k")
            .endpoint("http://localhost:8080/")
            .build_with_env(env(&[]))
            .unwrap();
        assert_eq!(config.endpoint, "http://localhost:8080");
    }

    #[test]
    fn test_invalid_endpoint() {
        let result = GuardialConfig::builder()
            .api_key("k")
            .endpoint("not a url")
            .build_with_env(env(&[]));
        assert!(matches!(result, Err(GuardialError::InvalidConfig(_))));

        let result = GuardialConfig::builder()
            .api_key("k")
            .endpoint("ftp://files.example.com")
            .build_with_env(env(&[]));
        assert!(matches!(result, Err(GuardialError::InvalidConfig(_))));
    }

    #[test]
    fn test_invalid_timeout() {
        let result = GuardialConfig::builder()
            .api_key("k")
            .build_with_env(env(&[("GUARDIAL_TIMEOUT", "soon")]));
        assert!(matches!(result, Err(GuardialError::InvalidConfig(_))));

        let result = GuardialConfig::builder()
            .api_key("k")
            .timeout(Duration::ZERO)
            .build_with_env(env(&[]));
        assert!(matches!(result, Err(GuardialError::InvalidConfig(_))));
    }

    #[test]
    fn test_explicit_session_id() {
        let config = GuardialConfig::builder()
            .api_key("k")
            .session_id("session_custom")
            .build_with_env(env(&[]))
            .unwrap();
        assert_eq!(config.session_id, "session_custom");
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let config = GuardialConfig::builder()
            .api_key("super-secret")
            .build_with_env(env(&[]))
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
