// Configuration management

use crate::core::errors::AdtError;
use crate::core::resilience::RetryPolicy;
use secrecy::{ExposeSecret, Secret};
use std::env;
use std::time::Duration;

const MAX_RETRY_LIMIT: u32 = 10;

/// Backend connection settings loaded from environment variables
///
/// All configuration is validated on load; a missing required value is a
/// startup error, never a runtime one.
#[derive(Debug)]
pub struct Config {
    // Backend location
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
    pub service_root: String,

    // Logon
    pub client: String,
    pub username: String,
    password: Secret<String>,
    pub language: String,

    // Transport
    pub insecure_tls: bool,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, AdtError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // Ignore errors (file may not exist)
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AdtError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let use_tls = Self::parse_bool_or_default(&get, "ADT_USE_TLS", true)?;
        let default_port = if use_tls { 443 } else { 80 };

        let config = Self {
            host: Self::get_required(&get, "ADT_HOST")?,
            port: Self::parse_port(&get, default_port)?,
            use_tls,
            service_root: Self::get_or_default(&get, "ADT_SERVICE_ROOT", "/sap/bc/adt"),
            client: Self::get_required(&get, "ADT_CLIENT")?,
            username: Self::get_required(&get, "ADT_USERNAME")?,
            password: Secret::new(Self::get_required(&get, "ADT_PASSWORD")?),
            language: Self::get_or_default(&get, "ADT_LANGUAGE", "EN"),
            insecure_tls: Self::parse_bool_or_default(&get, "ADT_INSECURE_TLS", false)?,
            request_timeout_secs: Self::parse_u64_or_default(&get, "ADT_TIMEOUT_SECS", 30)?,
            max_retries: Self::parse_retries(&get)?,
            retry_backoff_ms: Self::parse_u64_or_default(&get, "ADT_RETRY_BACKOFF_MS", 200)?,
            log_level: Self::get_or_default(&get, "LOG_LEVEL", "info"),
            log_format: Self::get_or_default(&get, "LOG_FORMAT", "text"),
        };

        // Post-load validation
        config.validate()?;

        Ok(config)
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Scheme, host, port and service root, e.g. `https://host:44300/sap/bc/adt`
    pub fn base_endpoint(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!(
            "{}://{}:{}{}",
            scheme,
            self.host,
            self.port,
            self.service_root.trim_end_matches('/')
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    fn get_required<G>(get: &G, key: &str) -> Result<String, AdtError>
    where
        G: Fn(&str) -> Option<String>,
    {
        get(key).ok_or_else(|| AdtError::Configuration(format!("{} not set", key)))
    }

    fn get_or_default<G>(get: &G, key: &str, default: &str) -> String
    where
        G: Fn(&str) -> Option<String>,
    {
        get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse_bool_or_default<G>(get: &G, key: &str, default: bool) -> Result<bool, AdtError>
    where
        G: Fn(&str) -> Option<String>,
    {
        match get(key) {
            None => Ok(default),
            Some(value) => match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(AdtError::Configuration(format!(
                    "Invalid {} value '{}': expected true or false",
                    key, value
                ))),
            },
        }
    }

    /// Parse port from ADT_PORT, defaulting by scheme
    fn parse_port<G>(get: &G, default: u16) -> Result<u16, AdtError>
    where
        G: Fn(&str) -> Option<String>,
    {
        let Some(port_str) = get("ADT_PORT") else {
            return Ok(default);
        };
        let port = port_str.trim().parse::<u16>().map_err(|e| {
            AdtError::Configuration(format!("Invalid ADT_PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(AdtError::Configuration(
                "ADT_PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    /// Parse u64 from environment variable or return default
    fn parse_u64_or_default<G>(get: &G, key: &str, default: u64) -> Result<u64, AdtError>
    where
        G: Fn(&str) -> Option<String>,
    {
        match get(key) {
            Some(value) => {
                let parsed = value.trim().parse::<u64>().map_err(|e| {
                    AdtError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(AdtError::Configuration(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            None => Ok(default),
        }
    }

    /// Zero retries is allowed; the upper bound keeps backoff short
    fn parse_retries<G>(get: &G) -> Result<u32, AdtError>
    where
        G: Fn(&str) -> Option<String>,
    {
        let Some(value) = get("ADT_MAX_RETRIES") else {
            return Ok(RetryPolicy::default().max_retries);
        };
        let parsed = value.trim().parse::<u32>().map_err(|e| {
            AdtError::Configuration(format!("Invalid ADT_MAX_RETRIES value '{}': {}", value, e))
        })?;
        if parsed > MAX_RETRY_LIMIT {
            return Err(AdtError::Configuration(format!(
                "ADT_MAX_RETRIES must be at most {}",
                MAX_RETRY_LIMIT
            )));
        }
        Ok(parsed)
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), AdtError> {
        if self.host.contains("://") || self.host.contains('/') {
            return Err(AdtError::Configuration(format!(
                "Invalid ADT_HOST '{}': expected a host name without scheme or path",
                self.host
            )));
        }

        if self.client.len() != 3 || !self.client.chars().all(|c| c.is_ascii_digit()) {
            return Err(AdtError::Configuration(format!(
                "Invalid ADT_CLIENT '{}': expected three digits",
                self.client
            )));
        }

        if !self.service_root.starts_with('/') {
            return Err(AdtError::Configuration(format!(
                "Invalid ADT_SERVICE_ROOT '{}': must start with '/'",
                self.service_root
            )));
        }

        Self::validate_url(&self.base_endpoint())?;
        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate URL format
    fn validate_url(url: &str) -> Result<(), AdtError> {
        url::Url::parse(url).map_err(|e| {
            AdtError::Configuration(format!("Invalid backend URL '{}': {}", url, e))
        })?;
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), AdtError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(AdtError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), AdtError> {
        if format != "json" && format != "text" {
            return Err(AdtError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration
    ///
    /// Bypasses environment loading; points at a plain-HTTP local backend.
    pub fn test_config() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 8000,
            use_tls: false,
            service_root: "/sap/bc/adt".to_string(),
            client: "100".to_string(),
            username: "DEVELOPER".to_string(),
            password: Secret::new("secret".to_string()),
            language: "EN".to_string(),
            insecure_tls: false,
            request_timeout_secs: 5,
            max_retries: 2,
            retry_backoff_ms: 10,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
