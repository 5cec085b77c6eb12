//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `ADMIN_API_TOKEN` - Bearer token for `/api/*` (min 32 chars, high entropy)
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_ORDER_PAYMENT_TIMEOUT_MINUTES` - Age after which unpaid orders are cancelled (default: 30)
//! - `ADMIN_ORDER_SWEEP_INTERVAL_SECONDS` - Sweeper period, `0` disables it (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chrono::TimeDelta;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_API_TOKEN_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default payment timeout for `pending_payment` orders, in minutes.
pub const DEFAULT_PAYMENT_TIMEOUT_MINUTES: i64 = 30;

/// Default sweeper period, in seconds.
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;

/// Longest accepted payment timeout (30 days).
pub const MAX_PAYMENT_TIMEOUT_MINUTES: i64 = 30 * 24 * 60;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token required on `/api/*`
    pub api_token: SecretString,
    /// Unpaid orders older than this are cancelled by the sweep
    pub payment_timeout: TimeDelta,
    /// How often the in-process sweeper runs; `None` when disabled
    pub sweep_interval: Option<Duration>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ADMIN_DATABASE_URL")?;
        let host = get_env_or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let api_token = get_validated_secret("ADMIN_API_TOKEN")?;
        validate_token_length(&api_token, "ADMIN_API_TOKEN")?;

        let payment_timeout = get_optional_env("ADMIN_ORDER_PAYMENT_TIMEOUT_MINUTES")
            .map_or(Ok(default_payment_timeout()), |raw| {
                parse_payment_timeout(&raw, "ADMIN_ORDER_PAYMENT_TIMEOUT_MINUTES")
            })?;
        let sweep_interval = get_optional_env("ADMIN_ORDER_SWEEP_INTERVAL_SECONDS").map_or(
            Ok(Some(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECONDS))),
            |raw| parse_sweep_interval(&raw),
        )?;

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            api_token,
            payment_timeout,
            sweep_interval,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// The payment timeout used when none is configured.
#[must_use]
pub const fn default_payment_timeout() -> TimeDelta {
    TimeDelta::minutes(DEFAULT_PAYMENT_TIMEOUT_MINUTES)
}

/// Parse a payment timeout given in whole minutes.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` unless the value is an integer in `1..=43200`.
pub fn parse_payment_timeout(raw: &str, var_name: &str) -> Result<TimeDelta, ConfigError> {
    let minutes = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    payment_timeout_from_minutes(minutes).ok_or_else(|| {
        ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("must be between 1 and {MAX_PAYMENT_TIMEOUT_MINUTES} minutes"),
        )
    })
}

/// A payment timeout of `minutes`, if within `1..=MAX_PAYMENT_TIMEOUT_MINUTES`.
#[must_use]
pub fn payment_timeout_from_minutes(minutes: i64) -> Option<TimeDelta> {
    if !(1..=MAX_PAYMENT_TIMEOUT_MINUTES).contains(&minutes) {
        return None;
    }
    TimeDelta::try_minutes(minutes)
}

/// Parse the sweeper period; `0` turns the sweeper off.
fn parse_sweep_interval(raw: &str) -> Result<Option<Duration>, ConfigError> {
    let seconds = raw.trim().parse::<u64>().map_err(|e| {
        ConfigError::InvalidEnvVar(
            "ADMIN_ORDER_SWEEP_INTERVAL_SECONDS".to_string(),
            e.to_string(),
        )
    })?;

    Ok((seconds > 0).then(|| Duration::from_secs(seconds)))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Validate that a bearer token meets minimum length requirements.
fn validate_token_length(token: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let len = token.expose_secret().len();
    if len < MIN_API_TOKEN_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("must be at least {MIN_API_TOKEN_LENGTH} characters (got {len})"),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)]
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_secret_strength() {
        assert!(validate_secret_strength("your-api-token", "T").is_err());
        assert!(validate_secret_strength(&"z".repeat(40), "T").is_err());
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "T").is_ok());
    }

    #[test]
    fn test_validate_token_length() {
        assert!(validate_token_length(&SecretString::from("aB3$xY9!"), "T").is_err());
        assert!(validate_token_length(&SecretString::from("k".repeat(32)), "T").is_ok());
    }

    #[test]
    fn test_parse_payment_timeout() {
        assert_eq!(
            parse_payment_timeout("45", "T").unwrap(),
            TimeDelta::minutes(45)
        );
        assert!(parse_payment_timeout("0", "T").is_err());
        assert!(parse_payment_timeout("-5", "T").is_err());
        assert!(parse_payment_timeout("half an hour", "T").is_err());
        assert!(parse_payment_timeout("100000", "T").is_err());
        assert_eq!(default_payment_timeout(), TimeDelta::minutes(30));
    }

    #[test]
    fn test_payment_timeout_from_minutes_bounds() {
        assert_eq!(
            payment_timeout_from_minutes(MAX_PAYMENT_TIMEOUT_MINUTES),
            Some(TimeDelta::minutes(MAX_PAYMENT_TIMEOUT_MINUTES))
        );
        assert_eq!(payment_timeout_from_minutes(MAX_PAYMENT_TIMEOUT_MINUTES + 1), None);
        assert_eq!(payment_timeout_from_minutes(0), None);
        assert_eq!(payment_timeout_from_minutes(1_000_000_000_000), None);
    }

    #[test]
    fn test_parse_sweep_interval() {
        assert_eq!(
            parse_sweep_interval("60").unwrap(),
            Some(Duration::from_secs(60))
        );
        assert_eq!(parse_sweep_interval("0").unwrap(), None);
        assert!(parse_sweep_interval("soon").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            database_url: SecretString::from("postgres://localhost/velvet_haze"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3001,
            api_token: SecretString::from("t".repeat(32)),
            payment_timeout: default_payment_timeout(),
            sweep_interval: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        assert_eq!(config.socket_addr().port(), 3001);
        assert!(!format!("{config:?}").contains(&"t".repeat(32)));
    }
}
