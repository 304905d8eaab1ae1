//! Portal configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `IDENTITY_URL` - Identity service base URL (e.g. `https://site/.netlify/identity`)
//! - `IDENTITY_ADMIN_TOKEN` - Bearer token for the identity admin API
//!
//! ## Optional
//! - `PORTAL_HOST` - Bind address (default: 127.0.0.1)
//! - `PORTAL_PORT` - Listen port (default: 3000)
//! - `PORTAL_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; when neither is set the in-memory store is used)
//! - `PORTAL_SITE_URL` - Site origin allowed by CORS
//! - `PORTAL_ADMIN_EMAIL` - The one account allowed to set the live video
//! - `PORTAL_UTC_OFFSET_MINUTES` - Offset used for "today" in trade stats (default: -180)
//! - `PORTAL_CLIENT_IP_HEADER` - Header the fronting proxy sets to the client IP
//!   (e.g. `x-nf-client-connection-ip`); unset means rate limits key on the
//!   socket peer
//! - `IDENTITY_WEBHOOK_SECRET` - JWT secret for identity event webhooks
//! - `STRIPE_SECRET_KEY` + `STRIPE_WEBHOOK_SECRET` - Enable Stripe (both required)
//! - `STRIPE_API_BASE` - Stripe API base URL (default: `https://api.stripe.com`)
//! - `PAGBANK_TOKEN` - Token used to check PagBank notification authenticity
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `LOG_FORMAT` - `json` for JSON log lines, anything else for human-readable

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderName;
use bookvision_core::Email;
use chrono::FixedOffset;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_UTC_OFFSET_MINUTES: i32 = -180;
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Portal application configuration.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// `PostgreSQL` connection URL; `None` selects the in-memory store
    pub database_url: Option<SecretString>,
    /// Public site origin allowed by CORS
    pub site_url: Option<String>,
    /// Account allowed to change the live video
    pub admin_email: Option<Email>,
    /// Offset that defines "today" for trade statistics
    pub utc_offset: FixedOffset,
    /// Proxy-set header trusted for the client IP
    pub client_ip_header: Option<HeaderName>,
    /// Identity service configuration
    pub identity: IdentityConfig,
    /// Stripe configuration, when Stripe is enabled
    pub stripe: Option<StripeConfig>,
    /// PagBank configuration
    pub pagbank: PagBankConfig,
    /// Sentry configuration
    pub sentry: SentryConfig,
    /// Log output format
    pub log_format: LogFormat,
}

/// Identity service configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Base URL of the identity API, without trailing slash
    pub url: Url,
    /// Admin API bearer token
    pub admin_token: SecretString,
    /// Secret the identity service signs event webhooks with
    pub webhook_secret: Option<SecretString>,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("url", &self.url.as_str())
            .field("admin_token", &"[REDACTED]")
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Stripe configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (`sk_...`)
    pub secret_key: SecretString,
    /// Webhook endpoint signing secret (`whsec_...`)
    pub webhook_secret: SecretString,
    /// API base URL
    pub api_base: String,
}

impl std::fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[REDACTED]")
            .field("webhook_secret", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// PagBank configuration.
#[derive(Clone, Default)]
pub struct PagBankConfig {
    /// Account token; when set, notifications must carry a valid
    /// `x-authenticity-token`
    pub token: Option<SecretString>,
}

impl std::fmt::Debug for PagBankConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagBankConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub traces_sample_rate: f32,
}

impl PortalConfig {
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

        let host = parse_env("PORTAL_HOST", "127.0.0.1")?;
        let port = parse_env("PORTAL_PORT", "3000")?;
        let database_url = get_database_url("PORTAL_DATABASE_URL");
        let site_url = get_optional_env("PORTAL_SITE_URL");

        let admin_email = get_optional_env("PORTAL_ADMIN_EMAIL")
            .map(|raw| {
                Email::parse(&raw).map_err(|e| {
                    ConfigError::InvalidEnvVar("PORTAL_ADMIN_EMAIL".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let offset_minutes: i32 = parse_env(
            "PORTAL_UTC_OFFSET_MINUTES",
            &DEFAULT_UTC_OFFSET_MINUTES.to_string(),
        )?;
        let utc_offset = utc_offset_from_minutes(offset_minutes)?;

        let client_ip_header = get_optional_env("PORTAL_CLIENT_IP_HEADER")
            .map(|raw| {
                HeaderName::from_bytes(raw.trim().to_ascii_lowercase().as_bytes()).map_err(|e| {
                    ConfigError::InvalidEnvVar("PORTAL_CLIENT_IP_HEADER".to_string(), e.to_string())
                })
            })
            .transpose()?;

        Ok(Self {
            host,
            port,
            database_url,
            site_url,
            admin_email,
            utc_offset,
            client_ip_header,
            identity: IdentityConfig::from_env()?,
            stripe: StripeConfig::from_env()?,
            pagbank: PagBankConfig::from_env()?,
            sentry: SentryConfig::from_env()?,
            log_format: match get_optional_env("LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether `email` is the configured live-room admin.
    #[must_use]
    pub fn is_admin(&self, email: Option<&Email>) -> bool {
        match (&self.admin_email, email) {
            (Some(admin), Some(email)) => admin == email,
            _ => false,
        }
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("IDENTITY_URL")?;
        let url = Url::parse(raw_url.trim_end_matches('/'))
            .map_err(|e| ConfigError::InvalidEnvVar("IDENTITY_URL".to_string(), e.to_string()))?;

        Ok(Self {
            url,
            admin_token: get_validated_secret("IDENTITY_ADMIN_TOKEN")?,
            webhook_secret: get_optional_validated_secret("IDENTITY_WEBHOOK_SECRET")?,
        })
    }

    /// Build the URL of an identity endpoint path such as `admin/users`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl StripeConfig {
    /// Stripe is enabled only when both the API key and webhook secret are set.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let secret_key = get_optional_validated_secret("STRIPE_SECRET_KEY")?;
        let webhook_secret = get_optional_validated_secret("STRIPE_WEBHOOK_SECRET")?;

        match (secret_key, webhook_secret) {
            (Some(secret_key), Some(webhook_secret)) => Ok(Some(Self {
                secret_key,
                webhook_secret,
                api_base: get_env_or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE)
                    .trim_end_matches('/')
                    .to_string(),
            })),
            (None, None) => Ok(None),
            (Some(_), None) => Err(ConfigError::MissingEnvVar(
                "STRIPE_WEBHOOK_SECRET".to_string(),
            )),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("STRIPE_SECRET_KEY".to_string())),
        }
    }
}

impl PagBankConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            token: get_optional_validated_secret("PAGBANK_TOKEN")?,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.1")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn utc_offset_from_minutes(minutes: i32) -> Result<FixedOffset, ConfigError> {
    FixedOffset::east_opt(minutes * 60).ok_or_else(|| {
        ConfigError::InvalidEnvVar(
            "PORTAL_UTC_OFFSET_MINUTES".to_string(),
            format!("{minutes} is out of range"),
        )
    })
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

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
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

/// Load and validate a secret if it is set.
fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn identity() -> IdentityConfig {
        IdentityConfig {
            url: Url::parse("https://bookvision.example/.netlify/identity").unwrap(),
            admin_token: SecretString::from("super_secret_admin_token"),
            webhook_secret: None,
        }
    }

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-webhook-secret", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_stripe_style_secret() {
        assert!(validate_secret_strength("whsec_9fK2pLq8Xz3Vb7Nm1Rt6Yw4Hc0Jd5Gs", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_utc_offset_from_minutes() {
        assert_eq!(
            utc_offset_from_minutes(-180).unwrap(),
            FixedOffset::west_opt(3 * 3600).unwrap()
        );
        assert!(utc_offset_from_minutes(100_000).is_err());
    }

    #[test]
    fn test_identity_endpoint_joins_paths() {
        let config = identity();
        assert_eq!(
            config.endpoint("/admin/users"),
            "https://bookvision.example/.netlify/identity/admin/users"
        );
        assert_eq!(
            config.endpoint("user"),
            "https://bookvision.example/.netlify/identity/user"
        );
    }

    #[test]
    fn test_identity_config_debug_redacts_secrets() {
        let mut config = identity();
        config.webhook_secret = Some(SecretString::from("hook_secret_value"));
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("bookvision.example"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_admin_token"));
        assert!(!debug_output.contains("hook_secret_value"));
    }

    #[test]
    fn test_stripe_config_debug_redacts_secrets() {
        let config = StripeConfig {
            secret_key: SecretString::from("sk_live_abcdef"),
            webhook_secret: SecretString::from("whsec_abcdef"),
            api_base: DEFAULT_STRIPE_API_BASE.to_string(),
        };
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("api.stripe.com"));
        assert!(!debug_output.contains("sk_live_abcdef"));
        assert!(!debug_output.contains("whsec_abcdef"));
    }

    #[test]
    fn test_is_admin() {
        let mut config = PortalConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            database_url: None,
            site_url: None,
            admin_email: None,
            utc_offset: utc_offset_from_minutes(DEFAULT_UTC_OFFSET_MINUTES).unwrap(),
            client_ip_header: None,
            identity: identity(),
            stripe: None,
            pagbank: PagBankConfig::default(),
            sentry: SentryConfig::default(),
            log_format: LogFormat::Pretty,
        };
        let admin = Email::parse("admin@bookvision.example").unwrap();

        assert!(!config.is_admin(Some(&admin)));
        config.admin_email = Some(admin.clone());
        assert!(config.is_admin(Some(&admin)));
        assert!(!config.is_admin(None));
        assert_eq!(config.socket_addr().port(), 3000);
    }
}
