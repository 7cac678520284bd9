//! Server configuration loaded from environment variables.
//!
//! Loaded once at startup and never re-read: request handling only sees the
//! immutable [`ServerConfig`] passed into the application state.
//!
//! # Environment Variables
//!
//! ## Required
//! - `JWT_SECRET` - Session token signing secret (min 32 chars, high entropy)
//! - `COOKIE_NAME` - Name of the session cookie
//!
//! ## Optional
//! - `HOST` - Bind address (default: 127.0.0.1)
//! - `PORT` - Listen port (default: 8080)
//! - `BASE_URL` - Public URL; `https://` turns on Secure cookies (default: `http://localhost:8080`)
//! - `AUTH_PREFIX` - Mount point of the token routes (default: /auth)
//! - `CUSTOMER_PREFIX` - Mount point of the customer routes (default: /customer)
//! - `DATABASE_URL` - `PostgreSQL` connection string; in-memory store when unset
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//!
//! `RUST_LOG` and `LOG_FORMAT=json` are read by the binary, not here.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Top-level paths served outside the route groups.
const RESERVED_PATHS: &[&str] = &["/health", "/stats"];

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

/// Top-level server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Route prefixes
    pub routes: RoutePrefixes,
    /// Secrets and cookie settings for the session pipeline
    pub security: SecurityConfig,
    /// `PostgreSQL` URL; `None` selects the in-memory customer store
    pub database_url: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Where the route groups are mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePrefixes {
    pub auth: String,
    pub customer: String,
}

impl Default for RoutePrefixes {
    fn default() -> Self {
        Self {
            auth: "/auth".to_owned(),
            customer: "/customer".to_owned(),
        }
    }
}

impl RoutePrefixes {
    /// The two groups must not share a mount point or shadow `/health` or
    /// `/stats`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` naming the offending prefix.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth == self.customer {
            return Err(ConfigError::InvalidEnvVar(
                "CUSTOMER_PREFIX".to_string(),
                "must differ from AUTH_PREFIX".to_string(),
            ));
        }
        for (var, prefix) in [("AUTH_PREFIX", &self.auth), ("CUSTOMER_PREFIX", &self.customer)] {
            if let Some(reserved) = RESERVED_PATHS.iter().find(|p| **p == prefix.as_str()) {
                return Err(ConfigError::InvalidEnvVar(
                    var.to_string(),
                    format!("{reserved} is reserved"),
                ));
            }
        }
        Ok(())
    }
}

/// Process-wide secrets for the token service and CSRF guard.
///
/// Implements `Debug` manually to redact the signing secret.
#[derive(Clone)]
pub struct SecurityConfig {
    /// Session token signing secret
    pub jwt_secret: SecretString,
    /// Session cookie name
    pub cookie_name: String,
    /// Mark cookies `Secure` (HTTPS deployments)
    pub secure_cookies: bool,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("cookie_name", &self.cookie_name)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the signing secret fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("PORT", "8080")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let base_url = get_env_or_default("BASE_URL", "http://localhost:8080");

        let routes = RoutePrefixes {
            auth: get_prefix("AUTH_PREFIX", "/auth")?,
            customer: get_prefix("CUSTOMER_PREFIX", "/customer")?,
        };
        routes.validate()?;

        let security = SecurityConfig::from_env(&base_url)?;

        Ok(Self {
            host,
            port,
            routes,
            security,
            database_url: get_optional_env("DATABASE_URL").map(SecretString::from),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            base_url,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl SecurityConfig {
    /// Load the signing secret and cookie name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `JWT_SECRET` or `COOKIE_NAME` is missing, or
    /// the secret is too weak.
    pub fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_session_secret(&jwt_secret, "JWT_SECRET")?;

        let cookie_name = get_required_env("COOKIE_NAME")?;
        validate_cookie_name(&cookie_name, "COOKIE_NAME")?;

        Ok(Self {
            jwt_secret,
            cookie_name,
            secure_cookies: base_url.starts_with("https://"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Get a route prefix, normalized to a leading slash and no trailing slash.
fn get_prefix(key: &str, default: &str) -> Result<String, ConfigError> {
    normalize_prefix(&get_env_or_default(key, default))
        .ok_or_else(|| ConfigError::InvalidEnvVar(key.to_string(), "must not be /".to_string()))
}

fn normalize_prefix(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!("/{trimmed}"))
}

/// Cookie names are RFC 6265 tokens.
fn validate_cookie_name(name: &str, var_name: &str) -> Result<(), ConfigError> {
    let valid = name
        .bytes()
        .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            "cookie name contains separator characters".to_string(),
        ))
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
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

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
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
