//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MYCONTACTS_BASE_URL` - Public URL the app is served under
//! - `MYCONTACTS_SESSION_SECRET` - Session signing secret (min 64 chars, high entropy)
//! - `GITHUB_OWNER` - Owner of the data repository
//! - `GITHUB_REPO` - Name of the data repository
//! - `GITHUB_TOKEN` - Access token with contents read/write on the data repository
//!
//! ## Optional
//! - `MYCONTACTS_HOST` - Bind address (default: 127.0.0.1)
//! - `MYCONTACTS_PORT` - Listen port (default: 3000)
//! - `GITHUB_API_BASE` - API base URL (default: <https://api.github.com>)
//! - `NOMINATIM_BASE_URL` - Geocoding instance (default: <https://nominatim.openstreetmap.org>)
//! - `HUGGINGFACE_TOKEN` - Inference API token; poem generation is disabled without it
//! - `HUGGINGFACE_MODEL` - Text generation model (default: mistralai/Mistral-7B-Instruct-v0.2)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name (default: development)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::services::geocode;

// The cookie signing key is built with `Key::from`, which needs 64 bytes
// of key material.
const MIN_SESSION_SECRET_LENGTH: usize = 64;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default text generation model for poems.
const DEFAULT_POEM_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.2";

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

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL the app is served under
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Data repository configuration
    pub github: GithubConfig,
    /// Base URL of the Nominatim geocoding instance
    pub nominatim_base_url: String,
    /// Poem generation configuration; `None` disables the feature
    pub huggingface: Option<HuggingFaceConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: String,
}

/// Data repository configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct GithubConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Access token with contents read/write scope
    pub token: SecretString,
    /// API base URL
    pub api_base: String,
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Hugging Face Inference API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct HuggingFaceConfig {
    /// Inference API token
    pub token: SecretString,
    /// Text generation model identifier
    pub model: String,
}

impl std::fmt::Debug for HuggingFaceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceConfig")
            .field("token", &"[REDACTED]")
            .field("model", &self.model)
            .finish()
    }
}

impl AppConfig {
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

        let host = get_env_or_default("MYCONTACTS_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MYCONTACTS_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("MYCONTACTS_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("MYCONTACTS_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("MYCONTACTS_BASE_URL")?;
        let session_secret = get_validated_secret("MYCONTACTS_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "MYCONTACTS_SESSION_SECRET")?;

        let github = GithubConfig::from_env()?;
        let huggingface = HuggingFaceConfig::from_env()?;
        let nominatim_base_url =
            get_env_or_default("NOMINATIM_BASE_URL", geocode::DEFAULT_BASE_URL);
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_env_or_default("SENTRY_ENVIRONMENT", "development");

        Ok(Self {
            host,
            port,
            base_url,
            session_secret,
            github,
            nominatim_base_url,
            huggingface,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should require HTTPS.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl GithubConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            owner: get_required_env("GITHUB_OWNER")?,
            repo: get_required_env("GITHUB_REPO")?,
            token: get_validated_secret("GITHUB_TOKEN")?,
            api_base: get_env_or_default("GITHUB_API_BASE", "https://api.github.com"),
        })
    }
}

impl HuggingFaceConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(token) = get_optional_env("HUGGINGFACE_TOKEN") else {
            return Ok(None);
        };
        validate_secret_strength(&token, "HUGGINGFACE_TOKEN")?;
        Ok(Some(Self {
            token: SecretString::from(token),
            model: get_env_or_default("HUGGINGFACE_MODEL", DEFAULT_POEM_MODEL),
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
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

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
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
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        // All same character = 0 entropy
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_high() {
        // Random-looking string should have high entropy
        let entropy = shannon_entropy("aB3$xY9!mK2@nL5#");
        assert!(entropy > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        // High-entropy random string
        let result = validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_validate_session_secret_too_short() {
        let secret = SecretString::from("short");
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_validate_session_secret_below_key_length() {
        let secret = SecretString::from("a".repeat(63));
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_err());
    }

    #[test]
    fn test_validate_session_secret_valid_length() {
        let secret = SecretString::from("a".repeat(64));
        assert!(validate_session_secret(&secret, "TEST_SESSION").is_ok());
    }

    fn sample_config() -> AppConfig {
        AppConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("x".repeat(64)),
            github: GithubConfig {
                owner: "someone".to_string(),
                repo: "contacts-data".to_string(),
                token: SecretString::from("ghp_t0k3n"),
                api_base: "https://api.github.com".to_string(),
            },
            nominatim_base_url: geocode::DEFAULT_BASE_URL.to_string(),
            huggingface: None,
            sentry_dsn: None,
            sentry_environment: "development".to_string(),
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = sample_config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_secure_cookies_follows_base_url_scheme() {
        let mut config = sample_config();
        assert!(!config.secure_cookies());
        config.base_url = "https://contacts.example.net".to_string();
        assert!(config.secure_cookies());
    }

    #[test]
    fn test_github_config_debug_redacts_token() {
        let config = GithubConfig {
            owner: "someone".to_string(),
            repo: "contacts-data".to_string(),
            token: SecretString::from("ghp_super_private_token"),
            api_base: "https://api.github.com".to_string(),
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("someone"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("ghp_super_private_token"));
    }
}
