//! Session middleware configuration.
//!
//! Sets up signed cookie sessions using tower-sessions. Sessions live in
//! process memory; the remote file store is the only durable state, so a
//! restart just logs everyone out.

use secrecy::ExposeSecret;
use tower_sessions::service::SignedCookie;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::Key};

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "mc_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer.
#[must_use]
pub fn create_session_layer(config: &AppConfig) -> SessionManagerLayer<MemoryStore, SignedCookie> {
    let store = MemoryStore::default();
    // `Key::from` needs at least 64 bytes of material; config validation
    // enforces that minimum on the session secret.
    let key = Key::from(config.session_secret.expose_secret().as_bytes());

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
        .with_signed(key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::{AppConfig, GithubConfig};

    fn config_with_secret(secret: &str) -> AppConfig {
        AppConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from(secret.to_string()),
            github: GithubConfig {
                owner: "someone".to_string(),
                repo: "contacts-data".to_string(),
                token: SecretString::from("ghp_t0k3n"),
                api_base: "https://api.github.com".to_string(),
            },
            nominatim_base_url: crate::services::geocode::DEFAULT_BASE_URL.to_string(),
            huggingface: None,
            sentry_dsn: None,
            sentry_environment: "development".to_string(),
        }
    }

    #[test]
    fn test_create_session_layer_with_full_length_secret() {
        let secret = "k".repeat(64);
        let _layer = create_session_layer(&config_with_secret(&secret));
    }
}
