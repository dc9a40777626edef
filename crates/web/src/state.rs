//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use thiserror::Error;

use mycontacts_core::{ContactTable, Username};

use crate::config::AppConfig;
use crate::services::auth::AuthService;
use crate::services::contacts::ContactService;
use crate::services::geocode::{GeocodeError, NominatimClient};
use crate::services::poem::{PoemClient, PoemError};
use crate::store::{GithubStore, StoreError, UserStorage};

/// Upper bound on cached per-user contact tables.
const CONTACT_CACHE_CAPACITY: u64 = 1024;

/// Cached tables are dropped after a day of inactivity; the remote store is
/// always authoritative after that.
const CONTACT_CACHE_IDLE: Duration = Duration::from_secs(24 * 60 * 60);

/// Error building the application state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("remote store client: {0}")]
    Store(#[from] StoreError),
    #[error("geocoding client: {0}")]
    Geocode(#[from] GeocodeError),
    #[error("poem client: {0}")]
    Poem(#[from] PoemError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the remote store clients and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    store: Arc<GithubStore>,
    auth: AuthService<GithubStore>,
    geocoder: NominatimClient,
    poems: Option<PoemClient>,
    contact_tables: Cache<Username, ContactTable>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the HTTP clients cannot be built from the
    /// configuration.
    pub fn new(config: AppConfig) -> Result<Self, StateError> {
        let store = Arc::new(GithubStore::new(&config.github)?);
        let auth = AuthService::new(Arc::clone(&store));
        let geocoder = NominatimClient::new(&config.nominatim_base_url)?;
        let poems = config
            .huggingface
            .as_ref()
            .map(PoemClient::new)
            .transpose()?;
        let contact_tables = Cache::builder()
            .max_capacity(CONTACT_CACHE_CAPACITY)
            .time_to_idle(CONTACT_CACHE_IDLE)
            .build();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                auth,
                geocoder,
                poems,
                contact_tables,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthService<GithubStore> {
        &self.inner.auth
    }

    /// Get a reference to the poem client, if configured.
    #[must_use]
    pub fn poems(&self) -> Option<&PoemClient> {
        self.inner.poems.as_ref()
    }

    /// Contact operations scoped to one authenticated user.
    #[must_use]
    pub fn contacts_for(&self, user: Username) -> ContactService<'_, GithubStore, NominatimClient> {
        ContactService::new(
            UserStorage::for_user(Arc::clone(&self.inner.store), user.clone()),
            &self.inner.geocoder,
            self.inner.contact_tables.clone(),
            user,
        )
    }

    /// Drop a user's cached contact table (on logout).
    pub async fn invalidate_contacts(&self, user: &Username) {
        self.inner.contact_tables.invalidate(user).await;
    }
}
