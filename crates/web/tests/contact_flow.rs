//! End-to-end flows across authentication, storage and contact management,
//! run against the in-memory store so no network is involved.

use std::sync::Arc;

use moka::future::Cache;

use mycontacts_core::{ContactTable, Coordinates, Username};
use mycontacts_web::services::auth::{AuthService, AuthStatus, NewUserProfile};
use mycontacts_web::services::contacts::{ContactFields, ContactService};
use mycontacts_web::services::geocode::{GeocodeError, Geocoder};
use mycontacts_web::store::{MemoryStore, RemoteStore, UserStorage};

// =============================================================================
// Test Doubles
// =============================================================================

/// Geocoder that answers every lookup with the same coordinates, or fails.
struct StubGeocoder {
    answer: Option<Coordinates>,
}

impl Geocoder for StubGeocoder {
    async fn lookup(
        &self,
        street: &str,
        postal_code: &str,
        city: &str,
    ) -> Result<Coordinates, GeocodeError> {
        self.answer
            .ok_or_else(|| GeocodeError::NoMatch(format!("{street}, {postal_code} {city}")))
    }
}

fn springfield() -> StubGeocoder {
    StubGeocoder {
        answer: Some(Coordinates { lat: 39.8, lon: -89.6 }),
    }
}

fn offline() -> StubGeocoder {
    StubGeocoder { answer: None }
}

fn profile(name: &str) -> NewUserProfile {
    NewUserProfile {
        display_name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

fn bob() -> ContactFields {
    ContactFields {
        name: "Bob".to_string(),
        street: "Main St 1".to_string(),
        postal_code: "62701".to_string(),
        city: "Springfield".to_string(),
    }
}

fn contacts_for<'a>(
    store: &Arc<MemoryStore>,
    geocoder: &'a StubGeocoder,
    cache: &Cache<Username, ContactTable>,
    user: &Username,
) -> ContactService<'a, MemoryStore, StubGeocoder> {
    ContactService::new(
        UserStorage::for_user(Arc::clone(store), user.clone()),
        geocoder,
        cache.clone(),
        user.clone(),
    )
}

// =============================================================================
// Flows
// =============================================================================

#[tokio::test]
async fn test_register_login_add_contact_flow() {
    let store = Arc::new(MemoryStore::new());
    let auth = AuthService::new(Arc::clone(&store));
    let geocoder = springfield();
    let cache: Cache<Username, ContactTable> = Cache::new(64);

    let alice = auth
        .register("alice", "correct horse battery", profile("Alice"))
        .await
        .expect("registration succeeds");

    let status = auth
        .submit("alice", "correct horse battery")
        .await
        .expect("credential check succeeds");
    assert_eq!(status, AuthStatus::Authenticated(alice.clone()));

    let contacts = contacts_for(&store, &geocoder, &cache, &alice);
    let outcome = contacts.add_contact(bob()).await.expect("contact saved");
    assert_eq!(
        outcome.record.coordinates,
        Some(Coordinates { lat: 39.8, lon: -89.6 })
    );

    // Persisted under the user's folder, with the contact named in the
    // change note.
    let persisted = store
        .read("user_data_alice/contacts")
        .await
        .expect("contacts file exists");
    assert!(persisted.starts_with("name,street,postal_code,city,lat,lon"));
    assert!(persisted.contains("Bob"));

    let log = store.change_log().await;
    assert_eq!(
        log.last().expect("a write happened").change_note,
        "Add contact 'Bob' to the file user_data_alice/contacts"
    );
}

#[tokio::test]
async fn test_geocode_failure_still_persists_contact_with_warning() {
    let store = Arc::new(MemoryStore::new());
    let geocoder = offline();
    let cache: Cache<Username, ContactTable> = Cache::new(64);
    let alice = Username::parse("alice").expect("valid username");

    let contacts = contacts_for(&store, &geocoder, &cache, &alice);
    let outcome = contacts.add_contact(bob()).await.expect("contact saved");

    assert!(outcome.record.coordinates.is_none());
    let warning = outcome.geocode_warning.expect("warning surfaced");
    assert!(warning.contains("Main St 1"));

    // Persisted with empty coordinate fields.
    let table = contacts.table().await.expect("table loads");
    assert_eq!(table.len(), 1);
    assert!(table.last().expect("one record").coordinates.is_none());
}

#[tokio::test]
async fn test_users_see_only_their_own_contacts() {
    let store = Arc::new(MemoryStore::new());
    let geocoder = springfield();
    let cache: Cache<Username, ContactTable> = Cache::new(64);
    let alice = Username::parse("alice").expect("valid username");
    let mallory = Username::parse("mallory").expect("valid username");

    contacts_for(&store, &geocoder, &cache, &alice)
        .add_contact(bob())
        .await
        .expect("contact saved");

    let theirs = contacts_for(&store, &geocoder, &cache, &mallory)
        .table()
        .await
        .expect("table loads");
    assert!(theirs.is_empty());
}

#[tokio::test]
async fn test_cached_table_survives_within_session_and_refreshes_after_invalidation() {
    let store = Arc::new(MemoryStore::new());
    let geocoder = springfield();
    let cache: Cache<Username, ContactTable> = Cache::new(64);
    let alice = Username::parse("alice").expect("valid username");

    let contacts = contacts_for(&store, &geocoder, &cache, &alice);
    contacts.add_contact(bob()).await.expect("contact saved");

    // Another writer replaces the remote file behind this session's back.
    store
        .seed(
            "user_data_alice/contacts",
            "name,street,postal_code,city,lat,lon\n",
        )
        .await;

    // The session keeps serving its cached copy.
    assert_eq!(contacts.table().await.expect("table loads").len(), 1);

    // Logout drops the cached copy; the next load sees the remote state.
    cache.invalidate(&alice).await;
    assert!(contacts.table().await.expect("table loads").is_empty());
}

#[tokio::test]
async fn test_duplicate_registration_does_not_clobber_existing_user() {
    let store = Arc::new(MemoryStore::new());
    let auth = AuthService::new(Arc::clone(&store));

    auth.register("alice", "original password", profile("Alice"))
        .await
        .expect("registration succeeds");
    auth.register("alice", "attacker password", profile("Eve"))
        .await
        .expect_err("duplicate rejected");

    // The original credentials still authenticate.
    assert!(matches!(
        auth.submit("alice", "original password")
            .await
            .expect("credential check succeeds"),
        AuthStatus::Authenticated(_)
    ));
    assert_eq!(
        auth.submit("alice", "attacker password")
            .await
            .expect("credential check succeeds"),
        AuthStatus::Failed
    );
}
