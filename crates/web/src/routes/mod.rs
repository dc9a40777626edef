//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                - Contact table, map and add-contact form (requires auth)
//! POST /contacts        - Add a contact (requires auth)
//! GET  /health          - Health check
//!
//! # Auth
//! GET  /auth/login      - Login page
//! POST /auth/login      - Login action
//! GET  /auth/register   - Register page
//! POST /auth/register   - Register action
//! POST /auth/logout     - Logout action
//! ```

pub mod auth;
pub mod home;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create all routes for the application.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/contacts", post(home::add_contact))
        .route("/health", get(home::health))
        .nest("/auth", auth_routes())
}
