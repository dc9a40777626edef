//! Authentication route handlers.
//!
//! Handles login, registration and logout against the credential table in
//! the remote store.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::middleware::auth::{clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::services::auth::{AuthError, AuthStatus, NewUserProfile};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub password_confirm: String,
    pub display_name: String,
    pub email: String,
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    LoginTemplate {
        error: query.error,
        success: query.success,
    }
}

/// Handle login form submission.
///
/// Unknown users and wrong passwords produce the same redirect, so the
/// login form cannot be used to enumerate registered usernames.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Response {
    let status = match state.auth().submit(&form.username, &form.password).await {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("Credential check failed: {}", e);
            return Redirect::to("/auth/login?error=unavailable").into_response();
        }
    };

    match status {
        AuthStatus::Authenticated(username) => {
            let display_name = match state.auth().credentials().await {
                Ok(table) => table
                    .get(&username)
                    .map_or_else(|| username.to_string(), |r| r.display_name.clone()),
                Err(_) => username.to_string(),
            };

            let user = CurrentUser {
                username,
                display_name,
            };
            if let Err(e) = set_current_user(&session, &user).await {
                tracing::error!("Failed to set session: {}", e);
                return Redirect::to("/auth/login?error=session").into_response();
            }
            set_sentry_user(&user.username);

            tracing::info!(user = %user.username, "login");
            Redirect::to("/").into_response()
        }
        AuthStatus::Failed | AuthStatus::Unauthenticated => {
            tracing::warn!("Login failed");
            Redirect::to("/auth/login?error=credentials").into_response()
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(Query(query): Query<MessageQuery>) -> impl IntoResponse {
    RegisterTemplate { error: query.error }
}

/// Handle registration form submission.
///
/// A successful registration does not log the user in; it redirects to the
/// login page.
pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Response {
    // Validate passwords match
    if form.password != form.password_confirm {
        return Redirect::to("/auth/register?error=password_mismatch").into_response();
    }

    let profile = NewUserProfile {
        display_name: form.display_name.trim().to_string(),
        email: form.email.trim().to_string(),
    };

    match state
        .auth()
        .register(form.username.trim(), &form.password, profile)
        .await
    {
        Ok(_) => Redirect::to("/auth/login?success=registered").into_response(),
        Err(AuthError::DuplicateUser) => {
            Redirect::to("/auth/register?error=username_taken").into_response()
        }
        Err(AuthError::InvalidUsername(_)) => {
            Redirect::to("/auth/register?error=invalid_username").into_response()
        }
        Err(AuthError::WeakPassword(_)) => {
            Redirect::to("/auth/register?error=password_too_short").into_response()
        }
        Err(e) => {
            tracing::error!("Registration failed: {}", e);
            Redirect::to("/auth/register?error=failed").into_response()
        }
    }
}

// =============================================================================
// Logout Route
// =============================================================================

/// Handle logout.
///
/// Clears the session and drops the user's cached contact table, so the
/// next login starts from the remote store.
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Ok(Some(user)) = session
        .get::<CurrentUser>(crate::models::session_keys::CURRENT_USER)
        .await
    {
        state.invalidate_contacts(&user.username).await;
        tracing::info!(user = %user.username, "logout");
    }

    if let Err(e) = clear_current_user(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }

    // Also destroy the entire session
    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }
    clear_sentry_user();

    Redirect::to("/auth/login").into_response()
}
