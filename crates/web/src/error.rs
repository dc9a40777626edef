//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::auth::AuthError;
use crate::services::contacts::ContactError;
use crate::store::StorageError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Contact operation failed.
    #[error("Contact error: {0}")]
    Contact(#[from] ContactError),

    /// Per-user storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Session layer failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error indicates a server-side fault worth reporting.
    fn is_server_error(&self) -> bool {
        match self {
            Self::Internal(_) | Self::Session(_) => true,
            Self::Auth(err) => matches!(
                err,
                AuthError::Store(_) | AuthError::Malformed(_) | AuthError::PasswordHash
            ),
            Self::Contact(err) => matches!(err, ContactError::Storage(_)),
            Self::Storage(_) => true,
            Self::NotFound(_) | Self::Unauthorized(_) | Self::BadRequest(_) => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Internal(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::DuplicateUser => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidUsername(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Store(_) | AuthError::Malformed(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Contact(err) => match err {
                ContactError::Validation(_) => StatusCode::BAD_REQUEST,
                ContactError::Storage(storage) => storage_status(storage),
            },
            Self::Storage(storage) => storage_status(storage),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Internal(_) | Self::Session(_) | Self::Storage(_) => {
                "Internal server error".to_string()
            }
            Self::Auth(err) => match err {
                AuthError::DuplicateUser => "This username is already taken".to_string(),
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidUsername(_) => "Invalid username".to_string(),
                _ => "Internal server error".to_string(),
            },
            Self::Contact(err) => match err {
                ContactError::Validation(v) => v.to_string(),
                ContactError::Storage(StorageError::RemoteWrite(_)) => {
                    "Saving the contact failed, please try again".to_string()
                }
                ContactError::Storage(_) => "Internal server error".to_string(),
            },
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

fn storage_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::RemoteWrite(_) | StorageError::RemoteRead(_) => StatusCode::BAD_GATEWAY,
        // A handler reaching storage without a user is a bug, not a 401.
        StorageError::NotAuthenticated | StorageError::Malformed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a username.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(username: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("contacts".to_string());
        assert_eq!(err.to_string(), "Not found: contacts");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::DuplicateUser)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Storage(StorageError::RemoteWrite(
                "409".to_string()
            ))),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_server_errors_hide_details() {
        let response =
            AppError::Storage(StorageError::RemoteRead("token leaked?".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
