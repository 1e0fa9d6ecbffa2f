//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Page handlers return `Result<T, AppError>`; form
//! handlers usually turn failures into flash messages instead.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::api::BackendError;
use crate::filters;
use crate::middleware::SessionExpired;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Backend call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session store failed.
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

/// Standalone error page (no session-dependent chrome).
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub status: u16,
    pub title: &'static str,
    pub message: String,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Backend(err) => match err {
                BackendError::NotFound(_) => StatusCode::NOT_FOUND,
                BackendError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                BackendError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
                BackendError::Api { status, .. } if *status < 500 => StatusCode::BAD_REQUEST,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn is_server_side(&self) -> bool {
        match self {
            Self::Backend(err) => err.is_server_side(),
            Self::Session(_) | Self::Internal(_) => true,
            _ => false,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_side() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        // A refused token signs the visitor out; guests just go to sign in
        match self {
            Self::Backend(BackendError::Unauthorized(_)) => {
                return SessionExpired.into_response();
            }
            Self::Unauthorized(_) => return Redirect::to("/auth/login").into_response(),
            _ => {}
        }

        let status = self.status();

        // Don't expose internal error details to clients
        let (title, message) = match &self {
            Self::Backend(BackendError::NotFound(_)) | Self::NotFound(_) => (
                "Page not found",
                "We couldn't find what you were looking for.".to_string(),
            ),
            Self::Backend(err) if err.is_server_side() => (
                "Service unavailable",
                "Our shop is having trouble right now. Please try again shortly.".to_string(),
            ),
            Self::Backend(err) => (
                "Something went wrong",
                err.user_message("Your request could not be completed."),
            ),
            Self::Session(_) | Self::Internal(_) => (
                "Something went wrong",
                "Internal server error".to_string(),
            ),
            Self::BadRequest(message) => ("Bad request", message.clone()),
            Self::Unauthorized(_) => ("Sign in required", String::new()),
        };

        (
            status,
            ErrorTemplate {
                status: status.as_u16(),
                title,
                message,
            },
        )
            .into_response()
    }
}

impl From<crate::services::AuthError> for AppError {
    fn from(err: crate::services::AuthError) -> Self {
        use crate::services::AuthError;

        match err {
            AuthError::Backend(e) => Self::Backend(e),
            AuthError::Session(e) => Self::Session(e),
            AuthError::NotSignedIn => Self::Unauthorized(err.to_string()),
            other => Self::BadRequest(other.user_message("Invalid request")),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
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

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Add to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
