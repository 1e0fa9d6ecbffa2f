//! Account session error types.

use thiserror::Error;

use crate::api::BackendError;

/// Errors that can occur while signing in, signing up, or editing a profile.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] herbal_core::EmailError),

    /// A required form field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A URL field did not hold an http(s) URL.
    #[error("{0} must be an http or https URL")]
    InvalidUrl(&'static str),

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    PasswordMismatch,

    /// The action needs a signed-in customer.
    #[error("not signed in")]
    NotSignedIn,

    /// The backend rejected the request or could not be reached.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// The session store failed.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Text for a toast or inline form error.
    ///
    /// Validation failures describe themselves; backend failures show the
    /// backend's message or `fallback`.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::InvalidEmail(_) => "Please enter a valid email address".to_string(),
            Self::MissingField(field) => format!("{field} is required"),
            Self::InvalidUrl(field) => format!("{field} must be a web address (https://...)"),
            Self::WeakPassword(message) => message.clone(),
            Self::PasswordMismatch => "Passwords do not match".to_string(),
            Self::NotSignedIn => "Please sign in to continue".to_string(),
            Self::Backend(err) => err.user_message(fallback),
            Self::Session(_) => fallback.to_string(),
        }
    }

    /// Whether the backend refused the stored token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Backend(err) if err.is_unauthorized())
    }

    /// Whether the failure is worth reporting (not the visitor's fault).
    #[must_use]
    pub fn is_server_side(&self) -> bool {
        match self {
            Self::Backend(err) => err.is_server_side(),
            Self::Session(_) => true,
            _ => false,
        }
    }
}
