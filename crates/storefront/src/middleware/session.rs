//! Session middleware configuration.
//!
//! Sessions live in process memory. They hold only the bearer token, a
//! profile snapshot, the cart mirror, the checkout draft and pending toasts;
//! everything authoritative is on the backend, so a restart just signs
//! visitors out. So does the backend refusing the stored token.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use super::auth::{AuthRejection, return_path};
use crate::config::StorefrontConfig;
use crate::models::{Flash, push_flash};
use crate::services::forget_sign_in;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "herbal_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// Response for a request whose bearer token the backend refused.
///
/// Handlers return this wherever a 401 comes back from the backend;
/// [`session_expiry_middleware`] turns it into a sign-out and a login redirect.
#[derive(Debug, Clone, Copy)]
pub struct SessionExpired;

impl IntoResponse for SessionExpired {
    fn into_response(self) -> Response {
        let mut response = Redirect::to("/auth/login").into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Sign the visitor out when a handler reports [`SessionExpired`].
///
/// Must run inside the session layer. GET requests come back to the page
/// they asked for after signing in again.
pub async fn session_expiry_middleware(request: Request, next: Next) -> Response {
    let session = request.extensions().get::<Session>().cloned();
    let next_path = return_path(request.method(), request.extensions(), request.uri());

    let response = next.run(request).await;
    if response.extensions().get::<SessionExpired>().is_none() {
        return response;
    }
    let Some(session) = session else {
        return response;
    };

    tracing::info!("Backend rejected the stored token, signing out");
    if let Err(e) = forget_sign_in(&session).await {
        tracing::error!("Failed to clear expired sign-in: {e}");
    }
    push_flash(
        &session,
        Flash::info("Your session has expired. Please sign in again."),
    )
    .await;

    AuthRejection::RedirectToLogin(next_path).into_response()
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header::LOCATION};

    use super::*;

    #[test]
    fn test_session_expired_is_marked_redirect() {
        let response = SessionExpired.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/auth/login");
        assert!(response.extensions().get::<SessionExpired>().is_some());
    }
}
