//! Authentication extractors.
//!
//! Signed-in state is the bearer token plus profile snapshot stored by
//! [`AccountSession`](crate::services::AccountSession).

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Extensions, Method, StatusCode, Uri, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{AuthToken, CurrentUser, session_keys};

/// Extractor that requires a signed-in customer.
///
/// Guests are redirected to the login page, with the page they wanted
/// carried in `?next=` for GET requests.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user, token): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser, pub AuthToken);

/// Error returned when authentication is required but the visitor is a guest.
pub enum AuthRejection {
    /// Redirect to the login page.
    RedirectToLogin(Option<String>),
    /// Session layer missing.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(Some(next)) => Redirect::to(&format!(
                "/auth/login?next={}",
                urlencoding::encode(&next)
            ))
            .into_response(),
            Self::RedirectToLogin(None) => Redirect::to("/auth/login").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let signed_in = async {
            let user: CurrentUser = session
                .get(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten()?;
            let token: AuthToken = session
                .get(session_keys::AUTH_TOKEN)
                .await
                .ok()
                .flatten()?;
            Some(Self(user, token))
        };

        signed_in.await.ok_or_else(|| {
            AuthRejection::RedirectToLogin(return_path(
                &parts.method,
                &parts.extensions,
                &parts.uri,
            ))
        })
    }
}

/// The page to come back to after signing in.
///
/// Only GET requests have one. Nested routers see their URI with the mount
/// prefix stripped, so the router's [`OriginalUri`] is preferred.
#[must_use]
pub fn return_path(method: &Method, extensions: &Extensions, uri: &Uri) -> Option<String> {
    if *method != Method::GET {
        return None;
    }

    let uri = extensions
        .get::<OriginalUri>()
        .map_or(uri, |original| &original.0);
    uri.path_and_query().map(ToString::to_string)
}

/// Extractor that optionally gets the current customer.
///
/// Unlike `RequireAuth`, this does not reject the request for guests.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Only allow same-site relative paths as post-login destinations.
#[must_use]
pub fn safe_next_path(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/account",
    }
}
