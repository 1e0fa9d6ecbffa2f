//! Social sign-in route handlers.
//!
//! The backend runs the provider dance. The storefront only sends the visitor
//! to `{backend}/auth/{provider}` and receives them back at
//! `/auth/oauth/callback?token=...` (or `?error=...`).
//!
//! A callback is only honored while a sign-in started from this session is in
//! flight, so a crafted callback link cannot sign a visitor into someone
//! else's account.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::AppError;
use crate::models::{Flash, push_flash, session_keys};
use crate::routes::auth::welcome;
use crate::services::AccountSession;
use crate::state::AppState;

/// Query parameters for starting a sign-in.
#[derive(Debug, Deserialize)]
pub struct StartQuery {
    pub next: Option<String>,
}

/// Query parameters the backend redirects back with.
#[derive(Deserialize)]
pub struct CallbackQuery {
    pub token: Option<String>,
    pub error: Option<String>,
}

/// Send the visitor to the backend's provider redirect.
///
/// # Route
///
/// `GET /auth/oauth/{provider}`
#[instrument(skip(state, session))]
pub async fn start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
    Query(query): Query<StartQuery>,
) -> Response {
    if !state.config().oauth_providers.contains(&provider) {
        return AppError::NotFound(format!("OAuth provider {provider}")).into_response();
    }

    let next = query.next.unwrap_or_else(|| "/account".to_string());
    if let Err(e) = session.insert(session_keys::OAUTH_NEXT, &next).await {
        tracing::error!("Failed to store OAuth state in session: {e}");
        push_flash(&session, Flash::error("Could not start sign-in. Please try again.")).await;
        return Redirect::to("/auth/login").into_response();
    }

    let url = state
        .backend()
        .oauth_start_url(&provider, &state.config().oauth_callback_url());
    Redirect::to(&url).into_response()
}

/// Finish a social sign-in.
///
/// # Route
///
/// `GET /auth/oauth/callback`
#[instrument(skip_all)]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    // One-time use
    let pending: Option<String> = session
        .remove(session_keys::OAUTH_NEXT)
        .await
        .ok()
        .flatten();

    let Some(next) = pending else {
        tracing::warn!("OAuth callback without a pending sign-in");
        push_flash(&session, Flash::error("Your sign-in expired. Please try again.")).await;
        return Redirect::to("/auth/login");
    };

    if let Some(error) = query.error {
        tracing::warn!("OAuth sign-in failed: {error}");
        push_flash(&session, Flash::error(format!("Sign-in failed: {error}"))).await;
        return Redirect::to("/auth/login");
    }

    let Some(token) = query.token else {
        tracing::warn!("OAuth callback missing token");
        push_flash(&session, Flash::error("Sign-in failed. Please try again.")).await;
        return Redirect::to("/auth/login");
    };

    match AccountSession::new(state.backend(), &session)
        .complete_oauth(&token)
        .await
    {
        Ok(user) => welcome(&state, &session, &user, Some(&next)).await,
        Err(e) => {
            tracing::warn!("OAuth token rejected: {e}");
            push_flash(
                &session,
                Flash::error(e.user_message("Sign-in failed. Please try again.")),
            )
            .await;
            Redirect::to("/auth/login")
        }
    }
}
