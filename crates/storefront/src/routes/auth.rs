//! Authentication route handlers.
//!
//! Login, registration, password reset and email verification against the
//! backend's auth endpoints. Successful sign-ins land on `?next=` when it is a
//! same-site path.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use herbal_core::Email;

use crate::filters;
use crate::middleware::{
    CspNonce, OptionalAuth, PageContext, RequireAuth, SessionExpired, safe_next_path,
};
use crate::models::{CurrentUser, Flash, push_flash};
use crate::services::session::validate_new_password;
use crate::services::{AccountSession, AuthError, CartContainer};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    pub email: String,
}

/// Reset password form data.
#[derive(Deserialize)]
pub struct ResetPasswordForm {
    pub password: String,
    pub password_confirm: String,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// A "continue with" button.
#[derive(Clone)]
pub struct OAuthProviderView {
    pub slug: String,
    pub label: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
    pub providers: Vec<OAuthProviderView>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub name: String,
    pub email: String,
    pub error: Option<String>,
    pub providers: Vec<OAuthProviderView>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub page: PageContext,
    pub email: String,
    pub error: Option<String>,
}

/// Reset password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset_password.html")]
pub struct ResetPasswordTemplate {
    pub page: PageContext,
    pub token: String,
    pub error: Option<String>,
}

/// Email verification result template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify_email.html")]
pub struct VerifyEmailTemplate {
    pub page: PageContext,
    pub verified: bool,
    pub message: String,
}

/// Configured OAuth providers as buttons.
fn provider_views(state: &AppState) -> Vec<OAuthProviderView> {
    state
        .config()
        .oauth_providers
        .iter()
        .map(|slug| OAuthProviderView {
            slug: slug.clone(),
            label: provider_label(slug),
        })
        .collect()
}

/// "google" -> "Google", "github" -> "GitHub".
fn provider_label(slug: &str) -> String {
    match slug {
        "github" => "GitHub".to_string(),
        _ => {
            let mut chars = slug.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        }
    }
}

/// Log a failed auth attempt at the level it deserves.
fn log_auth_failure(action: &str, err: &AuthError) {
    if err.is_server_side() {
        tracing::error!("{action} failed: {err}");
    } else {
        tracing::info!("{action} rejected: {err}");
    }
}

/// Load the backend cart into the session after sign-in.
async fn sync_cart(state: &AppState, session: &Session) {
    if let Err(e) = CartContainer::new(state.backend(), session).refresh().await {
        tracing::warn!("Failed to load cart after sign-in: {e}");
    }
}

/// Finish any sign-in: load the cart, greet, and go to `next`.
pub(crate) async fn welcome(
    state: &AppState,
    session: &Session,
    user: &CurrentUser,
    next: Option<&str>,
) -> Redirect {
    sync_cart(state, session).await;
    push_flash(
        session,
        Flash::success(format!("Welcome back, {}!", user.first_name())),
    )
    .await;
    Redirect::to(safe_next_path(next))
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip(state, session, nonce, user))]
pub async fn login_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    OptionalAuth(user): OptionalAuth,
    Query(query): Query<LoginQuery>,
) -> Response {
    if user.is_some() {
        return Redirect::to(safe_next_path(query.next.as_deref())).into_response();
    }

    LoginTemplate {
        page: PageContext::load(&state, Some(&session), &nonce).await,
        email: String::new(),
        next: query.next.unwrap_or_default(),
        error: None,
        providers: provider_views(&state),
    }
    .into_response()
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<LoginForm>,
) -> Response {
    let account = AccountSession::new(state.backend(), &session);

    match account.login(&form.email, &form.password).await {
        Ok(user) => welcome(&state, &session, &user, form.next.as_deref())
            .await
            .into_response(),
        Err(e) => {
            log_auth_failure("Login", &e);
            (
                StatusCode::UNAUTHORIZED,
                LoginTemplate {
                    page: PageContext::load(&state, Some(&session), &nonce).await,
                    email: form.email,
                    next: form.next.unwrap_or_default(),
                    error: Some(e.user_message("Invalid email or password")),
                    providers: provider_views(&state),
                },
            )
                .into_response()
        }
    }
}

/// Handle logout.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    if let Err(e) = AccountSession::new(state.backend(), &session).logout().await {
        tracing::error!("Failed to clear session on logout: {e}");
    }
    push_flash(&session, Flash::info("You have been signed out")).await;
    Redirect::to("/")
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip(state, session, nonce, user))]
pub async fn register_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    if user.is_some() {
        return Redirect::to("/account").into_response();
    }

    RegisterTemplate {
        page: PageContext::load(&state, Some(&session), &nonce).await,
        name: String::new(),
        email: String::new(),
        error: None,
        providers: provider_views(&state),
    }
    .into_response()
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<RegisterForm>,
) -> Response {
    let account = AccountSession::new(state.backend(), &session);

    match account
        .register(&form.name, &form.email, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => {
            sync_cart(&state, &session).await;
            push_flash(
                &session,
                Flash::success(format!(
                    "Welcome, {}! Check your inbox to verify your email.",
                    user.first_name()
                )),
            )
            .await;
            Redirect::to("/account").into_response()
        }
        Err(e) => {
            log_auth_failure("Registration", &e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                RegisterTemplate {
                    page: PageContext::load(&state, Some(&session), &nonce).await,
                    name: form.name,
                    email: form.email,
                    error: Some(e.user_message("Could not create your account")),
                    providers: provider_views(&state),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(page: PageContext) -> impl IntoResponse {
    ForgotPasswordTemplate {
        page,
        email: String::new(),
        error: None,
    }
}

/// Handle forgot password form submission.
///
/// The same confirmation is shown whether or not the account exists.
#[instrument(skip(state, session, nonce))]
pub async fn forgot_password(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let error = match Email::parse(&form.email) {
        Err(_) => "Please enter a valid email address".to_string(),
        Ok(email) => match state.backend().forgot_password(email.as_str()).await {
            Ok(_) => {
                push_flash(
                    &session,
                    Flash::success(
                        "If an account exists for that email, a reset link is on its way.",
                    ),
                )
                .await;
                return Redirect::to("/auth/login").into_response();
            }
            Err(e) if e.is_not_found() => {
                // Don't reveal whether the email is registered
                push_flash(
                    &session,
                    Flash::success(
                        "If an account exists for that email, a reset link is on its way.",
                    ),
                )
                .await;
                return Redirect::to("/auth/login").into_response();
            }
            Err(e) => {
                tracing::warn!("Password reset request failed: {e}");
                e.user_message("Could not send a reset link. Please try again.")
            }
        },
    };

    (
        StatusCode::UNPROCESSABLE_ENTITY,
        ForgotPasswordTemplate {
            page: PageContext::load(&state, Some(&session), &nonce).await,
            email: form.email,
            error: Some(error),
        },
    )
        .into_response()
}

/// Display the reset password page.
pub async fn reset_password_page(page: PageContext, Path(token): Path<String>) -> impl IntoResponse {
    ResetPasswordTemplate {
        page,
        token,
        error: None,
    }
}

/// Handle reset password form submission.
#[instrument(skip_all)]
pub async fn reset_password(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path(token): Path<String>,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    let result = match validate_new_password(&form.password, &form.password_confirm) {
        Ok(()) => state
            .backend()
            .reset_password(&token, &form.password)
            .await
            .map_err(AuthError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(_) => {
            push_flash(
                &session,
                Flash::success("Your password has been updated. Please sign in."),
            )
            .await;
            Redirect::to("/auth/login").into_response()
        }
        Err(e) => {
            log_auth_failure("Password reset", &e);
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                ResetPasswordTemplate {
                    page: PageContext::load(&state, Some(&session), &nonce).await,
                    token,
                    error: Some(e.user_message("This reset link is invalid or has expired")),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Email Verification Routes
// =============================================================================

/// Verify an email address from the link in the verification email.
#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path(token): Path<String>,
) -> impl IntoResponse {
    let (verified, message) = match state.backend().verify_email(&token).await {
        Ok(response) => {
            // Refresh the header snapshot if the visitor is signed in
            let account = AccountSession::new(state.backend(), &session);
            if account.token().await.is_some() {
                if let Err(e) = account.load_current_user().await {
                    tracing::warn!("Failed to refresh profile after verification: {e}");
                }
            }
            (
                true,
                response
                    .message
                    .unwrap_or_else(|| "Your email address has been verified.".to_string()),
            )
        }
        Err(e) => {
            tracing::info!("Email verification failed: {e}");
            (
                false,
                e.user_message("This verification link is invalid or has expired."),
            )
        }
    };

    VerifyEmailTemplate {
        page: PageContext::load(&state, Some(&session), &nonce).await,
        verified,
        message,
    }
}

/// Send another verification email.
#[instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    session: Session,
    _auth: RequireAuth,
) -> Response {
    match AccountSession::new(state.backend(), &session)
        .resend_verification()
        .await
    {
        Ok(response) => {
            let message = response
                .message
                .unwrap_or_else(|| "Verification email sent. Check your inbox.".to_string());
            push_flash(&session, Flash::success(message)).await;
        }
        Err(e) if e.is_unauthorized() => return SessionExpired.into_response(),
        Err(e) => {
            log_auth_failure("Resend verification", &e);
            push_flash(
                &session,
                Flash::error(e.user_message("Could not send the verification email")),
            )
            .await;
        }
    }

    Redirect::to("/account").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_label() {
        assert_eq!(provider_label("google"), "Google");
        assert_eq!(provider_label("github"), "GitHub");
        assert_eq!(provider_label("facebook"), "Facebook");
        assert_eq!(provider_label(""), "");
    }
}
