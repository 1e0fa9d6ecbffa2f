//! Session container: the visitor's bearer token and profile snapshot.
//!
//! Every sign-in path (password, registration, OAuth) ends in the same place:
//! the session id is cycled, then the token and a [`CurrentUser`] snapshot are
//! stored. Sign-out removes both along with the cart mirror and any checkout
//! draft.

mod error;

pub use error::AuthError;

use tower_sessions::Session;
use tracing::instrument;

use herbal_core::Email;

use crate::api::{AuthResponse, BackendClient, BackendError, MessageResponse, ProfileUpdate, User};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AuthToken, CurrentUser, session_keys};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Account operations bound to one visitor's session.
pub struct AccountSession<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
}

impl<'a> AccountSession<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, session: &'a Session) -> Self {
        Self { backend, session }
    }

    /// The stored bearer token, if signed in.
    pub async fn token(&self) -> Option<AuthToken> {
        self.session
            .get(session_keys::AUTH_TOKEN)
            .await
            .ok()
            .flatten()
    }

    /// The stored profile snapshot, if signed in.
    pub async fn current_user(&self) -> Option<CurrentUser> {
        self.session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed email or blank password,
    /// otherwise the backend's rejection.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::MissingField("Password"));
        }

        let auth = self.backend.login(email.as_str(), password).await?;
        self.establish(auth).await
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank name, malformed email, short
    /// password, or mismatched confirmation, otherwise the backend's
    /// rejection.
    #[instrument(skip(self, password, confirm))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        confirm: &str,
    ) -> Result<CurrentUser, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::MissingField("Name"));
        }
        let email = Email::parse(email)?;
        validate_new_password(password, confirm)?;

        let auth = self
            .backend
            .register(name, email.as_str(), password)
            .await?;
        self.establish(auth).await
    }

    /// Finish an OAuth sign-in from the token the backend redirected with.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` for a blank token, or the backend's rejection
    /// when the token does not resolve to a user.
    #[instrument(skip_all)]
    pub async fn complete_oauth(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingField("Token"));
        }

        let user = self.backend.current_user(token).await?;
        self.establish(AuthResponse {
            token: token.to_string(),
            user,
        })
        .await
    }

    /// Sign out.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), AuthError> {
        forget_sign_in(self.session).await?;
        self.session.cycle_id().await?;
        Ok(())
    }

    /// Re-fetch the signed-in customer's profile.
    ///
    /// Returns `Ok(None)` for guests. When the fetch fails for any reason the
    /// stored token is discarded and the visitor becomes a guest.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store fails.
    #[instrument(skip(self))]
    pub async fn load_current_user(&self) -> Result<Option<User>, AuthError> {
        let Some(token) = self.token().await else {
            return Ok(None);
        };

        match self.backend.current_user(token.expose()).await {
            Ok(user) => {
                self.session
                    .insert(session_keys::CURRENT_USER, CurrentUser::from(&user))
                    .await?;
                Ok(Some(user))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored token rejected, signing out");
                forget_sign_in(self.session).await?;
                Ok(None)
            }
        }
    }

    /// Save profile edits and refresh the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` for guests, `MissingField` for a blank name, or
    /// the backend's rejection. A rejected token also signs the visitor out.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, AuthError> {
        let token = self.token().await.ok_or(AuthError::NotSignedIn)?;

        let update = normalize_profile(update);
        if update.name.is_empty() {
            return Err(AuthError::MissingField("Name"));
        }
        if let Some(avatar) = &update.avatar {
            if !is_web_url(avatar) {
                return Err(AuthError::InvalidUrl("Avatar"));
            }
        }

        let user = match self.backend.update_profile(token.expose(), &update).await {
            Ok(user) => user,
            Err(e) => return Err(self.rejected(e).await),
        };
        self.session
            .insert(session_keys::CURRENT_USER, CurrentUser::from(&user))
            .await?;
        Ok(user)
    }

    /// Ask the backend to send another verification email.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` for guests, or the backend's rejection.
    pub async fn resend_verification(&self) -> Result<MessageResponse, AuthError> {
        let token = self.token().await.ok_or(AuthError::NotSignedIn)?;
        match self.backend.resend_verification(token.expose()).await {
            Ok(response) => Ok(response),
            Err(e) => Err(self.rejected(e).await),
        }
    }

    async fn establish(&self, auth: AuthResponse) -> Result<CurrentUser, AuthError> {
        let user = CurrentUser::from(&auth.user);

        // New identity, new session id
        self.session.cycle_id().await?;
        self.session
            .insert(session_keys::AUTH_TOKEN, AuthToken::new(auth.token))
            .await?;
        self.session
            .insert(session_keys::CURRENT_USER, &user)
            .await?;

        set_sentry_user(&user.id, Some(&user.email));
        tracing::info!(user_id = %user.id, "Customer signed in");
        Ok(user)
    }

    /// Sign out if the backend no longer accepts the stored token.
    async fn rejected(&self, err: BackendError) -> AuthError {
        if err.is_unauthorized() {
            tracing::warn!(error = %err, "Stored token rejected, signing out");
            if let Err(e) = forget_sign_in(self.session).await {
                tracing::error!("Failed to clear expired sign-in: {e}");
            }
        }
        AuthError::Backend(err)
    }
}

/// Drop the token, profile snapshot, cart mirror and checkout draft.
///
/// Used on logout and whenever the backend rejects the stored token. Pending
/// toasts are kept so the next page can explain what happened.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn forget_sign_in(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<AuthToken>(session_keys::AUTH_TOKEN).await?;
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.remove::<serde_json::Value>(session_keys::CART).await?;
    session
        .remove::<serde_json::Value>(session_keys::CHECKOUT_SHIPPING)
        .await?;
    clear_sentry_user();
    Ok(())
}

/// Check a new password and its confirmation.
///
/// # Errors
///
/// Returns `WeakPassword` for lengths outside the allowed range and
/// `PasswordMismatch` when the confirmation differs.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    let length = password.chars().count();
    if length < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    Ok(())
}

/// Whether `value` parses as an absolute http(s) URL.
fn is_web_url(value: &str) -> bool {
    url::Url::parse(value).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Trim every field and turn blank optional fields into `None`.
fn normalize_profile(update: ProfileUpdate) -> ProfileUpdate {
    fn optional(value: Option<String>) -> Option<String> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    ProfileUpdate {
        name: update.name.trim().to_string(),
        avatar: optional(update.avatar),
        bio: optional(update.bio),
        location: optional(update.location),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::{Flash, push_flash, take_flashes};

    #[tokio::test]
    async fn test_forget_sign_in_keeps_toasts() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        session
            .insert(session_keys::AUTH_TOKEN, AuthToken::new("stale"))
            .await
            .unwrap();
        session
            .insert(
                session_keys::CURRENT_USER,
                CurrentUser {
                    id: herbal_core::UserId::new("u1"),
                    name: "Sage".to_string(),
                    email: "sage@herbs.test".to_string(),
                    avatar: None,
                    is_verified: true,
                },
            )
            .await
            .unwrap();
        session
            .insert(session_keys::CHECKOUT_SHIPPING, "draft")
            .await
            .unwrap();
        push_flash(&session, Flash::info("Please sign in again")).await;

        forget_sign_in(&session).await.unwrap();

        assert!(
            session
                .get::<AuthToken>(session_keys::AUTH_TOKEN)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            session
                .get::<String>(session_keys::CHECKOUT_SHIPPING)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(take_flashes(&session).await.len(), 1);
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_new_password("hunter22", "hunter22").is_ok());
        assert!(matches!(
            validate_new_password("short", "short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            validate_new_password("longenough", "longenougH"),
            Err(AuthError::PasswordMismatch)
        ));
        let huge = "x".repeat(MAX_PASSWORD_LENGTH + 1);
        assert!(matches!(
            validate_new_password(&huge, &huge),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn test_is_web_url() {
        assert!(is_web_url("https://cdn.herbs.test/a.png"));
        assert!(is_web_url("http://localhost:3000/a.png"));
        assert!(!is_web_url("javascript:alert(1)"));
        assert!(!is_web_url("/relative.png"));
    }

    #[test]
    fn test_normalize_profile() {
        let update = normalize_profile(ProfileUpdate {
            name: "  Sage  ".to_string(),
            avatar: Some("   ".to_string()),
            bio: Some(" Grows mint ".to_string()),
            location: None,
        });
        assert_eq!(update.name, "Sage");
        assert_eq!(update.avatar, None);
        assert_eq!(update.bio.as_deref(), Some("Grows mint"));
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::PasswordMismatch.user_message("x"),
            "Passwords do not match"
        );
        assert_eq!(
            AuthError::MissingField("Password").user_message("x"),
            "Password is required"
        );
        let backend = AuthError::Backend(crate::api::BackendError::Unauthorized(Some(
            "Invalid credentials".to_string(),
        )));
        assert_eq!(backend.user_message("Login failed"), "Invalid credentials");
        assert!(!backend.is_server_side());
        assert!(backend.is_unauthorized());
        assert!(!AuthError::NotSignedIn.is_unauthorized());
    }
}
