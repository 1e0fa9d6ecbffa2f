//! Session-related types.
//!
//! Types stored in the session for authentication state.

use std::fmt;

use serde::{Deserialize, Serialize};

use herbal_core::UserId;

use crate::api::User;

/// Session-stored user identity.
///
/// A snapshot of the profile taken at sign-in (and refreshed on profile
/// edits). Used for the header and for Sentry context; pages that need the
/// full profile fetch it from the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub is_verified: bool,
}

impl CurrentUser {
    /// First word of the name, for greetings.
    #[must_use]
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or(&self.name)
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            is_verified: user.is_verified,
        }
    }
}

/// The backend bearer token.
///
/// Lives only in the server-side session store; `Debug` never prints it.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token issued by the backend.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken([REDACTED])")
    }
}

/// Session keys.
pub mod keys {
    /// Backend bearer token.
    pub const AUTH_TOKEN: &str = "auth_token";

    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Mirror of the server-side cart.
    pub const CART: &str = "cart";

    /// Shipping address entered in checkout step 1.
    pub const CHECKOUT_SHIPPING: &str = "checkout_shipping";

    /// Pending toast notifications.
    pub const FLASH: &str = "flash";

    /// Post-login destination while an OAuth sign-in is in flight.
    pub const OAUTH_NEXT: &str = "oauth_next";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = AuthToken::new("eyJhbGciOi.secret");
        assert_eq!(format!("{token:?}"), "AuthToken([REDACTED])");
        assert_eq!(token.expose(), "eyJhbGciOi.secret");
    }

    #[test]
    fn test_first_name() {
        let user = CurrentUser {
            id: UserId::new("u1"),
            name: "Rosemary Thyme".to_string(),
            email: "rosemary@herbs.test".to_string(),
            avatar: None,
            is_verified: true,
        };
        assert_eq!(user.first_name(), "Rosemary");
    }
}
