//! Cart container: the session mirror of the backend cart.
//!
//! Every mutation runs the same three steps:
//!
//! 1. apply the change to the mirror and store it,
//! 2. send the change to the backend,
//! 3. re-fetch the backend cart and store that, whatever step 2 returned.
//!
//! The backend copy always wins. If the re-fetch itself fails, the mirror
//! keeps the optimistic change when the backend accepted it and rolls back
//! when it did not. A rejected token signs the visitor out instead.

use std::future::Future;

use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;

use herbal_core::ProductId;

use crate::api::{BackendClient, BackendError, Product};
use crate::error::add_breadcrumb;
use crate::models::cart::clamp_quantity;
use crate::models::{AuthToken, CartState, session_keys};
use crate::services::session::forget_sign_in;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Cart changes need a signed-in customer.
    #[error("not signed in")]
    NotSignedIn,

    /// The backend rejected the change or could not be reached.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl CartError {
    /// Text for a toast.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::NotSignedIn => "Please sign in to use your cart".to_string(),
            Self::Backend(err) => err.user_message(fallback),
        }
    }

    /// Whether the backend refused the stored token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Backend(err) if err.is_unauthorized())
    }
}

/// Cart operations bound to one visitor's session.
pub struct CartContainer<'a> {
    backend: &'a BackendClient,
    session: &'a Session,
}

impl<'a> CartContainer<'a> {
    #[must_use]
    pub const fn new(backend: &'a BackendClient, session: &'a Session) -> Self {
        Self { backend, session }
    }

    /// The mirror as currently stored (empty for guests).
    pub async fn state(&self) -> CartState {
        self.session
            .get(session_keys::CART)
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    /// Total units in the mirror.
    pub async fn count(&self) -> u32 {
        self.state().await.item_count()
    }

    /// Replace the mirror with the backend cart.
    ///
    /// Guests get an empty cart without a backend call.
    ///
    /// # Errors
    ///
    /// Returns the backend failure; the mirror is left untouched unless the
    /// token was rejected.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<CartState, CartError> {
        let Some(token) = self.token().await else {
            let empty = CartState::default();
            self.store(&empty).await;
            return Ok(empty);
        };

        match self.backend.get_cart(token.expose()).await {
            Ok(document) => {
                let cart = CartState::from(document);
                self.store(&cart).await;
                Ok(cart)
            }
            Err(e) => Err(self.rejected(e).await),
        }
    }

    /// Add units of a product.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` for guests, otherwise the backend's rejection of
    /// the add (after reconciling).
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add(&self, product: &Product, quantity: u32) -> Result<CartState, CartError> {
        let token = self.token().await.ok_or(CartError::NotSignedIn)?;
        let quantity = clamp_quantity(quantity);

        add_breadcrumb(
            "cart",
            "Add to cart",
            Some(&[("product_id", product.id.as_str())]),
        );

        self.mutate(
            &token,
            |cart| cart.add(product, quantity),
            self.backend
                .add_to_cart(token.expose(), &product.id, quantity),
        )
        .await
    }

    /// Set a line's quantity; zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` for guests, otherwise the backend's rejection.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartState, CartError> {
        if quantity == 0 {
            return self.remove(product_id).await;
        }

        let token = self.token().await.ok_or(CartError::NotSignedIn)?;
        let quantity = clamp_quantity(quantity);

        self.mutate(
            &token,
            |cart| cart.set_quantity(product_id, quantity),
            self.backend
                .update_cart_item(token.expose(), product_id, quantity),
        )
        .await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` for guests, otherwise the backend's rejection.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<CartState, CartError> {
        let token = self.token().await.ok_or(CartError::NotSignedIn)?;

        add_breadcrumb(
            "cart",
            "Remove from cart",
            Some(&[("product_id", product_id.as_str())]),
        );

        self.mutate(
            &token,
            |cart| cart.remove(product_id),
            self.backend.remove_cart_item(token.expose(), product_id),
        )
        .await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` for guests, otherwise the backend's rejection.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<CartState, CartError> {
        let token = self.token().await.ok_or(CartError::NotSignedIn)?;

        self.mutate(
            &token,
            CartState::clear,
            self.backend.clear_cart(token.expose()),
        )
        .await
    }

    async fn mutate<F>(
        &self,
        token: &AuthToken,
        apply: impl FnOnce(&mut CartState),
        call: F,
    ) -> Result<CartState, CartError>
    where
        F: Future<Output = Result<(), BackendError>>,
    {
        let before = self.state().await;
        let mut optimistic = before.clone();
        apply(&mut optimistic);
        self.store(&optimistic).await;

        let result = match call.await {
            Err(e) if e.is_unauthorized() => return Err(self.rejected(e).await),
            Err(e) => {
                tracing::warn!(error = %e, "Backend rejected cart change");
                Err(e)
            }
            Ok(()) => Ok(()),
        };

        let reconciled = match self.backend.get_cart(token.expose()).await {
            Ok(document) => CartState::from(document),
            Err(e) if e.is_unauthorized() => return Err(self.rejected(e).await),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to re-fetch cart after change");
                if result.is_ok() { optimistic } else { before }
            }
        };
        self.store(&reconciled).await;

        result.map(|()| reconciled).map_err(CartError::from)
    }

    /// Sign out if the backend no longer accepts the stored token.
    async fn rejected(&self, err: BackendError) -> CartError {
        if err.is_unauthorized() {
            tracing::warn!(error = %err, "Stored token rejected, signing out");
            if let Err(e) = forget_sign_in(self.session).await {
                tracing::error!("Failed to clear expired sign-in: {e}");
            }
        }
        CartError::Backend(err)
    }

    async fn token(&self) -> Option<AuthToken> {
        self.session
            .get(session_keys::AUTH_TOKEN)
            .await
            .ok()
            .flatten()
    }

    async fn store(&self, cart: &CartState) {
        if let Err(e) = self.session.insert(session_keys::CART, cart).await {
            tracing::error!("Failed to save cart to session: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_error_messages() {
        assert_eq!(
            CartError::NotSignedIn.user_message("x"),
            "Please sign in to use your cart"
        );
        let err = CartError::Backend(BackendError::Api {
            status: 400,
            message: Some("Only 3 left in stock".to_string()),
        });
        assert_eq!(err.user_message("Could not update cart"), "Only 3 left in stock");
        let err = CartError::Backend(BackendError::Api {
            status: 500,
            message: None,
        });
        assert_eq!(err.user_message("Could not update cart"), "Could not update cart");
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn test_rejected_token_is_unauthorized() {
        assert!(CartError::Backend(BackendError::Unauthorized(None)).is_unauthorized());
        assert!(!CartError::NotSignedIn.is_unauthorized());
    }
}
