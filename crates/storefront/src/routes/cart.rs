//! Cart route handlers.
//!
//! Cart forms post and redirect back with a toast. Add-to-cart buttons
//! submitted through HTMX get the badge fragment instead of a redirect.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use herbal_core::ProductId;

use crate::filters;
use crate::middleware::{CspNonce, OptionalAuth, PageContext, SessionExpired, safe_next_path};
use crate::models::{CartState, Flash, push_flash};
use crate::services::{CartContainer, CartError};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub product_id: String,
    pub name: String,
    pub image: Option<String>,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u32,
    pub subtotal: String,
    pub shipping: String,
    pub tax: String,
    pub total: String,
    pub free_shipping_remaining: Option<String>,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        let totals = cart.totals();
        Self {
            items: cart
                .items()
                .iter()
                .map(|line| CartItemView {
                    product_id: line.product_id.to_string(),
                    name: line.name.clone(),
                    image: line.image.clone(),
                    quantity: line.quantity,
                    price: line.unit_price().display(),
                    line_price: line.line_total().display(),
                })
                .collect(),
            item_count: totals.item_count,
            subtotal: totals.subtotal.display(),
            shipping: if totals.shipping.is_zero() {
                "Free".to_string()
            } else {
                totals.shipping.display()
            },
            tax: totals.tax.display(),
            total: totals.total.display(),
            free_shipping_remaining: totals.remaining_for_free_shipping().map(|p| p.display()),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<u32>,
    /// Where to go afterwards; defaults to the cart page.
    pub redirect: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: String,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("HX-Request")
}

fn cart_redirect(redirect: Option<&str>) -> Redirect {
    match redirect {
        Some(path) if safe_next_path(redirect) == path => Redirect::to(path),
        _ => Redirect::to("/cart"),
    }
}

/// Display cart page.
///
/// Signed-in customers see the backend cart; if it cannot be fetched the
/// session mirror is shown instead.
#[instrument(skip(state, session, nonce))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> Response {
    let carts = CartContainer::new(state.backend(), &session);
    let cart = match carts.refresh().await {
        Ok(cart) => cart,
        Err(e) if e.is_unauthorized() => return SessionExpired.into_response(),
        Err(e) => {
            tracing::warn!("Failed to fetch cart: {e}");
            push_flash(
                &session,
                Flash::error("We couldn't refresh your cart. Showing your last known cart."),
            )
            .await;
            carts.state().await
        }
    };

    CartShowTemplate {
        page: PageContext::load(&state, Some(&session), &nonce).await,
        cart: CartView::from(&cart),
    }
    .into_response()
}

/// Add item to cart.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Response {
    let product_id = ProductId::new(form.product_id);

    if user.is_none() {
        push_flash(&session, Flash::info("Please sign in to add items to your cart")).await;
        let next = format!("/products/{product_id}");
        return Redirect::to(&format!(
            "/auth/login?next={}",
            urlencoding::encode(&next)
        ))
        .into_response();
    }

    let product = match state.backend().get_product(&product_id).await {
        Ok(product) => product,
        Err(e) => {
            tracing::warn!("Failed to load product {product_id} for cart: {e}");
            push_flash(&session, Flash::error(e.user_message("That product is unavailable"))).await;
            return cart_redirect(form.redirect.as_deref()).into_response();
        }
    };

    let carts = CartContainer::new(state.backend(), &session);
    let result = carts.add(&product, form.quantity.unwrap_or(1)).await;

    if result.as_ref().is_err_and(CartError::is_unauthorized) {
        return SessionExpired.into_response();
    }

    if is_htmx(&headers) {
        if let Err(e) = &result {
            tracing::warn!("Failed to add item to cart: {e}");
        }
        return (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: carts.count().await,
            },
        )
            .into_response();
    }

    match result {
        Ok(_) => {
            push_flash(&session, Flash::success(format!("Added {} to your cart", product.name)))
                .await;
        }
        Err(e) => {
            tracing::warn!("Failed to add item to cart: {e}");
            push_flash(&session, Flash::error(e.user_message("Could not add item to cart"))).await;
        }
    }

    cart_redirect(form.redirect.as_deref()).into_response()
}

/// Update cart item quantity. Zero removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let carts = CartContainer::new(state.backend(), &session);
    let result = carts
        .update_quantity(&ProductId::new(form.product_id), form.quantity)
        .await;

    back_to_cart(&session, result, None, "Could not update your cart").await
}

/// Remove item from cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let carts = CartContainer::new(state.backend(), &session);
    let result = carts.remove(&ProductId::new(form.product_id)).await;

    back_to_cart(
        &session,
        result,
        Some("Item removed from your cart"),
        "Could not remove the item",
    )
    .await
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Response {
    let carts = CartContainer::new(state.backend(), &session);
    let result = carts.clear().await;

    back_to_cart(
        &session,
        result,
        Some("Your cart is now empty"),
        "Could not empty your cart",
    )
    .await
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: CartContainer::new(state.backend(), &session).count().await,
    }
}

/// Toast the outcome of a cart change and return to the cart page.
async fn back_to_cart(
    session: &Session,
    result: Result<CartState, CartError>,
    done: Option<&str>,
    fallback: &str,
) -> Response {
    match result {
        Ok(_) => {
            if let Some(message) = done {
                push_flash(session, Flash::info(message)).await;
            }
        }
        Err(e) if e.is_unauthorized() => return SessionExpired.into_response(),
        Err(e) => {
            tracing::warn!("Cart update failed: {e}");
            push_flash(session, Flash::error(e.user_message(fallback))).await;
        }
    }

    Redirect::to("/cart").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::Product;

    #[test]
    fn test_cart_view_totals() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "tea",
            "name": "Chamomile Tea",
            "price": 12.5,
        }))
        .unwrap();
        let mut cart = CartState::default();
        cart.add(&product, 2);

        let view = CartView::from(&cart);
        assert_eq!(view.items[0].price, "$12.50");
        assert_eq!(view.items[0].line_price, "$25.00");
        assert_eq!(view.shipping, "$5.99");
        assert_eq!(view.total, "$30.99");
        assert_eq!(view.free_shipping_remaining.as_deref(), Some("$25.00"));
    }

    #[test]
    fn test_empty_cart_ships_free() {
        let view = CartView::from(&CartState::default());
        assert!(view.is_empty());
        assert_eq!(view.shipping, "Free");
        assert!(view.free_shipping_remaining.is_none());
    }

    #[test]
    fn test_cart_redirect_is_same_site() {
        let response = cart_redirect(Some("https://evil.test")).into_response();
        assert_eq!(response.headers()["location"], "/cart");

        let response = cart_redirect(Some("/products/tea")).into_response();
        assert_eq!(response.headers()["location"], "/products/tea");

        let response = cart_redirect(None).into_response();
        assert_eq!(response.headers()["location"], "/cart");
    }
}
