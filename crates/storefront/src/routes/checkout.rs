//! Checkout route handlers.
//!
//! Step 1 collects the shipping address and keeps it in the session. Step 2
//! validates the card, places the order and redirects to the confirmation
//! page. Both steps bounce back to the cart when it is empty.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use herbal_core::OrderId;

use crate::api::ShippingAddress;
use crate::error::Result;
use crate::filters;
use crate::middleware::{CspNonce, PageContext, RequireAuth, SessionExpired};
use crate::models::{CartState, Flash, push_flash};
use crate::routes::cart::CartView;
use crate::routes::orders::OrderView;
use crate::services::checkout::{PaymentForm, ShippingForm, validate_payment, validate_shipping};
use crate::services::{CartContainer, CheckoutError, CheckoutFlow, FieldErrors};
use crate::state::AppState;

/// Shipping step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/shipping.html")]
pub struct ShippingTemplate {
    pub page: PageContext,
    pub form: ShippingForm,
    pub errors: FieldErrors,
    pub cart: CartView,
}

/// Payment step template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment.html")]
pub struct PaymentTemplate {
    pub page: PageContext,
    pub shipping: ShippingAddress,
    pub cart: CartView,
    pub cardholder_name: String,
    pub errors: FieldErrors,
    /// Order placement failure shown above the form.
    pub form_error: Option<String>,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: PageContext,
    pub order: OrderView,
}

/// Current cart, preferring the backend copy.
async fn current_cart(
    carts: &CartContainer<'_>,
) -> std::result::Result<CartState, SessionExpired> {
    match carts.refresh().await {
        Ok(cart) => Ok(cart),
        Err(e) if e.is_unauthorized() => Err(SessionExpired),
        Err(e) => {
            tracing::warn!("Cart refresh failed during checkout: {e}");
            Ok(carts.state().await)
        }
    }
}

async fn empty_cart_redirect(session: &Session) -> Response {
    push_flash(session, Flash::info("Your cart is empty")).await;
    Redirect::to("/cart").into_response()
}

/// `/checkout` starts at the shipping step.
pub async fn start() -> Redirect {
    Redirect::to("/checkout/shipping")
}

/// Display the shipping step.
#[instrument(skip(state, session, nonce, user))]
pub async fn shipping_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    RequireAuth(user, _): RequireAuth,
) -> Response {
    let carts = CartContainer::new(state.backend(), &session);
    let cart = match current_cart(&carts).await {
        Ok(cart) => cart,
        Err(expired) => return expired.into_response(),
    };
    if cart.is_empty() {
        return empty_cart_redirect(&session).await;
    }

    let form = match CheckoutFlow::new(state.backend(), &session).shipping().await {
        Some(draft) => ShippingForm::from(&draft),
        None => ShippingForm {
            full_name: user.name.clone(),
            email: user.email.clone(),
            country: "US".to_string(),
            ..ShippingForm::default()
        },
    };

    ShippingTemplate {
        page: PageContext::load(&state, Some(&session), &nonce).await,
        form,
        errors: FieldErrors::default(),
        cart: CartView::from(&cart),
    }
    .into_response()
}

/// Save the shipping address and continue to payment.
///
/// # Errors
///
/// Returns an error if the session store fails.
#[instrument(skip(state, session, nonce, _auth))]
pub async fn save_shipping(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    _auth: RequireAuth,
    Form(form): Form<ShippingForm>,
) -> Result<Response> {
    match validate_shipping(&form) {
        Ok(address) => {
            CheckoutFlow::new(state.backend(), &session)
                .save_shipping(&address)
                .await?;
            Ok(Redirect::to("/checkout/payment").into_response())
        }
        Err(errors) => {
            let cart = CartContainer::new(state.backend(), &session).state().await;
            Ok((
                StatusCode::UNPROCESSABLE_ENTITY,
                ShippingTemplate {
                    page: PageContext::load(&state, Some(&session), &nonce).await,
                    form,
                    errors,
                    cart: CartView::from(&cart),
                },
            )
                .into_response())
        }
    }
}

/// Display the payment step.
#[instrument(skip(state, session, nonce, _auth))]
pub async fn payment_page(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    _auth: RequireAuth,
) -> Response {
    let carts = CartContainer::new(state.backend(), &session);
    let cart = match current_cart(&carts).await {
        Ok(cart) => cart,
        Err(expired) => return expired.into_response(),
    };
    if cart.is_empty() {
        return empty_cart_redirect(&session).await;
    }

    let Some(shipping) = CheckoutFlow::new(state.backend(), &session).shipping().await else {
        push_flash(&session, Flash::info("Please enter your shipping address first")).await;
        return Redirect::to("/checkout/shipping").into_response();
    };

    PaymentTemplate {
        page: PageContext::load(&state, Some(&session), &nonce).await,
        cardholder_name: shipping.full_name.clone(),
        shipping,
        cart: CartView::from(&cart),
        errors: FieldErrors::default(),
        form_error: None,
    }
    .into_response()
}

/// Validate the card and place the order.
#[instrument(skip(state, session, nonce, _auth, form))]
pub async fn place_order(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    _auth: RequireAuth,
    Form(form): Form<PaymentForm>,
) -> Response {
    let flow = CheckoutFlow::new(state.backend(), &session);
    let Some(shipping) = flow.shipping().await else {
        push_flash(&session, Flash::info("Please enter your shipping address first")).await;
        return Redirect::to("/checkout/shipping").into_response();
    };

    let today = chrono::Utc::now().date_naive();
    let (errors, form_error) = match validate_payment(&form, today) {
        Err(errors) => (errors, None),
        Ok(payment) => match flow.place_order(payment).await {
            Ok(order) => {
                push_flash(&session, Flash::success("Thank you! Your order has been placed.")).await;
                return Redirect::to(&format!("/checkout/confirmation/{}", order.id))
                    .into_response();
            }
            Err(CheckoutError::EmptyCart) => return empty_cart_redirect(&session).await,
            Err(CheckoutError::MissingShipping) => {
                return Redirect::to("/checkout/shipping").into_response();
            }
            Err(CheckoutError::NotSignedIn) => {
                return Redirect::to("/auth/login").into_response();
            }
            Err(CheckoutError::Backend(e)) => {
                if e.is_unauthorized() {
                    return SessionExpired.into_response();
                }
                if e.is_server_side() {
                    tracing::error!("Order placement failed: {e}");
                } else {
                    tracing::warn!("Order rejected: {e}");
                }
                (
                    FieldErrors::default(),
                    Some(e.user_message("We couldn't place your order. Please try again.")),
                )
            }
        },
    };

    let cart = CartContainer::new(state.backend(), &session).state().await;
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        PaymentTemplate {
            page: PageContext::load(&state, Some(&session), &nonce).await,
            shipping,
            cart: CartView::from(&cart),
            cardholder_name: form.cardholder_name,
            errors,
            form_error,
        },
    )
        .into_response()
}

/// Display the confirmation page for a just-placed order.
///
/// # Errors
///
/// Returns 404 for unknown orders and an error page when the backend fails.
#[instrument(skip(state, page, token))]
pub async fn confirmation(
    State(state): State<AppState>,
    page: PageContext,
    RequireAuth(_, token): RequireAuth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let order = state
        .backend()
        .get_order(token.expose(), &OrderId::new(id))
        .await?;

    Ok(ConfirmationTemplate {
        page,
        order: OrderView::from(&order),
    })
}
