//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Readiness check (backend reachable)
//!
//! # Catalog
//! GET  /products               - Product listing (?category, q, sort, page)
//! GET  /products/{id}          - Product detail
//!
//! # Cart (requires auth for changes)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (badge fragment for HTMX)
//! POST /cart/update            - Update quantity
//! POST /cart/remove            - Remove line
//! POST /cart/clear             - Empty cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires auth)
//! GET  /checkout                      - Redirect to first step
//! GET  /checkout/shipping             - Shipping form
//! POST /checkout/shipping             - Save shipping address
//! GET  /checkout/payment              - Payment form
//! POST /checkout/payment              - Place order
//! GET  /checkout/confirmation/{id}    - Order confirmation
//!
//! # Auth (form posts rate limited)
//! GET  /auth/login                    - Login page
//! POST /auth/login                    - Login action
//! GET  /auth/register                 - Register page
//! POST /auth/register                 - Register action
//! POST /auth/logout                   - Logout action
//! GET  /auth/forgot-password          - Forgot password page
//! POST /auth/forgot-password          - Request reset link
//! GET  /auth/reset-password/{token}   - Reset password page
//! POST /auth/reset-password/{token}   - Set new password
//! GET  /auth/verify-email/{token}     - Verify email address
//! POST /auth/resend-verification      - Send another verification email
//! GET  /auth/oauth/{provider}         - Start social sign-in
//! GET  /auth/oauth/callback           - Finish social sign-in
//!
//! # Account (requires auth)
//! GET  /account                - Profile and recent orders
//! POST /account                - Save profile
//! GET  /orders                 - Order history
//! GET  /orders/{id}            - Order detail
//! POST /orders/{id}/cancel     - Cancel order
//!
//! # Content
//! GET  /pages/{slug}           - Markdown content page
//! GET  /faq                    - FAQ
//! GET  /contact                - Contact form
//! POST /contact                - Send message (rate limited)
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod contact;
pub mod faq;
pub mod health;
pub mod home;
pub mod oauth;
pub mod orders;
pub mod pages;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::form_rate_limiter;
use crate::middleware::rate_limit::RateLimiterLayer;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Every form post shares one per-IP limiter.
pub fn auth_routes(limiter: &RateLimiterLayer) -> Router<AppState> {
    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(limiter.clone())),
        )
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(limiter.clone())),
        )
        .route("/logout", post(auth::logout))
        .route(
            "/forgot-password",
            get(auth::forgot_password_page)
                .merge(post(auth::forgot_password).layer(limiter.clone())),
        )
        .route(
            "/reset-password/{token}",
            get(auth::reset_password_page).merge(post(auth::reset_password).layer(limiter.clone())),
        )
        .route("/verify-email/{token}", get(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        // Social sign-in
        .route("/oauth/callback", get(oauth::callback))
        .route("/oauth/{provider}", get(oauth::start))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::start))
        .route(
            "/shipping",
            get(checkout::shipping_page).post(checkout::save_shipping),
        )
        .route(
            "/payment",
            get(checkout::payment_page).post(checkout::place_order),
        )
        .route("/confirmation/{id}", get(checkout::confirmation))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    let limiter = form_rate_limiter();

    Router::new()
        // Home page
        .route("/", get(home::home))
        // Health checks
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        // Catalog
        .nest("/products", product_routes())
        // Cart
        .nest("/cart", cart_routes())
        // Checkout
        .nest("/checkout", checkout_routes())
        // Auth
        .nest("/auth", auth_routes(&limiter))
        // Account
        .route("/account", get(account::index).post(account::update))
        .nest("/orders", order_routes())
        // Content
        .nest("/pages", pages::router())
        .route("/faq", get(faq::show))
        .route(
            "/contact",
            get(contact::show).merge(post(contact::submit).layer(limiter)),
        )
}
