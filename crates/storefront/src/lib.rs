//! Herbal Storefront library.
//!
//! Server-rendered shop front for the herbal store. Products, carts, orders
//! and accounts live in the remote REST backend; this crate renders pages,
//! keeps the visitor's session, and forwards their actions.
//!
//! The router is built by [`app`] so the binary and the integration tests
//! serve exactly the same stack.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, middleware as axum_middleware};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so the
/// rate limiter can fall back to the peer address.
#[must_use]
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.config());
    let static_dir = ServeDir::new(&state.config().static_dir);

    Router::new()
        .merge(routes::routes())
        .nest_service("/static", static_dir)
        // Innermost first: later layers wrap earlier ones
        .layer(axum_middleware::from_fn(
            middleware::session_expiry_middleware,
        ))
        .layer(session_layer)
        .layer(axum_middleware::from_fn(middleware::csp_nonce_middleware))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(axum_middleware::from_fn(middleware::request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(middleware::make_request_span))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;

    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::api::BackendClient;
    use crate::config::{BackendConfig, SentryConfig, StorefrontConfig};
    use crate::content::ContentStore;

    fn test_state() -> AppState {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            content_dir: PathBuf::from("content"),
            static_dir: PathBuf::from("static"),
            // Nothing listens here; these tests never reach the backend
            backend: BackendConfig::with_url("http://127.0.0.1:9"),
            oauth_providers: vec!["google".to_string()],
            sentry: SentryConfig::default(),
        };
        let backend = BackendClient::new(&config.backend).unwrap();
        AppState::from_parts(config, backend, ContentStore::default())
    }

    async fn get(uri: &str) -> axum::response::Response {
        app(test_state())
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let resp = get("/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        assert!(resp.headers().contains_key(header::CONTENT_SECURITY_POLICY));
    }

    #[tokio::test]
    async fn test_guest_redirected_to_login() {
        let resp = get("/orders?page=2").await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers()[header::LOCATION],
            "/auth/login?next=%2Forders%3Fpage%3D2"
        );
    }

    #[tokio::test]
    async fn test_unknown_page_is_not_found() {
        let resp = get("/pages/missing").await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
