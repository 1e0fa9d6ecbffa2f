//! Integration tests for the herbal storefront.
//!
//! Each test starts a fake REST backend and a storefront pointed at it, both
//! on ephemeral local ports, then drives the storefront over HTTP with a
//! cookie-keeping client that does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p herbal-integration-tests
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let ctx = TestContext::start().await;
//! ctx.sign_in().await;
//!
//! let resp = ctx.get("/cart").await;
//! assert_eq!(resp.status(), 200);
//! ```

pub mod backend;

use std::net::SocketAddr;
use std::path::PathBuf;

use herbal_storefront::config::{BackendConfig, SentryConfig, StorefrontConfig};
use herbal_storefront::state::AppState;
use reqwest::{Client, Response, StatusCode, redirect::Policy};
use tokio::net::TcpListener;

pub use backend::{CUSTOMER_EMAIL, CUSTOMER_PASSWORD, FakeBackend};

/// A running storefront plus the fake backend behind it.
pub struct TestContext {
    pub client: Client,
    pub base_url: String,
    pub backend: FakeBackend,
}

impl TestContext {
    /// Start a fake backend and a storefront that talks to it.
    ///
    /// # Panics
    ///
    /// Panics if a listener cannot be bound or the app state cannot be built.
    pub async fn start() -> Self {
        let backend = FakeBackend::start().await;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read storefront address");

        let crate_dir = storefront_dir();
        let config = StorefrontConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: format!("http://{addr}"),
            content_dir: crate_dir.join("content"),
            static_dir: crate_dir.join("static"),
            backend: BackendConfig::with_url(&backend.url()),
            oauth_providers: vec!["google".to_string(), "github".to_string()],
            sentry: SentryConfig::default(),
        };
        let state = AppState::new(config).expect("Failed to build app state");
        let app = herbal_storefront::app(state);

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Storefront server failed");
        });

        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: format!("http://{addr}"),
            backend,
        }
    }

    /// Absolute URL for a storefront path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET a storefront path.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a urlencoded form.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be sent.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// GET a path and return its body, asserting a 200.
    ///
    /// # Panics
    ///
    /// Panics on a non-200 status or an unreadable body.
    pub async fn page(&self, path: &str) -> String {
        let resp = self.get(path).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {path}");
        resp.text().await.expect("Failed to read body")
    }

    /// Sign in as the fake backend's customer.
    ///
    /// # Panics
    ///
    /// Panics if sign-in does not redirect.
    pub async fn sign_in(&self) {
        let resp = self
            .post_form(
                "/auth/login",
                &[("email", CUSTOMER_EMAIL), ("password", CUSTOMER_PASSWORD)],
            )
            .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "sign-in should redirect");
    }
}

/// The `Location` header of a redirect.
///
/// # Panics
///
/// Panics if the response has no `Location` header.
#[must_use]
pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("response has no Location header")
        .to_string()
}

fn storefront_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../storefront")
}
