//! HTTP implementation of the backend client.
//!
//! Catalog and FAQ reads are cached for 5 minutes. Everything tied to a
//! visitor (auth, cart, orders) always goes to the backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use herbal_core::{OrderId, ProductId};

use super::BackendError;
use super::cache::{CacheKey, CacheValue};
use super::types::{
    AuthResponse, CartDocument, CartLineRequest, ContactMessage, Faq, LoginRequest,
    MessageResponse, NewOrder, Order, Product, ProfileUpdate, RegisterRequest, User,
};
use crate::config::BackendConfig;

/// Time-to-live for cached catalog and FAQ data.
const CACHE_TTL: Duration = Duration::from_secs(300);

/// Longest error body excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// BackendClient
// =============================================================================

/// Client for the shop's REST backend.
///
/// Cheap to clone; all clones share one connection pool and cache.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key() {
            let value = HeaderValue::from_str(key).map_err(|e| {
                BackendError::UnexpectedResponse(format!("invalid API key header: {e}"))
            })?;
            headers.insert("X-Api-Key", value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .user_agent(concat!("herbal-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.api_url.trim_end_matches('/').to_string(),
                cache,
            }),
        })
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let builder = self.inner.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request and return the JSON body (`Null` for empty bodies).
    async fn send(&self, builder: RequestBuilder) -> Result<Value, BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(&body);
            debug!(
                status = %status,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED => BackendError::Unauthorized(message),
                StatusCode::NOT_FOUND => BackendError::NotFound(message),
                _ => BackendError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Send and decode, unwrapping `{ "<key>": ... }` envelopes.
    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        envelope: &str,
    ) -> Result<T, BackendError> {
        let value = self.send(builder).await?;
        unwrap_envelope(value, envelope)
    }

    /// Check that the backend answers HTTP at all.
    ///
    /// Any HTTP status counts as reachable; only transport failures fail.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` when the backend cannot be reached.
    pub async fn ping(&self) -> Result<(), BackendError> {
        self.inner
            .client
            .get(&self.inner.base_url)
            .send()
            .await
            .map(|_| ())
            .map_err(BackendError::from)
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange email and password for a token.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (typically `Unauthorized` or `Api`
    /// with a message) or a transport error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, BackendError> {
        let builder = self
            .request(Method::POST, "/auth/login", None)
            .json(&LoginRequest { email, password });
        parse_auth(self.send(builder).await?)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (e.g. email already registered).
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, BackendError> {
        let builder = self
            .request(Method::POST, "/auth/register", None)
            .json(&RegisterRequest {
                name,
                email,
                password,
            });
        parse_auth(self.send(builder).await?)
    }

    /// Fetch the profile the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `Unauthorized` when the token is no longer valid.
    #[instrument(skip_all)]
    pub async fn current_user(&self, token: &str) -> Result<User, BackendError> {
        let builder = self.request(Method::GET, "/auth/me", Some(token));
        self.fetch(builder, "user").await
    }

    /// Update editable profile fields.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self, token))]
    pub async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<User, BackendError> {
        let builder = self
            .request(Method::PUT, "/auth/profile", Some(token))
            .json(update);
        self.fetch(builder, "user").await
    }

    /// Ask the backend to email a password reset link.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<MessageResponse, BackendError> {
        let builder = self
            .request(Method::POST, "/auth/forgot-password", None)
            .json(&serde_json::json!({ "email": email }));
        Ok(decode_message(self.send(builder).await?))
    }

    /// Set a new password using the token from a reset email.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (expired or unknown reset token).
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        reset_token: &str,
        password: &str,
    ) -> Result<MessageResponse, BackendError> {
        let path = format!("/auth/reset-password/{}", urlencoding::encode(reset_token));
        let builder = self
            .request(Method::POST, &path, None)
            .json(&serde_json::json!({ "password": password }));
        Ok(decode_message(self.send(builder).await?))
    }

    /// Confirm an email address using the token from a verification email.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (expired or unknown token).
    #[instrument(skip_all)]
    pub async fn verify_email(&self, verification_token: &str) -> Result<MessageResponse, BackendError> {
        let path = format!(
            "/auth/verify-email/{}",
            urlencoding::encode(verification_token)
        );
        let builder = self.request(Method::GET, &path, None);
        Ok(decode_message(self.send(builder).await?))
    }

    /// Send a fresh verification email to the signed-in customer.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip_all)]
    pub async fn resend_verification(&self, token: &str) -> Result<MessageResponse, BackendError> {
        let builder = self.request(Method::POST, "/auth/resend-verification", Some(token));
        Ok(decode_message(self.send(builder).await?))
    }

    /// URL that starts the backend's OAuth flow for `provider`.
    ///
    /// The backend redirects back to `redirect` with `?token=...`.
    #[must_use]
    pub fn oauth_start_url(&self, provider: &str, redirect: &str) -> String {
        format!(
            "{}/auth/{}?redirect={}",
            self.inner.base_url,
            urlencoding::encode(provider),
            urlencoding::encode(redirect)
        )
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// The full product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Arc<Vec<Product>>, BackendError> {
        if let Some(CacheValue::Catalog(products)) = self.inner.cache.get(&CacheKey::Catalog).await
        {
            debug!("Cache hit for catalog");
            return Ok(products);
        }

        let builder = self.request(Method::GET, "/products", None);
        let products: Arc<Vec<Product>> = Arc::new(self.fetch(builder, "products").await?);

        self.inner
            .cache
            .insert(CacheKey::Catalog, CacheValue::Catalog(Arc::clone(&products)))
            .await;

        Ok(products)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids, or the API failure.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, BackendError> {
        let key = CacheKey::Product(id.clone());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{}", urlencoding::encode(id.as_str()));
        let product: Product = self
            .fetch(self.request(Method::GET, &path, None), "product")
            .await?;

        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Drop cached catalog data (stock and ratings change after orders).
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate(&CacheKey::Catalog).await;
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// The customer's server-side cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn get_cart(&self, token: &str) -> Result<CartDocument, BackendError> {
        let value = self
            .send(self.request(Method::GET, "/cart", Some(token)))
            .await?;
        if value.is_null() {
            return Ok(CartDocument::default());
        }
        unwrap_envelope(value, "cart")
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (e.g. out of stock).
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        token: &str,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::POST, "/cart/add", Some(token))
            .json(&CartLineRequest {
                product_id,
                quantity,
            });
        self.send(builder).await.map(|_| ())
    }

    /// Set the quantity of a line.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn update_cart_item(
        &self,
        token: &str,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::PUT, "/cart/update", Some(token))
            .json(&CartLineRequest {
                product_id,
                quantity,
            });
        self.send(builder).await.map(|_| ())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self, token), fields(product_id = %product_id))]
    pub async fn remove_cart_item(
        &self,
        token: &str,
        product_id: &ProductId,
    ) -> Result<(), BackendError> {
        let path = format!("/cart/remove/{}", urlencoding::encode(product_id.as_str()));
        self.send(self.request(Method::DELETE, &path, Some(token)))
            .await
            .map(|_| ())
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip_all)]
    pub async fn clear_cart(&self, token: &str) -> Result<(), BackendError> {
        self.send(self.request(Method::DELETE, "/cart/clear", Some(token)))
            .await
            .map(|_| ())
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Place an order.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (stock, pricing) or a transport error.
    #[instrument(skip_all, fields(items = order.items.len()))]
    pub async fn create_order(&self, token: &str, order: &NewOrder) -> Result<Order, BackendError> {
        let builder = self
            .request(Method::POST, "/orders", Some(token))
            .json(order);
        let placed: Order = self.fetch(builder, "order").await?;
        self.invalidate_catalog().await;
        Ok(placed)
    }

    /// The customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip_all)]
    pub async fn list_orders(&self, token: &str) -> Result<Vec<Order>, BackendError> {
        let mut orders: Vec<Order> = self
            .fetch(self.request(Method::GET, "/orders", Some(token)), "orders")
            .await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// A single order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids, or the API failure.
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn get_order(&self, token: &str, id: &OrderId) -> Result<Order, BackendError> {
        let path = format!("/orders/{}", urlencoding::encode(id.as_str()));
        self.fetch(self.request(Method::GET, &path, Some(token)), "order")
            .await
    }

    /// Cancel an order.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection (e.g. already shipped).
    #[instrument(skip(self, token), fields(order_id = %id))]
    pub async fn cancel_order(&self, token: &str, id: &OrderId) -> Result<Order, BackendError> {
        let path = format!("/orders/{}/cancel", urlencoding::encode(id.as_str()));
        self.fetch(self.request(Method::PUT, &path, Some(token)), "order")
            .await
    }

    // =========================================================================
    // Content
    // =========================================================================

    /// Submit the contact form.
    ///
    /// # Errors
    ///
    /// Returns the backend's rejection or a transport error.
    #[instrument(skip(self, message), fields(email = %message.email))]
    pub async fn submit_contact(
        &self,
        message: &ContactMessage,
    ) -> Result<MessageResponse, BackendError> {
        let builder = self.request(Method::POST, "/contact", None).json(message);
        Ok(decode_message(self.send(builder).await?))
    }

    /// Frequently asked questions.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_faqs(&self) -> Result<Arc<Vec<Faq>>, BackendError> {
        if let Some(CacheValue::Faqs(faqs)) = self.inner.cache.get(&CacheKey::Faqs).await {
            debug!("Cache hit for FAQs");
            return Ok(faqs);
        }

        let faqs: Arc<Vec<Faq>> = Arc::new(
            self.fetch(self.request(Method::GET, "/faqs", None), "faqs")
                .await?,
        );

        self.inner
            .cache
            .insert(CacheKey::Faqs, CacheValue::Faqs(Arc::clone(&faqs)))
            .await;

        Ok(faqs)
    }
}

// =============================================================================
// Response helpers
// =============================================================================

/// Take `value[key]` when the backend wrapped the payload, else the value itself.
fn unwrap_envelope<T: DeserializeOwned>(value: Value, key: &str) -> Result<T, BackendError> {
    let inner = match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    };
    Ok(serde_json::from_value(inner)?)
}

/// Decode `{token, user}` or `{token, ...user fields}`.
fn parse_auth(value: Value) -> Result<AuthResponse, BackendError> {
    let Value::Object(mut map) = value else {
        return Err(BackendError::UnexpectedResponse(
            "auth response is not an object".to_string(),
        ));
    };

    let token = map
        .remove("token")
        .and_then(|t| t.as_str().map(String::from))
        .filter(|t| !t.is_empty())
        .ok_or_else(|| BackendError::UnexpectedResponse("auth response has no token".to_string()))?;

    let user = match map.remove("user") {
        Some(user) => serde_json::from_value(user)?,
        None => serde_json::from_value(Value::Object(map))?,
    };

    Ok(AuthResponse { token, user })
}

/// Acknowledgements are best-effort; an odd body is not an error.
fn decode_message(value: Value) -> MessageResponse {
    serde_json::from_value(value).unwrap_or_default()
}

/// Pull a human-readable message out of a JSON error body.
fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;

    ["message", "error", "msg"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .or_else(|| {
            value
                .get("errors")
                .and_then(Value::as_array)
                .and_then(|errors| errors.first())
                .and_then(|first| first.get("msg").or_else(|| first.get("message")))
                .and_then(Value::as_str)
        })
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(String::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(r#"{"message": "Invalid credentials"}"#).as_deref(),
            Some("Invalid credentials")
        );
        assert_eq!(
            error_message(r#"{"error": "Email already registered"}"#).as_deref(),
            Some("Email already registered")
        );
        assert_eq!(
            error_message(r#"{"errors": [{"msg": "Quantity must be positive"}]}"#).as_deref(),
            Some("Quantity must be positive")
        );
        assert_eq!(error_message(r#"{"message": "  "}"#), None);
        assert_eq!(error_message("<html>Bad Gateway</html>"), None);
        assert_eq!(error_message(""), None);
    }

    #[test]
    fn test_unwrap_envelope_wrapped_and_bare() {
        let wrapped: Vec<u32> = unwrap_envelope(json!({"items": [1, 2]}), "items").unwrap();
        assert_eq!(wrapped, vec![1, 2]);

        let bare: Vec<u32> = unwrap_envelope(json!([3]), "items").unwrap();
        assert_eq!(bare, vec![3]);
    }

    #[test]
    fn test_parse_auth_nested_user() {
        let auth = parse_auth(json!({
            "token": "abc",
            "user": {"_id": "u1", "name": "Sage", "email": "sage@herbs.test"}
        }))
        .unwrap();
        assert_eq!(auth.token, "abc");
        assert_eq!(auth.user.name, "Sage");
    }

    #[test]
    fn test_parse_auth_flat_user() {
        let auth = parse_auth(json!({
            "token": "abc",
            "_id": "u1",
            "name": "Sage",
            "email": "sage@herbs.test",
            "bio": "Herbalist"
        }))
        .unwrap();
        assert_eq!(auth.user.id.as_str(), "u1");
        assert_eq!(auth.user.bio.as_deref(), Some("Herbalist"));
    }

    #[test]
    fn test_parse_auth_requires_token() {
        let err = parse_auth(json!({"user": {"_id": "u1", "name": "S", "email": "s@h.t"}}));
        assert!(matches!(err, Err(BackendError::UnexpectedResponse(_))));
        assert!(matches!(
            parse_auth(json!("nope")),
            Err(BackendError::UnexpectedResponse(_))
        ));
    }

    #[test]
    fn test_oauth_start_url() {
        let client = BackendClient::new(&BackendConfig::with_url("http://api.herbs.test/api/")).unwrap();
        assert_eq!(client.base_url(), "http://api.herbs.test/api");
        assert_eq!(
            client.oauth_start_url("google", "http://shop.test/auth/oauth/callback"),
            "http://api.herbs.test/api/auth/google?redirect=http%3A%2F%2Fshop.test%2Fauth%2Foauth%2Fcallback"
        );
    }
}
