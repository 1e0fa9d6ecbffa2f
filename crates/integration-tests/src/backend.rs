//! A fake REST backend with a small fixed catalog and one customer.
//!
//! Behaves like the real service where the storefront depends on it: cart
//! quantities are capped at stock (so the server's answer can differ from
//! what was asked for), only pending orders can be cancelled, and every
//! customer call needs the bearer token issued at login. Tests can revoke
//! that token to simulate an expired sign-in.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// Email of the only registered customer.
pub const CUSTOMER_EMAIL: &str = "sage@herbs.test";

/// Password of the only registered customer.
pub const CUSTOMER_PASSWORD: &str = "chamomile-tea";

const TOKEN: &str = "token-sage";

#[derive(Debug, Clone)]
struct CartLine {
    product_id: String,
    quantity: u32,
}

#[derive(Debug, Default)]
struct Data {
    cart: Vec<CartLine>,
    orders: Vec<Value>,
    contact_messages: Vec<Value>,
    token_revoked: bool,
}

type Shared = Arc<Mutex<Data>>;

/// Handle to a running fake backend.
#[derive(Clone)]
pub struct FakeBackend {
    addr: SocketAddr,
    data: Shared,
}

impl FakeBackend {
    /// Serve the fake backend on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let data = Shared::default();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind backend listener");
        let addr = listener
            .local_addr()
            .expect("Failed to read backend address");

        let app = router(Arc::clone(&data));
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Fake backend failed");
        });

        Self { addr, data }
    }

    /// Base URL to configure the storefront with.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Quantity the backend holds for a product in the customer's cart.
    pub async fn cart_quantity(&self, product_id: &str) -> Option<u32> {
        self.data
            .lock()
            .await
            .cart
            .iter()
            .find(|line| line.product_id == product_id)
            .map(|line| line.quantity)
    }

    /// Number of orders placed.
    pub async fn order_count(&self) -> usize {
        self.data.lock().await.orders.len()
    }

    /// The last order as the backend stored it.
    pub async fn last_order(&self) -> Option<Value> {
        self.data.lock().await.orders.last().cloned()
    }

    /// Reject the issued token until the customer signs in again.
    pub async fn revoke_token(&self) {
        self.data.lock().await.token_revoked = true;
    }

    /// Contact form submissions received.
    pub async fn contact_messages(&self) -> Vec<Value> {
        self.data.lock().await.contact_messages.clone()
    }
}

fn router(data: Shared) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
        .route("/auth/forgot-password", post(acknowledge))
        .route("/products", get(products))
        .route("/products/{id}", get(product))
        .route("/cart", get(cart))
        .route("/cart/add", post(cart_add))
        .route("/cart/update", put(cart_update))
        .route("/cart/remove/{id}", delete(cart_remove))
        .route("/cart/clear", delete(cart_clear))
        .route("/orders", get(orders).post(create_order))
        .route("/orders/{id}", get(order))
        .route("/orders/{id}/cancel", put(cancel_order))
        .route("/faqs", get(faqs))
        .route("/contact", post(contact))
        .with_state(data)
}

// =============================================================================
// Fixtures
// =============================================================================

fn catalog() -> Vec<Value> {
    vec![
        json!({
            "_id": "lavender-tea",
            "name": "Lavender Calm Tea",
            "description": "A floral evening blend of lavender and lemon balm.",
            "price": 12.5,
            "originalPrice": 15,
            "images": ["/img/lavender-tea.jpg"],
            "category": "Teas",
            "rating": 4.5,
            "numReviews": 20,
            "isBestSeller": true,
            "countInStock": 40
        }),
        json!({
            "_id": "calendula-salve",
            "name": "Calendula Salve",
            "description": "Soothing balm for dry skin.",
            "price": 18,
            "images": ["/img/calendula-salve.jpg"],
            "category": "Salves",
            "rating": 4.8,
            "numReviews": 12,
            "isNew": true,
            "countInStock": 3
        }),
        json!({
            "_id": "elderberry-syrup",
            "name": "Elderberry Syrup",
            "description": "Rich syrup for the winter months.",
            "price": 24,
            "images": [],
            "category": "Tinctures",
            "rating": 4.1,
            "numReviews": 7,
            "countInStock": 0
        }),
    ]
}

fn find_product(id: &str) -> Option<Value> {
    catalog().into_iter().find(|p| p["_id"] == id)
}

fn customer() -> Value {
    json!({
        "_id": "user-sage",
        "name": "Sage Meadows",
        "email": CUSTOMER_EMAIL,
        "isVerified": true
    })
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "message": message }))).into_response()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Not authorized, token failed" })),
    )
        .into_response()
}

async fn authorized(data: &Shared, headers: &HeaderMap) -> bool {
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {TOKEN}"));
    bearer && !data.lock().await.token_revoked
}

fn stock_of(product: &Value) -> u32 {
    product["countInStock"]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(u32::MAX)
}

fn cart_json(lines: &[CartLine]) -> Value {
    let items: Vec<Value> = lines
        .iter()
        .filter_map(|line| {
            let product = find_product(&line.product_id)?;
            Some(json!({
                "productId": line.product_id,
                "quantity": line.quantity,
                "name": product["name"],
                "price": product["price"],
                "image": product["images"].get(0),
            }))
        })
        .collect();
    json!({ "cart": { "items": items } })
}

// =============================================================================
// Auth
// =============================================================================

async fn login(State(data): State<Shared>, Json(body): Json<Value>) -> Response {
    if body["email"] == CUSTOMER_EMAIL && body["password"] == CUSTOMER_PASSWORD {
        data.lock().await.token_revoked = false;
        Json(json!({ "token": TOKEN, "user": customer() })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid email or password" })),
        )
            .into_response()
    }
}

async fn register(Json(body): Json<Value>) -> Response {
    if body["email"] == CUSTOMER_EMAIL {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "User already exists" })),
        )
            .into_response();
    }
    // Flat user fields next to the token
    Json(json!({
        "token": TOKEN,
        "_id": "user-new",
        "name": body["name"],
        "email": body["email"],
        "isVerified": false
    }))
    .into_response()
}

async fn me(State(data): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    Json(json!({ "user": customer() })).into_response()
}

async fn acknowledge() -> Json<Value> {
    Json(json!({ "message": "If that account exists, an email is on its way." }))
}

// =============================================================================
// Catalog
// =============================================================================

async fn products() -> Json<Value> {
    Json(json!({ "products": catalog() }))
}

async fn product(Path(id): Path<String>) -> Response {
    match find_product(&id) {
        Some(product) => Json(json!({ "product": product })).into_response(),
        None => not_found("Product not found"),
    }
}

// =============================================================================
// Cart
// =============================================================================

async fn cart(State(data): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    Json(cart_json(&data.lock().await.cart)).into_response()
}

async fn cart_add(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    let id = body["productId"].as_str().unwrap_or_default().to_string();
    let Some(product) = find_product(&id) else {
        return not_found("Product not found");
    };
    let stock = stock_of(&product);
    if stock == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "This product is out of stock" })),
        )
            .into_response();
    }
    let requested = body["quantity"]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(1);

    let mut data = data.lock().await;
    match data.cart.iter_mut().find(|line| line.product_id == id) {
        Some(line) => line.quantity = (line.quantity + requested).min(stock),
        None => data.cart.push(CartLine {
            product_id: id,
            quantity: requested.min(stock),
        }),
    }
    Json(cart_json(&data.cart)).into_response()
}

async fn cart_update(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    let id = body["productId"].as_str().unwrap_or_default();
    let quantity = body["quantity"]
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0);
    let stock = find_product(id).map_or(0, |p| stock_of(&p));

    let mut data = data.lock().await;
    if quantity == 0 {
        data.cart.retain(|line| line.product_id != id);
    } else if let Some(line) = data.cart.iter_mut().find(|line| line.product_id == id) {
        line.quantity = quantity.min(stock);
    } else {
        return not_found("Item not in cart");
    }
    Json(cart_json(&data.cart)).into_response()
}

async fn cart_remove(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    let mut data = data.lock().await;
    data.cart.retain(|line| line.product_id != id);
    Json(cart_json(&data.cart)).into_response()
}

async fn cart_clear(State(data): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    data.lock().await.cart.clear();
    StatusCode::NO_CONTENT.into_response()
}

// =============================================================================
// Orders
// =============================================================================

async fn create_order(
    State(data): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    let mut data = data.lock().await;
    let order = json!({
        "_id": format!("ord-{}", data.orders.len() + 1),
        "createdAt": "2026-10-01T15:30:00Z",
        "status": "pending",
        "items": body["items"],
        "subtotal": body["subtotal"],
        "shippingCost": body["shippingCost"],
        "tax": body["tax"],
        "total": body["total"],
        "shippingAddress": body["shippingAddress"],
        "payment": body["payment"],
    });
    data.orders.push(order.clone());
    (StatusCode::CREATED, Json(json!({ "order": order }))).into_response()
}

async fn orders(State(data): State<Shared>, headers: HeaderMap) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    Json(json!({ "orders": data.lock().await.orders })).into_response()
}

async fn order(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    match data.lock().await.orders.iter().find(|o| o["_id"] == id.as_str()) {
        Some(order) => Json(json!({ "order": order })).into_response(),
        None => not_found("Order not found"),
    }
}

async fn cancel_order(
    State(data): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&data, &headers).await {
        return unauthorized();
    }
    let mut data = data.lock().await;
    let Some(order) = data.orders.iter_mut().find(|o| o["_id"] == id.as_str()) else {
        return not_found("Order not found");
    };
    if order["status"] != "pending" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Order can no longer be cancelled" })),
        )
            .into_response();
    }
    order["status"] = json!("cancelled");
    Json(json!({ "order": order })).into_response()
}

// =============================================================================
// Content
// =============================================================================

async fn faqs() -> Json<Value> {
    Json(json!({
        "faqs": [
            {
                "_id": "faq-1",
                "question": "How long does shipping take?",
                "answer": "Three to five business days.",
                "category": "Shipping"
            },
            {
                "_id": "faq-2",
                "question": "Are your herbs organic?",
                "answer": "Every herb comes from certified organic farms.",
                "category": "Products"
            },
            {
                "_id": "faq-3",
                "question": "Do you ship abroad?",
                "answer": "Not yet.",
                "category": "Shipping"
            }
        ]
    }))
}

async fn contact(State(data): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    data.lock().await.contact_messages.push(body);
    Json(json!({ "message": "Thanks, we'll be in touch." }))
}
