//! Wire types for the REST backend.
//!
//! The backend speaks camelCase JSON and identifies records with `_id`.
//! Prices travel as JSON numbers and are held as `Decimal` here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use herbal_core::{FaqId, OrderId, OrderStatus, Price, ProductId, Rating, UserId};

// =============================================================================
// Users & Auth
// =============================================================================

/// A customer profile as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "isVerified", alias = "emailVerified")]
    pub is_verified: bool,
}

/// Successful login, registration, or token exchange.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    /// Opaque bearer token.
    pub token: String,
    /// The signed-in customer.
    pub user: User,
}

/// Credentials for `POST /auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Payload for `POST /auth/register`.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Editable profile fields for `PUT /auth/profile`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Generic `{ "message": ... }` acknowledgement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default, alias = "numReviews", alias = "reviews")]
    pub review_count: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    #[serde(default)]
    pub is_best_seller: bool,
    #[serde(default, alias = "countInStock")]
    pub stock: Option<u32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Current selling price.
    #[must_use]
    pub const fn price(&self) -> Price {
        Price::usd(self.price)
    }

    /// Pre-sale price, only when it is higher than the current price.
    #[must_use]
    pub fn original_price(&self) -> Option<Price> {
        self.original_price
            .filter(|original| *original > self.price)
            .map(Price::usd)
    }

    /// Whole-percent discount when the product is on sale.
    #[must_use]
    pub fn discount_percent(&self) -> Option<u32> {
        self.original_price()
            .and_then(|original| self.price().discount_percent_from(&original))
    }

    /// First image, used on cards and in the cart.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// Whether the product can be added to a cart. Unknown stock counts as
    /// available; the backend has the final say.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|stock| stock > 0)
    }
}

// =============================================================================
// Cart & Orders
// =============================================================================

/// A product line in a cart or order, with denormalized display fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(alias = "product")]
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

impl LineItem {
    /// Build a line from a catalog product.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            quantity,
            name: product.name.clone(),
            price: product.price,
            image: product.primary_image().map(String::from),
        }
    }

    /// Unit price.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::usd(self.price)
    }

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price().line_total(self.quantity)
    }
}

/// The server-side cart document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartDocument {
    #[serde(default)]
    pub items: Vec<LineItem>,
}

/// Body for `POST /cart/add` and `PUT /cart/update`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRequest<'a> {
    pub product_id: &'a ProductId,
    pub quantity: u32,
}

/// Where an order ships to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Non-sensitive summary of how an order was paid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub method: String,
    pub card_brand: String,
    pub last4: String,
    pub cardholder_name: String,
}

/// Body for `POST /orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment: PaymentSummary,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// A placed order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: OrderId,
    #[serde(alias = "date")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub items: Vec<LineItem>,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(default, alias = "shippingPrice", with = "rust_decimal::serde::float")]
    pub shipping_cost: Decimal,
    #[serde(default, alias = "taxPrice", with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(default, alias = "totalPrice", with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default)]
    pub payment: Option<PaymentSummary>,
}

impl Order {
    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

// =============================================================================
// Content
// =============================================================================

/// A frequently asked question.
#[derive(Debug, Clone, Deserialize)]
pub struct Faq {
    #[serde(alias = "_id")]
    pub id: FaqId,
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Body for `POST /contact`.
#[derive(Debug, Clone, Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_from_backend_json() {
        let json = r#"{
            "_id": "p1",
            "name": "Calendula Salve",
            "price": 14.5,
            "originalPrice": 20,
            "images": ["/img/salve.jpg"],
            "rating": 4.6,
            "numReviews": 38,
            "isNew": true,
            "isBestSeller": false,
            "countInStock": 0
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();

        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.price().display(), "$14.50");
        assert_eq!(product.original_price().unwrap().display(), "$20.00");
        assert_eq!(product.discount_percent(), Some(28));
        assert_eq!(product.review_count, 38);
        assert_eq!(product.primary_image(), Some("/img/salve.jpg"));
        assert!(product.is_new);
        assert!(!product.in_stock());
    }

    #[test]
    fn test_original_price_ignored_when_not_higher() {
        let json = r#"{"id": "p2", "name": "Nettle Tea", "price": 9.99, "originalPrice": 9.99}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.original_price().is_none());
        assert!(product.discount_percent().is_none());
        assert!(product.in_stock());
    }

    #[test]
    fn test_line_item_accepts_product_alias() {
        let json = r#"{"product": "p1", "quantity": 3, "name": "Salve", "price": 2.5}"#;
        let item: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.product_id.as_str(), "p1");
        assert_eq!(item.line_total().display(), "$7.50");
    }

    #[test]
    fn test_order_from_backend_json() {
        let json = r#"{
            "_id": "o1",
            "createdAt": "2026-03-01T10:00:00Z",
            "status": "Shipped",
            "items": [{"productId": "p1", "quantity": 2, "name": "Salve", "price": 10}],
            "totalPrice": 25.99,
            "shippingPrice": 5.99
        }"#;
        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.item_count(), 2);
        assert_eq!(Price::usd(order.total).display(), "$25.99");
        assert_eq!(Price::usd(order.shipping_cost).display(), "$5.99");
        assert!(order.shipping_address.is_none());
    }

    #[test]
    fn test_profile_update_skips_empty_fields() {
        let update = ProfileUpdate {
            name: "Sage".to_string(),
            bio: Some("Grows lavender".to_string()),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["name"], "Sage");
        assert_eq!(json["bio"], "Grows lavender");
        assert!(json.get("avatar").is_none());
    }
}
