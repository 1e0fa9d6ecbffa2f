//! Integration tests for the two-step checkout, confirmation and order
//! history.

#![allow(clippy::unwrap_used)]

use herbal_integration_tests::{TestContext, location};
use reqwest::StatusCode;

const SHIPPING: &[(&str, &str)] = &[
    ("full_name", "Sage Meadows"),
    ("email", "sage@herbs.test"),
    ("phone", "555-123-4567"),
    ("address", "12 Garden Lane"),
    ("city", "Asheville"),
    ("state", "NC"),
    ("postal_code", "28801"),
    ("country", "US"),
];

const CARD: &[(&str, &str)] = &[
    ("cardholder_name", "Sage Meadows"),
    ("card_number", "4242 4242 4242 4242"),
    ("expiry", "12/39"),
    ("cvv", "123"),
];

async fn signed_in_with_cart() -> TestContext {
    let ctx = TestContext::start().await;
    ctx.sign_in().await;
    ctx.post_form(
        "/cart/add",
        &[("product_id", "lavender-tea"), ("quantity", "2")],
    )
    .await;
    ctx
}

async fn place_order(ctx: &TestContext) -> String {
    let resp = ctx.post_form("/checkout/shipping", SHIPPING).await;
    assert_eq!(location(&resp), "/checkout/payment");

    let resp = ctx.post_form("/checkout/payment", CARD).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    location(&resp)
}

#[tokio::test]
async fn test_empty_cart_cannot_check_out() {
    let ctx = TestContext::start().await;
    ctx.sign_in().await;

    let resp = ctx.get("/checkout/shipping").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/cart");
}

#[tokio::test]
async fn test_checkout_start_goes_to_shipping() {
    let ctx = signed_in_with_cart().await;

    let resp = ctx.get("/checkout").await;
    assert_eq!(location(&resp), "/checkout/shipping");

    let body = ctx.page("/checkout/shipping").await;
    // Prefilled from the profile
    assert!(body.contains("Sage Meadows"));
    assert!(body.contains("$25.00"));
}

#[tokio::test]
async fn test_payment_requires_shipping_first() {
    let ctx = signed_in_with_cart().await;

    let resp = ctx.get("/checkout/payment").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/checkout/shipping");
}

#[tokio::test]
async fn test_invalid_shipping_shows_errors() {
    let ctx = signed_in_with_cart().await;

    let resp = ctx
        .post_form(
            "/checkout/shipping",
            &[("full_name", "Sage Meadows"), ("email", "nope")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = resp.text().await.unwrap();
    assert!(body.contains("field__error"));
    assert!(body.contains("City is required"));
}

#[tokio::test]
async fn test_invalid_card_is_rejected() {
    let ctx = signed_in_with_cart().await;
    ctx.post_form("/checkout/shipping", SHIPPING).await;

    let resp = ctx
        .post_form(
            "/checkout/payment",
            &[
                ("cardholder_name", "Sage Meadows"),
                ("card_number", "4242 4242 4242 4241"),
                ("expiry", "12/39"),
                ("cvv", "123"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("Card number is not valid"));
    assert_eq!(ctx.backend.order_count().await, 0);
}

#[tokio::test]
async fn test_place_order_end_to_end() {
    let ctx = signed_in_with_cart().await;

    let confirmation = place_order(&ctx).await;
    assert_eq!(confirmation, "/checkout/confirmation/ord-1");

    let body = ctx.page(&confirmation).await;
    assert!(body.contains("Thank you for your order!"));
    assert!(body.contains("ord-1"));
    assert!(body.contains("Visa ending in 4242"));

    // Only the card summary reaches the backend
    let order = ctx.backend.last_order().await.unwrap();
    assert_eq!(order["payment"]["last4"], "4242");
    assert_eq!(order["shippingAddress"]["postalCode"], "28801");
    let raw = order.to_string();
    assert!(!raw.contains("4242424242424242"));
    assert!(!raw.contains("\"cvv\""));

    // Cart emptied after the order
    assert_eq!(ctx.backend.cart_quantity("lavender-tea").await, None);
    let badge = ctx.page("/cart/count").await;
    assert!(badge.contains(">0<"));
}

#[tokio::test]
async fn test_order_history_and_cancel() {
    let ctx = signed_in_with_cart().await;
    place_order(&ctx).await;

    let body = ctx.page("/orders").await;
    assert!(body.contains("ord-1"));
    assert!(body.contains("Pending"));

    let body = ctx.page("/orders/ord-1").await;
    assert!(body.contains("/orders/ord-1/cancel"));

    let resp = ctx.post_form("/orders/ord-1/cancel", &[]).await;
    assert_eq!(location(&resp), "/orders/ord-1");

    let body = ctx.page("/orders/ord-1").await;
    assert!(body.contains("Your order has been cancelled"));
    assert!(body.contains("Cancelled"));
    assert!(!body.contains("/orders/ord-1/cancel"));

    // A second cancel is refused before reaching the backend
    ctx.post_form("/orders/ord-1/cancel", &[]).await;
    let body = ctx.page("/orders/ord-1").await;
    assert!(body.contains("can no longer be cancelled"));
}

#[tokio::test]
async fn test_unknown_order_is_not_found() {
    let ctx = TestContext::start().await;
    ctx.sign_in().await;

    let resp = ctx.get("/orders/ord-404").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
