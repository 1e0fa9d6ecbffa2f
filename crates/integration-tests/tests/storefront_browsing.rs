//! Integration tests for anonymous browsing: health checks, catalog,
//! content pages and the contact form.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use herbal_integration_tests::TestContext;
use reqwest::StatusCode;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let ctx = TestContext::start().await;

    let resp = ctx.get("/health").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    let resp = ctx.get("/health/ready").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ready");
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_home_shows_featured_products() {
    let ctx = TestContext::start().await;
    let body = ctx.page("/").await;

    assert!(body.contains("Lavender Calm Tea"), "best seller listed");
    assert!(body.contains("Calendula Salve"), "new arrival listed");
}

#[tokio::test]
async fn test_listing_filters_by_category() {
    let ctx = TestContext::start().await;
    let body = ctx.page("/products?category=teas").await;

    assert!(body.contains("Lavender Calm Tea"));
    assert!(!body.contains("Calendula Salve"));
    assert!(!body.contains("Elderberry Syrup"));
}

#[tokio::test]
async fn test_listing_search() {
    let ctx = TestContext::start().await;
    let body = ctx.page("/products?q=balm").await;

    // Matches the salve's description and the tea's "lemon balm"
    assert!(body.contains("Calendula Salve"));
    assert!(body.contains("Lavender Calm Tea"));
    assert!(!body.contains("Elderberry Syrup"));
}

#[tokio::test]
async fn test_product_detail() {
    let ctx = TestContext::start().await;
    let body = ctx.page("/products/calendula-salve").await;

    assert!(body.contains("Calendula Salve"));
    assert!(body.contains("$18.00"));
    assert!(body.contains("Only 3 left"));
}

#[tokio::test]
async fn test_unknown_product_is_not_found() {
    let ctx = TestContext::start().await;
    let resp = ctx.get("/products/mandrake-root").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Content
// =============================================================================

#[tokio::test]
async fn test_markdown_page() {
    let ctx = TestContext::start().await;
    let body = ctx.page("/pages/shipping").await;

    assert!(body.contains("Shipping Policy"));
    assert!(body.contains("<table>"));

    let resp = ctx.get("/pages/does-not-exist").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_faq_grouped_by_category() {
    let ctx = TestContext::start().await;
    let body = ctx.page("/faq").await;

    let shipping = body.find("<h2>Shipping</h2>").unwrap();
    let products = body.find("<h2>Products</h2>").unwrap();
    assert!(shipping < products, "groups keep first-seen order");
    assert!(body.contains("Do you ship abroad?"));
}

#[tokio::test]
async fn test_static_assets_served() {
    let ctx = TestContext::start().await;
    let resp = ctx.get("/static/css/main.css").await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_present() {
    let ctx = TestContext::start().await;
    let resp = ctx.get("/").await;
    let headers = resp.headers();

    assert!(headers.contains_key("content-security-policy"));
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-request-id"));
}

// =============================================================================
// Contact
// =============================================================================

#[tokio::test]
async fn test_contact_form_validation_and_submit() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .post_form(
            "/contact",
            &[
                ("name", "Rowan"),
                ("email", "not-an-email"),
                ("subject", "Hello"),
                ("message", "short"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(ctx.backend.contact_messages().await.is_empty());

    let resp = ctx
        .post_form(
            "/contact",
            &[
                ("name", "Rowan"),
                ("email", "rowan@herbs.test"),
                ("subject", "Wholesale"),
                ("message", "Do you sell dried nettle in bulk?"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let messages = ctx.backend.contact_messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["subject"], "Wholesale");
}
