//! Integration tests for sign-in, sign-out and access control.

#![allow(clippy::unwrap_used)]

use herbal_integration_tests::{CUSTOMER_EMAIL, CUSTOMER_PASSWORD, TestContext, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_protected_page_redirects_with_next() {
    let ctx = TestContext::start().await;

    let resp = ctx.get("/orders").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/auth/login?next=%2Forders");

    let resp = ctx.get("/orders/ord-7?from=email").await;
    assert_eq!(location(&resp), "/auth/login?next=%2Forders%2Ford-7%3Ffrom%3Demail");

    let resp = ctx.get("/checkout/shipping").await;
    assert_eq!(location(&resp), "/auth/login?next=%2Fcheckout%2Fshipping");
}

#[tokio::test]
async fn test_login_returns_to_next() {
    let ctx = TestContext::start().await;

    let body = ctx.page("/auth/login?next=%2Forders").await;
    assert!(body.contains(r#"name="next""#));

    let resp = ctx
        .post_form(
            "/auth/login",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", CUSTOMER_PASSWORD),
                ("next", "/orders"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/orders");

    let body = ctx.page("/orders").await;
    assert!(body.contains("Welcome back, Sage!"));
}

#[tokio::test]
async fn test_login_ignores_offsite_next() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .post_form(
            "/auth/login",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", CUSTOMER_PASSWORD),
                ("next", "//evil.test/phish"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/account");
}

#[tokio::test]
async fn test_wrong_password_rerenders_form() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .post_form(
            "/auth/login",
            &[("email", CUSTOMER_EMAIL), ("password", "nettle")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body = resp.text().await.unwrap();
    assert!(body.contains("Invalid email or password"));
    assert!(body.contains(CUSTOMER_EMAIL), "email is kept in the form");
}

#[tokio::test]
async fn test_account_page_and_logout() {
    let ctx = TestContext::start().await;
    ctx.sign_in().await;

    let body = ctx.page("/account").await;
    assert!(body.contains("Sage Meadows"));
    assert!(body.contains(CUSTOMER_EMAIL));

    // Signed-in visitors skip the login page
    let resp = ctx.get("/auth/login").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/account");

    let resp = ctx.post_form("/auth/logout", &[]).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let resp = ctx.get("/account").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/auth/login"));
}

#[tokio::test]
async fn test_refused_token_signs_out() {
    let ctx = TestContext::start().await;
    ctx.sign_in().await;
    assert!(ctx.page("/").await.contains("Sign out"));

    ctx.backend.revoke_token().await;

    let resp = ctx.get("/orders").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/auth/login?next=%2Forders");

    // The login form is shown instead of bouncing to the account page
    let resp = ctx.get("/auth/login").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Your session has expired"));

    let body = ctx.page("/").await;
    assert!(!body.contains("Sign out"));
    assert!(body.contains(r#"href="/auth/login""#));

    // Signing in again works
    let resp = ctx
        .post_form(
            "/auth/login",
            &[
                ("email", CUSTOMER_EMAIL),
                ("password", CUSTOMER_PASSWORD),
                ("next", "/orders"),
            ],
        )
        .await;
    assert_eq!(location(&resp), "/orders");
    assert_eq!(ctx.get("/orders").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refused_token_on_account_and_checkout() {
    let ctx = TestContext::start().await;
    ctx.sign_in().await;
    ctx.backend.revoke_token().await;

    let resp = ctx.get("/checkout/shipping").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/auth/login?next=%2Fcheckout%2Fshipping");

    // Already signed out, so this is the plain guest redirect
    let resp = ctx.get("/account").await;
    assert_eq!(location(&resp), "/auth/login?next=%2Faccount");
    assert_eq!(ctx.get("/auth/login").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_account_page_detects_refused_token() {
    let ctx = TestContext::start().await;
    ctx.sign_in().await;
    ctx.backend.revoke_token().await;

    let resp = ctx.get("/account").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/auth/login?next=%2Faccount");
    assert!(!ctx.page("/").await.contains("Sign out"));
}

#[tokio::test]
async fn test_register_existing_email_is_rejected() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .post_form(
            "/auth/register",
            &[
                ("name", "Sage Again"),
                ("email", CUSTOMER_EMAIL),
                ("password", "lemon-verbena-9"),
                ("password_confirm", "lemon-verbena-9"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.text().await.unwrap().contains("User already exists"));
}

#[tokio::test]
async fn test_register_signs_in() {
    let ctx = TestContext::start().await;

    let resp = ctx
        .post_form(
            "/auth/register",
            &[
                ("name", "Basil Brook"),
                ("email", "basil@herbs.test"),
                ("password", "lemon-verbena-9"),
                ("password_confirm", "lemon-verbena-9"),
            ],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = ctx.page("/").await;
    assert!(body.contains("<span>Basil</span>"));
    assert!(body.contains("Sign out"));
}

#[tokio::test]
async fn test_oauth_start_and_unknown_provider() {
    let ctx = TestContext::start().await;

    let resp = ctx.get("/auth/oauth/google").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let target = location(&resp);
    assert!(target.starts_with(&format!("{}/auth/google?redirect=", ctx.backend.url())));
    assert!(target.contains("%2Fauth%2Foauth%2Fcallback"));

    let resp = ctx.get("/auth/oauth/myspace").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oauth_callback_without_pending_sign_in() {
    let ctx = TestContext::start().await;

    let resp = ctx.get("/auth/oauth/callback?token=token-sage").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(location(&resp).starts_with("/auth/login"));

    // Nothing was established
    let resp = ctx.get("/account").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_oauth_round_trip() {
    let ctx = TestContext::start().await;

    ctx.get("/auth/oauth/github?next=%2Forders").await;
    let resp = ctx.get("/auth/oauth/callback?token=token-sage").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = ctx.page("/account").await;
    assert!(body.contains("Sage Meadows"));
}
