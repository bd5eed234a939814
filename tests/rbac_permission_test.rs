//! Bearer authentication and per-role permission gates.

mod common;

use axum::http::{Method, StatusCode};
use common::{split, TestApp};
use lats_api::auth::roles;
use serde_json::json;

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = TestApp::new().await;

    let (status, body) = split(app.request(Method::GET, "/api/v1/customers", None, None).await).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_MISSING");

    let (status, body) = split(
        app.request(Method::GET, "/api/v1/customers", None, Some("not-a-jwt"))
            .await,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_INVALID_TOKEN");
}

#[tokio::test]
async fn each_role_reaches_only_its_own_areas() {
    let app = TestApp::new().await;
    let cases = [
        (roles::TECHNICIAN, "/api/v1/devices", StatusCode::OK),
        (roles::TECHNICIAN, "/api/v1/sales/recent", StatusCode::FORBIDDEN),
        (roles::TECHNICIAN, "/api/v1/payments/security/alerts", StatusCode::FORBIDDEN),
        (roles::CASHIER, "/api/v1/sales/recent", StatusCode::OK),
        (roles::CASHIER, "/api/v1/finance/summary", StatusCode::FORBIDDEN),
        (roles::CASHIER, "/api/v1/settings", StatusCode::FORBIDDEN),
        (roles::CUSTOMER_CARE, "/api/v1/notifications/sms/logs", StatusCode::OK),
        (roles::CUSTOMER_CARE, "/api/v1/inventory/low-stock", StatusCode::FORBIDDEN),
        (roles::ADMIN, "/api/v1/settings", StatusCode::OK),
        (roles::ADMIN, "/api/v1/finance/summary", StatusCode::OK),
    ];

    for (role, uri, expected) in cases {
        let token = app.token_for(role, &format!("{}-user", role));
        let response = app.request(Method::GET, uri, None, Some(&token)).await;
        assert_eq!(response.status(), expected, "{} GET {}", role, uri);
    }
}

#[tokio::test]
async fn read_permission_does_not_grant_writes() {
    let app = TestApp::new().await;
    let tech = app.token_for(roles::TECHNICIAN, "tech-1");

    let response = app
        .request(Method::GET, "/api/v1/customers", None, Some(&tech))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = split(
        app.request(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": "Not Allowed", "phone": "0715000000" })),
            Some(&tech),
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "AUTH_INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn gateway_webhook_bypasses_bearer_auth() {
    let app = TestApp::with_config(|cfg| {
        cfg.zenopay_webhook_key = Some("hook-secret".to_string());
    })
    .await;

    // Rejected by the api key check, not the bearer middleware
    let (status, body) = split(
        app.request(
            Method::POST,
            "/api/v1/payments/mobile-money/webhook",
            Some(json!({ "order_id": "ORD-1", "payment_status": "COMPLETED" })),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");

    let (status, body) = split(
        app.request_with_headers(
            Method::POST,
            "/api/v1/payments/mobile-money/webhook",
            Some(json!({ "order_id": "ORD-1", "payment_status": "COMPLETED" })),
            None,
            &[("x-api-key", "hook-secret")],
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn status_and_health_are_public() {
    let app = TestApp::new().await;

    let (status, body) = split(app.request(Method::GET, "/api/v1/status", None, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["service"], "lats-api");
    assert_eq!(body["data"]["database"], "up");

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let (status, body) = split(app.request(Method::GET, "/health/ready", None, None).await).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn responses_echo_the_request_id() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::GET,
            "/api/v1/customers/00000000-0000-0000-0000-000000000042",
            None,
            Some(&app.admin_token()),
            &[("x-request-id", "req-rbac-1")],
        )
        .await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-rbac-1"
    );
    let (status, body) = split(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["request_id"], "req-rbac-1");
}
