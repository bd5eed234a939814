//! Customer payments, mobile money against a stubbed gateway, and anomaly alerts.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, split, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use wiremock::{
    matchers::{header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const GATEWAY_KEY: &str = "zp-test-key";
const WEBHOOK_KEY: &str = "zp-webhook-secret";
const WEBHOOK_URI: &str = "/api/v1/payments/mobile-money/webhook";

async fn gateway_app(server: &MockServer) -> TestApp {
    let base_url = server.uri();
    TestApp::with_config(move |cfg| {
        cfg.zenopay_base_url = Some(base_url);
        cfg.zenopay_api_key = Some(GATEWAY_KEY.to_string());
        cfg.zenopay_webhook_key = Some(WEBHOOK_KEY.to_string());
    })
    .await
}

async fn mount_create_order(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/payments/mobile_money_tanzania"))
        .and(header("x-api-key", GATEWAY_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "resultcode": "000",
            "message": "Request in progress. You will receive a callback shortly"
        })))
        .mount(server)
        .await;
}

async fn create_order(app: &TestApp, customer_id: &Value) -> Value {
    app.expect_data(
        Method::POST,
        "/api/v1/payments/mobile-money",
        Some(json!({
            "amount": "15000",
            "buyer_name": "Mariam Kassim",
            "buyer_phone": "0744123456",
            "customer_id": customer_id
        })),
        StatusCode::CREATED,
    )
    .await
}

async fn webhook(app: &TestApp, key: Option<&str>, body: Value) -> (StatusCode, Value) {
    let headers: Vec<(&str, &str)> = key.map(|k| vec![("x-api-key", k)]).unwrap_or_default();
    let response = app
        .request_with_headers(Method::POST, WEBHOOK_URI, Some(body), None, &headers)
        .await;
    split(response).await
}

#[tokio::test]
async fn payments_are_recorded_and_move_through_approval() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Issa Nyoni", "0745000100").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/payments",
            Some(json!({ "customer_id": customer["id"], "amount": "0", "method": "cash" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let paid = app
        .expect_data(
            Method::POST,
            "/api/v1/payments",
            Some(json!({ "customer_id": customer["id"], "amount": "25000", "method": "cash" })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(paid["status"], "completed");
    assert_eq!(paid["payment_type"], "payment");

    let refund = app
        .expect_data(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "customer_id": customer["id"],
                "amount": "5000",
                "method": "mobile_money",
                "payment_type": "refund",
                "status": "pending"
            })),
            StatusCode::CREATED,
        )
        .await;
    let refund_status = format!("/api/v1/payments/{}/status", refund["id"].as_str().unwrap());

    // Refunds must be approved before they complete
    let (status, _) = app
        .send(Method::PUT, &refund_status, Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    app.expect_data(
        Method::PUT,
        &refund_status,
        Some(json!({ "status": "approved" })),
        StatusCode::OK,
    )
    .await;
    let done = app
        .expect_data(
            Method::PUT,
            &refund_status,
            Some(json!({ "status": "completed" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(done["status"], "completed");

    let listed = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/customers/{}/payments", customer["id"].as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(listed.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn mobile_money_requires_a_configured_gateway() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/payments/mobile-money",
            Some(json!({ "amount": "1000", "buyer_name": "Anna", "buyer_phone": "0744000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service Unavailable");
}

#[tokio::test]
async fn gateway_order_settles_through_the_webhook() {
    let server = MockServer::start().await;
    mount_create_order(&server).await;
    let app = gateway_app(&server).await;
    let customer = app.create_customer("Mariam Kassim", "0744123456").await;

    let order = create_order(&app, &customer["id"]).await;
    assert_eq!(order["payment_status"], "PENDING");
    assert_eq!(order["buyer_phone"], "255744123456");
    assert_eq!(order["buyer_email"], "255744123456@mobile.money");
    let order_id = order["order_id"].as_str().unwrap().to_string();

    let completed = json!({
        "order_id": order_id,
        "payment_status": "COMPLETED",
        "reference": "0936183435"
    });

    let (status, _) = webhook(&app, None, completed.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = webhook(&app, Some("wrong-key"), completed.clone()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, update) = webhook(&app, Some(WEBHOOK_KEY), completed).await;
    assert_eq!(status, StatusCode::OK, "{}", update);
    assert_eq!(update["changed"], true);
    assert_eq!(update["order"]["payment_status"], "COMPLETED");
    assert_eq!(update["order"]["reference"], "0936183435");
    assert!(update["payment_id"].is_string());

    // Settled orders ignore late or contradictory callbacks
    let (status, update) = webhook(
        &app,
        Some(WEBHOOK_KEY),
        json!({ "order_id": order_id, "payment_status": "FAILED" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["changed"], false);
    assert_eq!(update["order"]["payment_status"], "COMPLETED");

    let payments = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/customers/{}/payments", customer["id"].as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    let payments = payments.as_array().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["method"], "mobile_money");
    assert_eq!(payments[0]["reference"], "0936183435");
    assert_eq!(decimal(&payments[0]["amount"]), dec!(15000));
}

#[tokio::test]
async fn webhook_rejects_unknown_orders_and_statuses() {
    let server = MockServer::start().await;
    let app = gateway_app(&server).await;

    let (status, _) = webhook(
        &app,
        Some(WEBHOOK_KEY),
        json!({ "order_id": "missing", "payment_status": "COMPLETED" }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = webhook(
        &app,
        Some(WEBHOOK_KEY),
        json!({ "order_id": "missing", "payment_status": "WAITING" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn polling_applies_the_gateway_status() {
    let server = MockServer::start().await;
    mount_create_order(&server).await;
    let app = gateway_app(&server).await;
    let customer = app.create_customer("Yusuf Mbwana", "0744987654").await;
    let order = create_order(&app, &customer["id"]).await;
    let order_id = order["order_id"].as_str().unwrap().to_string();

    Mock::given(method("GET"))
        .and(path("/api/payments/order-status"))
        .and(query_param("order_id", order_id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": "SUCCESS",
            "data": [{ "order_id": order_id, "payment_status": "FAILED" }]
        })))
        .mount(&server)
        .await;

    let update = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/payments/mobile-money/{}/status", order_id),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(update["changed"], true);
    assert_eq!(update["order"]["payment_status"], "FAILED");
    assert!(update["payment_id"].is_null());

    let failed = app
        .expect_data(
            Method::GET,
            "/api/v1/payments/mobile-money?status=FAILED",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(failed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn gateway_calls_feed_the_performance_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/payments/mobile_money_tanzania"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "message": "Invalid buyer phone"
        })))
        .mount(&server)
        .await;
    let app = gateway_app(&server).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/payments/mobile-money",
            Some(json!({ "amount": "1000", "buyer_name": "Anna", "buyer_phone": "0744000000" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["message"].as_str().unwrap().contains("Invalid buyer phone"));

    app.expect_data(
        Method::POST,
        "/api/v1/payments/performance",
        Some(json!({
            "provider": "zenopay",
            "operation": "create_order",
            "success": true,
            "latency_ms": 120
        })),
        StatusCode::CREATED,
    )
    .await;

    let summary = app
        .expect_data(
            Method::GET,
            "/api/v1/payments/performance?provider=zenopay",
            None,
            StatusCode::OK,
        )
        .await;
    let summary = summary.as_array().unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0]["operation"], "create_order");
    assert_eq!(summary[0]["total_calls"], 2);
    assert_eq!(summary[0]["successful_calls"], 1);
    assert_eq!(summary[0]["success_rate"], 50.0);

    let (status, _) = app
        .send(Method::GET, "/api/v1/payments/performance?hours=0", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for hours in ["8761", "10000000000000000"] {
        let (status, body) = app
            .send(
                Method::GET,
                &format!("/api/v1/payments/performance?hours={}", hours),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "hours={}", hours);
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("Hours must be between 1 and 8760"));
    }
}

#[tokio::test]
async fn security_scan_raises_each_alert_once() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Omari Lema", "0745000200").await;

    for _ in 0..3 {
        app.expect_data(
            Method::POST,
            "/api/v1/payments",
            Some(json!({
                "customer_id": customer["id"],
                "amount": "20000",
                "method": "card",
                "status": "failed"
            })),
            StatusCode::CREATED,
        )
        .await;
    }
    app.expect_data(
        Method::POST,
        "/api/v1/payments",
        Some(json!({ "customer_id": customer["id"], "amount": "50", "method": "cash" })),
        StatusCode::CREATED,
    )
    .await;

    let raised = app
        .expect_data(Method::POST, "/api/v1/payments/security/scan", None, StatusCode::OK)
        .await;
    let mut types: Vec<&str> = raised
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["alert_type"].as_str().unwrap())
        .collect();
    types.sort_unstable();
    assert_eq!(types, vec!["multiple_failures", "unusual_amount"]);

    let again = app
        .expect_data(Method::POST, "/api/v1/payments/security/scan", None, StatusCode::OK)
        .await;
    assert!(again.as_array().unwrap().is_empty());

    let alert_id = raised[0]["id"].as_str().unwrap();
    let resolved = app
        .expect_data(
            Method::PUT,
            &format!("/api/v1/payments/security/alerts/{}", alert_id),
            Some(json!({ "status": "resolved" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(resolved["status"], "resolved");
    assert!(resolved["resolved_at"].is_string());

    let open = app
        .expect_data(
            Method::GET,
            "/api/v1/payments/security/alerts?status=open",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(open.as_array().unwrap().len(), 1);
}
