//! Customer records, the points ledger and tier changes over HTTP.

mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn new_customers_start_at_bronze_and_phone_is_unique() {
    let app = TestApp::new().await;

    let customer = app.create_customer("Amina Juma", "0712345678").await;
    assert_eq!(customer["loyalty_level"], "bronze");
    assert_eq!(customer["points"], 0);
    assert_eq!(customer["is_active"], true);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": "Someone Else", "phone": "0712345678" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);
}

#[tokio::test]
async fn invalid_customer_input_is_rejected() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": "", "phone": "0712345678" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/customers",
            Some(json!({ "name": "Bad Email", "phone": "0712345679", "email": "not-an-email" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn points_adjustments_move_the_tier_both_ways() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Baraka Mushi", "0754000111").await;
    let id = customer["id"].as_str().unwrap();

    let update = app
        .expect_data(
            Method::POST,
            &format!("/api/v1/customers/{}/points", id),
            Some(json!({ "points": 1200, "reason": "Opening balance" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(update["customer"]["points"], 1200);
    assert_eq!(update["customer"]["loyalty_level"], "silver");
    assert_eq!(update["tier_change"]["from"], "bronze");
    assert_eq!(update["tier_change"]["to"], "silver");

    // Balance floors at zero and the tier follows it down
    let update = app
        .expect_data(
            Method::POST,
            &format!("/api/v1/customers/{}/points", id),
            Some(json!({ "points": -5000, "reason": "Correction" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(update["customer"]["points"], 0);
    assert_eq!(update["customer"]["loyalty_level"], "bronze");

    let history = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/customers/{}/points", id),
            None,
            StatusCode::OK,
        )
        .await;
    let entries = history.as_array().unwrap();
    // Two adjustments, each followed by a tier change entry
    assert_eq!(entries.len(), 4);
    assert!(entries
        .iter()
        .any(|e| e["reason"] == "Tier upgraded from bronze to silver"));
    assert!(entries
        .iter()
        .any(|e| e["reason"] == "Tier downgraded from silver to bronze"));
}

#[tokio::test]
async fn redeeming_requires_a_catalog_reward_and_enough_points() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Neema Said", "0765000222").await;
    let id = customer["id"].as_str().unwrap();
    let redeem_uri = format!("/api/v1/customers/{}/redeem", id);

    let (status, _) = app
        .send(Method::POST, &redeem_uri, Some(json!({ "reward_points": 500 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(Method::POST, &redeem_uri, Some(json!({ "reward_points": 123 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.expect_data(
        Method::POST,
        &format!("/api/v1/customers/{}/points", id),
        Some(json!({ "points": 800, "reason": "Promo" })),
        StatusCode::OK,
    )
    .await;

    let update = app
        .expect_data(
            Method::POST,
            &redeem_uri,
            Some(json!({ "reward_points": 500 })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(update["customer"]["points"], 300);
    assert_eq!(update["points_change"], -500);
}

#[tokio::test]
async fn zero_point_adjustments_are_rejected() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Rehema Juma", "0765000333").await;
    let id = customer["id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/customers/{}/points", id),
            Some(json!({ "points": 0, "reason": "Nothing" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Points change cannot be zero"));

    let history = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/customers/{}/points", id),
            None,
            StatusCode::OK,
        )
        .await;
    assert!(history.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn listing_filters_by_search_term() {
    let app = TestApp::new().await;
    app.create_customer("Fatuma Ali", "0711000001").await;
    app.create_customer("Juma Hassan", "0711000002").await;

    let page = app
        .expect_data(
            Method::GET,
            "/api/v1/customers?search=Fatuma&page=1&limit=10",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["name"], "Fatuma Ali");

    let page = app
        .expect_data(Method::GET, "/api/v1/customers", None, StatusCode::OK)
        .await;
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);
}

#[tokio::test]
async fn reward_catalog_and_metrics_are_exposed() {
    let app = TestApp::new().await;
    app.create_customer("Rehema Kweka", "0788000333").await;

    let rewards = app
        .expect_data(Method::GET, "/api/v1/loyalty/rewards", None, StatusCode::OK)
        .await;
    assert_eq!(rewards.as_array().unwrap().len(), 4);
    assert_eq!(rewards[0]["points"], 500);

    let metrics = app
        .expect_data(Method::GET, "/api/v1/loyalty/metrics", None, StatusCode::OK)
        .await;
    assert_eq!(metrics["total_customers"], 1);
    assert_eq!(metrics["total_points"], 0);
}

#[tokio::test]
async fn unknown_customer_is_not_found() {
    let app = TestApp::new().await;
    let (status, body) = app
        .send(
            Method::GET,
            "/api/v1/customers/00000000-0000-0000-0000-000000000000",
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Not Found");
}
