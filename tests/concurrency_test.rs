//! Invariants that must hold when requests race on the same rows.
//!
//! Runs against SQLite by default. Set `LATS_TEST_POSTGRES_URL` to run the
//! same requests against Postgres, where the row locks do the serializing.

mod common;

use std::time::Duration;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

const DEADLINE: Duration = Duration::from_secs(30);

async fn shared_app() -> TestApp {
    match std::env::var("LATS_TEST_POSTGRES_URL") {
        Ok(url) if !url.trim().is_empty() => {
            TestApp::with_config(|cfg| {
                cfg.database_url = url;
                cfg.db_max_connections = 8;
            })
            .await
        }
        _ => TestApp::new().await,
    }
}

/// Suffix that keeps phones and SKUs unique on a reused database.
fn unique() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

fn unique_phone() -> String {
    let digits: String = Uuid::new_v4()
        .as_u128()
        .to_string()
        .chars()
        .take(8)
        .collect();
    format!("07{}", digits)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_redemptions_spend_the_balance_once() {
    let app = shared_app().await;
    let customer = app.create_customer("Zawadi Mushi", &unique_phone()).await;
    let id = customer["id"].as_str().unwrap();

    app.expect_data(
        Method::POST,
        &format!("/api/v1/customers/{}/points", id),
        Some(json!({ "points": 500, "reason": "Welcome bonus" })),
        StatusCode::OK,
    )
    .await;

    let redeem_uri = format!("/api/v1/customers/{}/redeem", id);
    let body = json!({ "reward_points": 500 });
    let ((a, _), (b, _)) = tokio::time::timeout(DEADLINE, async {
        tokio::join!(
            app.send(Method::POST, &redeem_uri, Some(body.clone())),
            app.send(Method::POST, &redeem_uri, Some(body.clone())),
        )
    })
    .await
    .expect("redemptions did not finish");

    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let fetched = app
        .expect_data(Method::GET, &format!("/api/v1/customers/{}", id), None, StatusCode::OK)
        .await;
    assert_eq!(fetched["points"], 0);

    let history = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/customers/{}/points", id),
            None,
            StatusCode::OK,
        )
        .await;
    let redeemed = history
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["transaction_type"] == "redeemed")
        .count();
    assert_eq!(redeemed, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposite_transfers_finish_and_conserve_money() {
    let app = shared_app().await;
    let mut accounts = Vec::new();
    for name in ["Till", "Bank"] {
        let account = app
            .expect_data(
                Method::POST,
                "/api/v1/finance/accounts",
                Some(json!({
                    "name": format!("{} {}", name, unique()),
                    "account_type": "cash",
                    "opening_balance": "100000"
                })),
                StatusCode::CREATED,
            )
            .await;
        accounts.push(account);
    }
    let (till, bank) = (&accounts[0], &accounts[1]);

    let transfer = |from: &Value, to: &Value| {
        json!({
            "from_account_id": from["id"],
            "to_account_id": to["id"],
            "amount": "1000"
        })
    };

    for _ in 0..5 {
        let ((a, _), (b, _)) = tokio::time::timeout(DEADLINE, async {
            tokio::join!(
                app.send(
                    Method::POST,
                    "/api/v1/finance/transfers",
                    Some(transfer(till, bank))
                ),
                app.send(
                    Method::POST,
                    "/api/v1/finance/transfers",
                    Some(transfer(bank, till))
                ),
            )
        })
        .await
        .expect("opposite transfers deadlocked");
        assert_eq!(a, StatusCode::CREATED);
        assert_eq!(b, StatusCode::CREATED);
    }

    for account in [till, bank] {
        let fetched = app
            .expect_data(
                Method::GET,
                &format!("/api/v1/finance/accounts/{}", account["id"].as_str().unwrap()),
                None,
                StatusCode::OK,
            )
            .await;
        assert_eq!(decimal(&fetched["balance"]), dec!(100000));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_receipts_never_exceed_the_ordered_quantity() {
    let app = shared_app().await;
    let sku = format!("SCR-{}", unique());
    let (product, variant) = app.create_product(&sku, "45000", 0, 1).await;
    let supplier = app
        .expect_data(
            Method::POST,
            "/api/v1/suppliers",
            Some(json!({ "name": format!("Supplier {}", sku) })),
            StatusCode::CREATED,
        )
        .await;
    let order = app
        .expect_data(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "supplier_id": supplier["id"],
                "items": [{ "variant_id": variant["id"], "quantity": 5, "cost_price": "30000" }]
            })),
            StatusCode::CREATED,
        )
        .await;
    let order_uri = format!("/api/v1/purchase-orders/{}", order["id"].as_str().unwrap());
    app.expect_data(
        Method::PUT,
        &format!("{}/status", order_uri),
        Some(json!({ "status": "sent" })),
        StatusCode::OK,
    )
    .await;

    let receive_uri = format!("{}/receive", order_uri);
    let body = json!({ "items": [{ "item_id": order["items"][0]["id"], "quantity": 3 }] });
    let ((a, _), (b, _)) = tokio::time::timeout(DEADLINE, async {
        tokio::join!(
            app.send(Method::POST, &receive_uri, Some(body.clone())),
            app.send(Method::POST, &receive_uri, Some(body.clone())),
        )
    })
    .await
    .expect("receipts did not finish");

    let mut statuses = [a, b];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::BAD_REQUEST]);

    let fetched = app
        .expect_data(Method::GET, &order_uri, None, StatusCode::OK)
        .await;
    assert_eq!(fetched["items"][0]["received_quantity"], 3);
    assert_eq!(fetched["status"], "partially_received");

    let product = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/products/{}", product["id"].as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(product["variants"][0]["quantity"], 3);
}
