//! Purchase orders from draft through partial and full receipt.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

struct Fixture {
    app: TestApp,
    product: Value,
    order: Value,
}

impl Fixture {
    /// A sent purchase order for five units of a variant that starts with two in stock.
    async fn sent_order() -> Self {
        let app = TestApp::new().await;
        let (product, variant) = app.create_product("LCD-A10", "45000", 2, 1).await;
        let supplier = app
            .expect_data(
                Method::POST,
                "/api/v1/suppliers",
                Some(json!({ "name": "Kariakoo Parts Ltd", "phone": "0222000111" })),
                StatusCode::CREATED,
            )
            .await;

        let order = app
            .expect_data(
                Method::POST,
                "/api/v1/purchase-orders",
                Some(json!({
                    "supplier_id": supplier["id"],
                    "currency": "usd",
                    "items": [{ "variant_id": variant["id"], "quantity": 5, "cost_price": "30000" }]
                })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(order["status"], "draft");
        assert_eq!(order["currency"], "USD");
        assert_eq!(decimal(&order["total_amount"]), dec!(150000));

        let sent = app
            .expect_data(
                Method::PUT,
                &format!("/api/v1/purchase-orders/{}/status", order["id"].as_str().unwrap()),
                Some(json!({ "status": "sent" })),
                StatusCode::OK,
            )
            .await;
        assert_eq!(sent["status"], "sent");

        Self {
            app,
            product,
            order,
        }
    }

    fn order_uri(&self, suffix: &str) -> String {
        format!(
            "/api/v1/purchase-orders/{}{}",
            self.order["id"].as_str().unwrap(),
            suffix
        )
    }

    fn item_id(&self) -> Value {
        self.order["items"][0]["id"].clone()
    }

    async fn stock(&self) -> i64 {
        let product = self
            .app
            .expect_data(
                Method::GET,
                &format!("/api/v1/products/{}", self.product["id"].as_str().unwrap()),
                None,
                StatusCode::OK,
            )
            .await;
        product["variants"][0]["quantity"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn receiving_in_two_steps_completes_the_order() {
    let fx = Fixture::sent_order().await;

    let result = fx
        .app
        .expect_data(
            Method::POST,
            &fx.order_uri("/receive"),
            Some(json!({
                "items": [{
                    "item_id": fx.item_id(),
                    "quantity": 2,
                    "serial_numbers": [
                        { "serial_number": "SN-0001", "imei": "356789000000001" },
                        { "serial_number": "SN-0002" }
                    ]
                }]
            })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(result["status"], "partially_received");
    assert_eq!(result["units_received"], 2);
    assert_eq!(result["serials_created"], 2);
    assert_eq!(result["items"][0]["received_quantity"], 2);
    assert_eq!(fx.stock().await, 4);

    // Quantities are deltas on top of what already arrived
    let result = fx
        .app
        .expect_data(
            Method::POST,
            &fx.order_uri("/receive"),
            Some(json!({ "items": [{ "item_id": fx.item_id(), "quantity": 3 }] })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(result["status"], "received");
    assert_eq!(result["items"][0]["received_quantity"], 5);
    assert_eq!(fx.stock().await, 7);

    let serials = fx
        .app
        .expect_data(
            Method::GET,
            &format!("/api/v1/products/{}/serials", fx.product["id"].as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(serials.as_array().unwrap().len(), 2);
    assert_eq!(serials[0]["status"], "available");

    let audit = fx
        .app
        .expect_data(Method::GET, &fx.order_uri("/audit"), None, StatusCode::OK)
        .await;
    let actions: Vec<&str> = audit
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["created", "status_changed", "received", "received"]);

    // A fully received order accepts no more goods
    let (status, _) = fx
        .app
        .send(
            Method::POST,
            &fx.order_uri("/receive"),
            Some(json!({ "items": [{ "item_id": fx.item_id(), "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn over_receiving_is_rejected_with_every_problem_listed() {
    let fx = Fixture::sent_order().await;
    let stranger = "00000000-0000-0000-0000-0000000000aa";

    let (status, body) = fx
        .app
        .send(
            Method::POST,
            &fx.order_uri("/receive"),
            Some(json!({
                "items": [
                    { "item_id": stranger, "quantity": 1 },
                    { "item_id": fx.item_id(), "quantity": 6 }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.contains(&format!("Item {} not found in purchase order", stranger)));
    assert!(message.contains("Received quantity (6) cannot exceed ordered quantity (5)"));

    assert_eq!(fx.stock().await, 2);
}

#[tokio::test]
async fn duplicate_serials_roll_back_the_receipt() {
    let fx = Fixture::sent_order().await;

    let (status, _) = fx
        .app
        .send(
            Method::POST,
            &fx.order_uri("/receive"),
            Some(json!({
                "items": [{
                    "item_id": fx.item_id(),
                    "quantity": 2,
                    "serial_numbers": [{ "serial_number": "SN-9" }, { "serial_number": "SN-9" }]
                }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(fx.stock().await, 2);

    let order = fx
        .app
        .expect_data(Method::GET, &fx.order_uri(""), None, StatusCode::OK)
        .await;
    assert_eq!(order["status"], "sent");
    assert_eq!(order["items"][0]["received_quantity"], 0);
}

#[tokio::test]
async fn manual_status_changes_follow_the_allowed_moves() {
    let fx = Fixture::sent_order().await;

    let (status, _) = fx
        .app
        .send(
            Method::PUT,
            &fx.order_uri("/status"),
            Some(json!({ "status": "received" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    fx.app
        .expect_data(
            Method::PUT,
            &fx.order_uri("/status"),
            Some(json!({ "status": "cancelled" })),
            StatusCode::OK,
        )
        .await;

    let (status, _) = fx
        .app
        .send(
            Method::PUT,
            &fx.order_uri("/status"),
            Some(json!({ "status": "sent" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = fx
        .app
        .send(
            Method::POST,
            &fx.order_uri("/receive"),
            Some(json!({ "items": [{ "item_id": fx.item_id(), "quantity": 1 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn supplier_payments_reduce_the_outstanding_balance() {
    let fx = Fixture::sent_order().await;

    fx.app
        .expect_data(
            Method::POST,
            &fx.order_uri("/payments"),
            Some(json!({ "payment_method": "bank_transfer", "amount": "100000" })),
            StatusCode::CREATED,
        )
        .await;
    fx.app
        .expect_data(
            Method::POST,
            &fx.order_uri("/payments"),
            Some(json!({ "payment_method": "cash", "amount": "20000", "status": "pending" })),
            StatusCode::CREATED,
        )
        .await;

    let (status, _) = fx
        .app
        .send(
            Method::POST,
            &fx.order_uri("/payments"),
            Some(json!({ "payment_method": "cash", "amount": "0" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let summary = fx
        .app
        .expect_data(
            Method::GET,
            &fx.order_uri("/payments/summary"),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(summary["currency"], "USD");
    assert_eq!(decimal(&summary["total_paid"]), dec!(100000));
    assert_eq!(decimal(&summary["outstanding"]), dec!(50000));
    assert_eq!(summary["payments_count"], 2);
}

#[tokio::test]
async fn order_messages_include_system_notes() {
    let fx = Fixture::sent_order().await;

    fx.app
        .expect_data(
            Method::POST,
            &fx.order_uri("/messages"),
            Some(json!({ "content": "Please ship by Friday" })),
            StatusCode::CREATED,
        )
        .await;

    let messages = fx
        .app
        .expect_data(Method::GET, &fx.order_uri("/messages"), None, StatusCode::OK)
        .await;
    let contents: Vec<&str> = messages
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert!(contents.contains(&"Status changed to sent"));
    assert!(contents.contains(&"Please ship by Friday"));
}

#[tokio::test]
async fn quality_checks_only_accept_items_of_the_order() {
    let fx = Fixture::sent_order().await;
    let (_, other_variant) = fx.app.create_product("BAT-A10", "25000", 0, 1).await;
    let other = fx
        .app
        .expect_data(
            Method::POST,
            "/api/v1/purchase-orders",
            Some(json!({
                "supplier_id": fx.order["supplier_id"],
                "items": [{ "variant_id": other_variant["id"], "quantity": 3, "cost_price": "12000" }]
            })),
            StatusCode::CREATED,
        )
        .await;
    let foreign_item = other["items"][0]["id"].as_str().unwrap();

    let (status, body) = fx
        .app
        .send(
            Method::POST,
            &fx.order_uri("/quality-checks"),
            Some(json!({ "item_id": foreign_item, "passed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains(&format!("Item {} not found in purchase order", foreign_item)));

    let check = fx
        .app
        .expect_data(
            Method::POST,
            &fx.order_uri("/quality-checks"),
            Some(json!({ "item_id": fx.item_id(), "passed": false, "notes": "Dead pixels" })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(check["passed"], false);

    let checks = fx
        .app
        .expect_data(Method::GET, &fx.order_uri("/quality-checks"), None, StatusCode::OK)
        .await;
    assert_eq!(checks.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn out_of_range_quantities_and_costs_are_rejected() {
    let fx = Fixture::sent_order().await;

    let (status, _) = fx
        .app
        .send(
            Method::POST,
            &fx.order_uri("/receive"),
            Some(json!({ "items": [{ "item_id": fx.item_id(), "quantity": i32::MAX }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(fx.stock().await, 2);

    let variant_id = fx.order["items"][0]["variant_id"].clone();
    for item in [
        json!({ "variant_id": variant_id, "quantity": 100_001, "cost_price": "1000" }),
        json!({ "variant_id": variant_id, "quantity": 1, "cost_price": "1000000000001" }),
        json!({ "variant_id": variant_id, "quantity": 1, "cost_price": "-1" }),
    ] {
        let (status, _) = fx
            .app
            .send(
                Method::POST,
                "/api/v1/purchase-orders",
                Some(json!({ "supplier_id": fx.order["supplier_id"], "items": [item] })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", item);
    }
}
