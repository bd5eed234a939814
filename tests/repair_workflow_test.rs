//! Role-gated repair workflow driven through the HTTP API.

mod common;

use axum::http::{Method, StatusCode};
use common::{split, TestApp};
use lats_api::auth::roles;
use serde_json::{json, Value};

const TECH_ID: &str = "tech-1";

struct Bench {
    app: TestApp,
    device_id: String,
    tech: String,
    care: String,
}

impl Bench {
    async fn new() -> Self {
        let app = TestApp::new().await;
        let customer = app.create_customer("Pendo Mollel", "0714555666").await;
        let device = app
            .expect_data(
                Method::POST,
                "/api/v1/devices",
                Some(json!({
                    "customer_id": customer["id"],
                    "brand": "Samsung",
                    "model": "Galaxy A52",
                    "issue_description": "Cracked screen, touch unresponsive",
                    "assigned_to": TECH_ID,
                    "expected_return_date": "2026-11-01",
                    "repair_price": "85000"
                })),
                StatusCode::CREATED,
            )
            .await;
        assert_eq!(device["status"], "assigned");

        let tech = app.token_for(roles::TECHNICIAN, TECH_ID);
        let care = app.token_for(roles::CUSTOMER_CARE, "care-1");
        Self {
            device_id: device["id"].as_str().unwrap().to_string(),
            app,
            tech,
            care,
        }
    }

    async fn call(&self, token: &str, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.app.request(method, path, body, Some(token)).await;
        split(response).await
    }

    async fn move_to(&self, token: &str, status: &str, notes: Option<&str>) -> (StatusCode, Value) {
        self.call(
            token,
            Method::PUT,
            &format!("/api/v1/devices/{}/status", self.device_id),
            Some(json!({ "status": status, "notes": notes })),
        )
        .await
    }

    async fn expect_move(&self, token: &str, status: &str, notes: Option<&str>) -> Value {
        let (code, body) = self.move_to(token, status, notes).await;
        assert_eq!(code, StatusCode::OK, "move to {} failed: {}", status, body);
        assert_eq!(body["data"]["status"], status);
        body["data"].clone()
    }

    async fn options(&self, token: &str) -> Vec<String> {
        let (code, body) = self
            .call(
                token,
                Method::GET,
                &format!("/api/v1/devices/{}/transitions", self.device_id),
                None,
            )
            .await;
        assert_eq!(code, StatusCode::OK);
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["to"].as_str().unwrap().to_string())
            .collect()
    }
}

#[tokio::test]
async fn full_repair_with_parts_reaches_done() {
    let bench = Bench::new().await;

    assert_eq!(bench.options(&bench.tech).await, vec!["diagnosis-started"]);
    bench.expect_move(&bench.tech, "diagnosis-started", None).await;

    let spare = bench
        .app
        .expect_data(
            Method::POST,
            "/api/v1/spare-parts",
            Some(json!({
                "name": "A52 OLED Screen",
                "part_number": "SM-A525-LCD",
                "quantity": 3,
                "min_quantity": 1,
                "cost_price": "55000",
                "selling_price": "70000"
            })),
            StatusCode::CREATED,
        )
        .await;
    let (code, part) = bench
        .call(
            &bench.tech,
            Method::POST,
            &format!("/api/v1/devices/{}/parts", bench.device_id),
            Some(json!({ "spare_part_id": spare["id"], "quantity": 1 })),
        )
        .await;
    assert_eq!(code, StatusCode::CREATED);
    assert_eq!(part["data"]["status"], "needed");
    let part_id = part["data"]["id"].as_str().unwrap().to_string();

    // Pending parts put the receive action first
    let options = bench.options(&bench.tech).await;
    assert_eq!(options[0], "parts-arrived");
    assert!(options.contains(&"awaiting-parts".to_string()));

    let (code, body) = bench.move_to(&bench.tech, "awaiting-parts", None).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("Notes are required"));
    bench
        .expect_move(&bench.tech, "awaiting-parts", Some("Ordered screen from supplier"))
        .await;

    let (code, _) = bench.move_to(&bench.tech, "in-repair", None).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    bench.expect_move(&bench.tech, "parts-arrived", None).await;
    let (_, parts) = bench
        .call(
            &bench.tech,
            Method::GET,
            &format!("/api/v1/devices/{}/parts", bench.device_id),
            None,
        )
        .await;
    assert_eq!(parts["data"][0]["status"], "received");

    bench.expect_move(&bench.tech, "in-repair", None).await;

    let (code, used) = bench
        .call(
            &bench.tech,
            Method::POST,
            &format!("/api/v1/repair-parts/{}/use", part_id),
            None,
        )
        .await;
    assert_eq!(code, StatusCode::OK);
    assert_eq!(used["data"]["status"], "used");
    assert_eq!(used["data"]["quantity_used"], 1);
    let spares = bench
        .app
        .expect_data(Method::GET, "/api/v1/spare-parts", None, StatusCode::OK)
        .await;
    assert_eq!(spares[0]["quantity"], 2);

    bench
        .expect_move(&bench.tech, "reassembled-testing", Some("Screen fitted"))
        .await;
    bench
        .expect_move(&bench.tech, "repair-complete", Some("Touch test passed"))
        .await;
    bench
        .expect_move(&bench.care, "returned-to-customer-care", None)
        .await;

    let (code, _) = bench.move_to(&bench.tech, "done", None).await;
    assert_eq!(code, StatusCode::FORBIDDEN);

    let done = bench.expect_move(&bench.care, "done", None).await;
    assert_eq!(done["repair_count"], 1);

    let history = bench
        .app
        .expect_data(
            Method::GET,
            &format!("/api/v1/devices/{}/history", bench.device_id),
            None,
            StatusCode::OK,
        )
        .await;
    let history = history.as_array().unwrap();
    assert_eq!(history.len(), 9);
    assert!(history[0]["from_status"].is_null());
    assert_eq!(history[8]["to_status"], "done");
    assert_eq!(history[8]["performed_by"], "care-1");
}

#[tokio::test]
async fn parts_cannot_be_used_beyond_stock_or_twice() {
    let bench = Bench::new().await;
    let spare = bench
        .app
        .expect_data(
            Method::POST,
            "/api/v1/spare-parts",
            Some(json!({
                "name": "A52 Charging Port",
                "part_number": "SM-A525-USB",
                "quantity": 1,
                "cost_price": "8000",
                "selling_price": "15000"
            })),
            StatusCode::CREATED,
        )
        .await;

    let parts_uri = format!("/api/v1/devices/{}/parts", bench.device_id);
    let mut requested = Vec::new();
    for quantity in [2, 1] {
        let (code, part) = bench
            .call(
                &bench.tech,
                Method::POST,
                &parts_uri,
                Some(json!({ "spare_part_id": spare["id"], "quantity": quantity })),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED);
        requested.push(format!(
            "/api/v1/repair-parts/{}/use",
            part["data"]["id"].as_str().unwrap()
        ));
    }
    let (code, _) = bench
        .call(
            &bench.tech,
            Method::POST,
            &parts_uri,
            Some(json!({ "spare_part_id": spare["id"], "quantity": 100_001 })),
        )
        .await;
    assert_eq!(code, StatusCode::BAD_REQUEST);

    let (code, body) = bench.call(&bench.tech, Method::POST, &requested[0], None).await;
    assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Unprocessable Entity");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Available: 1, Requested: 2"));

    let (code, _) = bench.call(&bench.tech, Method::POST, &requested[1], None).await;
    assert_eq!(code, StatusCode::OK);
    let (code, body) = bench.call(&bench.tech, Method::POST, &requested[1], None).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("already been used"));

    let spares = bench
        .app
        .expect_data(Method::GET, "/api/v1/spare-parts", None, StatusCode::OK)
        .await;
    assert_eq!(spares[0]["quantity"], 0);
}

#[tokio::test]
async fn only_the_assigned_technician_may_work_the_device() {
    let bench = Bench::new().await;
    let other = bench.app.token_for(roles::TECHNICIAN, "tech-2");

    let (code, _) = bench.move_to(&other, "diagnosis-started", None).await;
    assert_eq!(code, StatusCode::FORBIDDEN);
    assert!(bench.options(&other).await.is_empty());

    // Admins are not bound to the assignment
    bench
        .expect_move(&bench.app.admin_token(), "diagnosis-started", None)
        .await;
}

#[tokio::test]
async fn moves_outside_the_table_are_invalid() {
    let bench = Bench::new().await;

    let (code, body) = bench.move_to(&bench.tech, "repair-complete", Some("skip")).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Cannot transition from assigned to repair-complete"));

    // Without requested parts the receive action is guarded off
    let (code, _) = bench.move_to(&bench.tech, "parts-arrived", None).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_care_sees_only_the_sms_update_on_bench_work() {
    let bench = Bench::new().await;

    let options = bench.options(&bench.care).await;
    assert_eq!(options, vec!["assigned"]);

    let (code, _) = bench.move_to(&bench.care, "diagnosis-started", None).await;
    assert_eq!(code, StatusCode::FORBIDDEN);

    // The update SMS needs a configured provider
    let (code, _) = bench.move_to(&bench.care, "assigned", None).await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn failed_repairs_close_through_customer_care() {
    let bench = Bench::new().await;

    bench.expect_move(&bench.tech, "diagnosis-started", None).await;
    bench.expect_move(&bench.tech, "in-repair", None).await;
    bench
        .expect_move(&bench.tech, "failed", Some("Board is water damaged"))
        .await;

    let (code, _) = bench.move_to(&bench.care, "done", None).await;
    assert_eq!(code, StatusCode::BAD_REQUEST);
    let closed = bench
        .expect_move(&bench.care, "done", Some("Customer collected unrepaired"))
        .await;
    assert_eq!(closed["status"], "done");
}

#[tokio::test]
async fn cashiers_cannot_reach_repairs() {
    let bench = Bench::new().await;
    let cashier = bench.app.token_for(roles::CASHIER, "cashier-1");

    let (code, _) = bench
        .call(&cashier, Method::GET, "/api/v1/devices", None)
        .await;
    assert_eq!(code, StatusCode::FORBIDDEN);

    let (code, _) = bench.move_to(&cashier, "diagnosis-started", None).await;
    assert_eq!(code, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn devices_filter_by_technician_and_status() {
    let bench = Bench::new().await;

    let page = bench
        .app
        .expect_data(
            Method::GET,
            &format!("/api/v1/devices?assigned_to={}&status=assigned", TECH_ID),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(page["total"], 1);

    let page = bench
        .app
        .expect_data(
            Method::GET,
            "/api/v1/devices?status=in-repair",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(page["total"], 0);
}
