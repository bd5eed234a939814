//! Diagnostic requests: per-unit devices, checks, admin review and templates.

mod common;

use axum::http::{Method, StatusCode};
use common::{split, TestApp};
use lats_api::auth::roles;
use serde_json::{json, Value};

async fn open_request(app: &TestApp) -> Value {
    app.expect_data(
        Method::POST,
        "/api/v1/diagnostics",
        Some(json!({
            "title": "Trade-in batch",
            "assigned_to": "tech-1",
            "devices": [
                { "device_name": "iPhone 11", "serial_number": "F2LX", "model": "iPhone 11" },
                {
                    "device_name": "Redmi 12",
                    "serial_number": "XM",
                    "quantity": 2,
                    "individual_serials": ["XM-0001"]
                }
            ]
        })),
        StatusCode::CREATED,
    )
    .await
}

async fn check(app: &TestApp, device_id: &str, item: &str, result: &str) -> (StatusCode, Value) {
    app.send(
        Method::POST,
        &format!("/api/v1/diagnostic-devices/{}/checks", device_id),
        Some(json!({ "test_item": item, "result": result })),
    )
    .await
}

fn device_ids(request: &Value) -> Vec<String> {
    request["devices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn requests_expand_quantities_into_units() {
    let app = TestApp::new().await;
    let request = open_request(&app).await;

    assert_eq!(request["status"], "pending");
    assert_eq!(request["priority"], "medium");
    assert_eq!(request["created_by"], common::ADMIN_ID);
    let serials: Vec<&str> = request["devices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["serial_number"].as_str().unwrap())
        .collect();
    assert_eq!(serials, ["F2LX", "XM-0001", "XM-2"]);
    assert!(request["devices"]
        .as_array()
        .unwrap()
        .iter()
        .all(|d| d["result_status"] == "pending"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/diagnostics",
            Some(json!({ "title": "Empty", "devices": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/diagnostics",
            Some(json!({ "title": "Bad unit", "devices": [{ "device_name": "" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checks_drive_device_and_request_status() {
    let app = TestApp::new().await;
    let request = open_request(&app).await;
    let request_uri = format!("/api/v1/diagnostics/{}", request["id"].as_str().unwrap());
    let ids = device_ids(&request);

    let (status, device) = check(&app, &ids[0], "Screen", "passed").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(device["data"]["result_status"], "passed");
    let fetched = app.expect_data(Method::GET, &request_uri, None, StatusCode::OK).await;
    assert_eq!(fetched["status"], "in_progress");

    let (_, device) = check(&app, &ids[0], "Battery", "failed").await;
    assert_eq!(device["data"]["result_status"], "partially_failed");
    assert_eq!(device["data"]["check_count"], 2);
    assert_eq!(device["data"]["failed_checks"], 1);

    check(&app, &ids[1], "Screen", "failed").await;
    let (_, device) = check(&app, &ids[2], "Screen", "passed").await;
    let check_id = device["data"]["checks"][0]["id"].as_str().unwrap().to_string();

    let fetched = app.expect_data(Method::GET, &request_uri, None, StatusCode::OK).await;
    assert_eq!(fetched["status"], "completed");
    let second = fetched["devices"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["id"] == ids[1].as_str())
        .unwrap();
    assert_eq!(second["result_status"], "failed");

    let device = app
        .expect_data(
            Method::PUT,
            &format!("/api/v1/diagnostic-checks/{}", check_id),
            Some(json!({ "test_item": "Screen", "result": "failed", "remarks": "Dead pixels" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(device["result_status"], "failed");

    let list = app
        .expect_data(Method::GET, "/api/v1/diagnostics?status=completed", None, StatusCode::OK)
        .await;
    assert_eq!(list["items"][0]["device_count"], 3);
    assert_eq!(list["items"][0]["failed_devices"], 2);
    assert_eq!(list["items"][0]["pending_devices"], 0);
}

#[tokio::test]
async fn admin_review_sends_devices_back_to_care() {
    let app = TestApp::new().await;
    let request = open_request(&app).await;
    let ids = device_ids(&request);
    let feedback_uri = format!("/api/v1/diagnostic-devices/{}/feedback", ids[0]);
    let feedback = json!({ "admin_feedback": "Replace the battery", "next_action": "repair" });

    let (status, body) = app
        .send(Method::POST, &feedback_uri, Some(feedback.clone()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("no check results"));

    check(&app, &ids[0], "Battery", "failed").await;

    let tech = app.token_for(roles::TECHNICIAN, "tech-1");
    let response = app
        .request(Method::POST, &feedback_uri, Some(feedback.clone()), Some(&tech))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let device = app
        .expect_data(Method::POST, &feedback_uri, Some(feedback.clone()), StatusCode::OK)
        .await;
    assert_eq!(device["result_status"], "repair_required");
    assert_eq!(device["next_action"], "repair");
    assert_eq!(device["feedback_submitted_by"], common::ADMIN_ID);

    let (status, _) = check(&app, &ids[0], "Screen", "passed").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let complete_uri = format!("/api/v1/diagnostic-devices/{}/complete", ids[0]);
    let (status, body) = split(
        app.request(
            Method::POST,
            &complete_uri,
            Some(json!({ "completion_notes": "Battery swapped" })),
            Some(&tech),
        )
        .await,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["result_status"], "sent_to_care");
    assert_eq!(body["data"]["repair_notes"], "Battery swapped");

    let (status, _) = app
        .send(Method::POST, &complete_uri, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("/api/v1/diagnostic-devices/{}/complete", ids[1]),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn templates_match_models_with_a_general_fallback() {
    let app = TestApp::new().await;

    let (status, _) = app
        .send(Method::GET, "/api/v1/diagnostic-templates/match?model=iPhone%2013", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let general = app
        .expect_data(
            Method::POST,
            "/api/v1/diagnostic-templates",
            Some(json!({ "device_type": "General", "checklist_items": ["Power on", " Charging "] })),
            StatusCode::CREATED,
        )
        .await;
    assert_eq!(general["device_type"], "general");
    assert_eq!(general["checklist_items"], json!(["Power on", "Charging"]));

    let phone = app
        .expect_data(
            Method::POST,
            "/api/v1/diagnostic-templates",
            Some(json!({ "device_type": "phone", "checklist_items": ["Screen", "Face ID"] })),
            StatusCode::CREATED,
        )
        .await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/diagnostic-templates",
            Some(json!({ "device_type": "PHONE", "checklist_items": ["Screen"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let matched = app
        .expect_data(
            Method::GET,
            "/api/v1/diagnostic-templates/match?model=iPhone%2013",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(matched["id"], phone["id"]);

    let matched = app
        .expect_data(
            Method::GET,
            "/api/v1/diagnostic-templates/match?model=MacBook%20Air",
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(matched["id"], general["id"]);

    let phone_uri = format!("/api/v1/diagnostic-templates/{}", phone["id"].as_str().unwrap());
    let updated = app
        .expect_data(
            Method::PUT,
            &phone_uri,
            Some(json!({ "device_type": "phone", "checklist_items": ["Screen", "Speaker"] })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(updated["checklist_items"], json!(["Screen", "Speaker"]));

    let tech = app.token_for(roles::TECHNICIAN, "tech-1");
    let response = app.request(Method::DELETE, &phone_uri, None, Some(&tech)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::DELETE, &phone_uri, None, Some(&app.admin_token()))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let templates = app
        .expect_data(Method::GET, "/api/v1/diagnostic-templates", None, StatusCode::OK)
        .await;
    assert_eq!(templates.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stats_count_requests_and_devices() {
    let app = TestApp::new().await;
    let request = open_request(&app).await;
    let ids = device_ids(&request);
    check(&app, &ids[0], "Screen", "passed").await;
    check(&app, &ids[1], "Screen", "failed").await;
    check(&app, &ids[1], "Camera", "passed").await;

    let stats = app
        .expect_data(Method::GET, "/api/v1/diagnostics/stats", None, StatusCode::OK)
        .await;
    assert_eq!(stats["total_requests"], 1);
    assert_eq!(stats["in_progress_requests"], 1);
    assert_eq!(stats["total_devices"], 3);
    assert_eq!(stats["passed_devices"], 1);
    assert_eq!(stats["partially_failed_devices"], 1);
    assert_eq!(stats["pending_devices"], 1);
}
