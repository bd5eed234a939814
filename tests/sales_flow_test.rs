//! Point-of-sale checkout: stock, totals, loyalty and receipts.

mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};

fn sale_body(customer_id: &Value, variant_id: &Value, quantity: i32, amount: &str) -> Value {
    json!({
        "customer_id": customer_id,
        "items": [{ "variant_id": variant_id, "quantity": quantity }],
        "payment_method": { "type": "cash", "amount": amount }
    })
}

async fn variant_quantity(app: &TestApp, product_id: &Value) -> i64 {
    let product = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/products/{}", product_id.as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    product["variants"][0]["quantity"].as_i64().unwrap()
}

#[tokio::test]
async fn completed_sale_decrements_stock_and_accrues_points() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Halima Omari", "0713111222").await;
    let (product, variant) = app.create_product("SCR-IP12", "15000", 5, 1).await;

    let sale = app
        .expect_data(
            Method::POST,
            "/api/v1/sales",
            Some(sale_body(&customer["id"], &variant["id"], 2, "30000")),
            StatusCode::CREATED,
        )
        .await;

    assert_eq!(decimal(&sale["subtotal"]), dec!(30000));
    assert_eq!(decimal(&sale["tax"]), dec!(0));
    assert_eq!(decimal(&sale["total_amount"]), dec!(30000));
    assert_eq!(sale["customer_name"], "Halima Omari");
    assert!(sale["sale_number"].as_str().unwrap().starts_with("SALE-"));
    assert_eq!(sale["items"].as_array().unwrap().len(), 1);
    assert_eq!(decimal(&sale["items"][0]["profit"]), dec!(28000));

    let receipt = &sale["receipt"];
    assert_eq!(
        receipt["receipt_number"],
        format!("RCP-{}", sale["sale_number"].as_str().unwrap())
    );
    assert_eq!(receipt["payment_method"], "cash");
    assert_eq!(receipt["items_count"], 2);

    assert_eq!(variant_quantity(&app, &product["id"]).await, 3);

    let customer = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/customers/{}", customer["id"].as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(customer["points"], 30);
    assert_eq!(customer["total_orders"], 1);
    assert_eq!(decimal(&customer["total_spent"]), dec!(30000));

    let movements = app
        .expect_data(
            Method::GET,
            &format!(
                "/api/v1/inventory/variants/{}/movements",
                variant["id"].as_str().unwrap()
            ),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(movements[0]["movement_type"], "out");
    assert_eq!(movements[0]["previous_quantity"], 5);
    assert_eq!(movements[0]["new_quantity"], 3);

    let fetched = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/sales/{}", sale["id"].as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(fetched["sale_number"], sale["sale_number"]);

    let receipt = app
        .expect_data(
            Method::GET,
            &format!("/api/v1/sales/{}/receipt", sale["id"].as_str().unwrap()),
            None,
            StatusCode::OK,
        )
        .await;
    assert_eq!(receipt["sale_id"], sale["id"]);
}

#[tokio::test]
async fn overselling_is_rejected_without_side_effects() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Said Mrisho", "0713222333").await;
    let (product, variant) = app.create_product("BAT-S21", "40000", 1, 0).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/sales",
            Some(sale_body(&customer["id"], &variant["id"], 2, "80000")),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Available: 1, Requested: 2"));

    assert_eq!(variant_quantity(&app, &product["id"]).await, 1);
    let recent = app
        .expect_data(Method::GET, "/api/v1/sales/recent", None, StatusCode::OK)
        .await;
    assert!(recent.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn out_of_range_lines_are_rejected() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Halima Issa", "0713444555").await;
    let (product, variant) = app.create_product("CASE-S21", "15000", 5, 0).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/sales",
            Some(sale_body(&customer["id"], &variant["id"], 100_001, "1")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": customer["id"],
                "items": [{
                    "variant_id": variant["id"],
                    "quantity": 2,
                    "unit_price": "39614081257132168796771975167"
                }],
                "payment_method": { "type": "cash", "amount": "1" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Unit price cannot exceed"));

    assert_eq!(variant_quantity(&app, &product["id"]).await, 5);
}

#[tokio::test]
async fn sale_requires_a_known_customer() {
    let app = TestApp::new().await;
    let (_, variant) = app.create_product("CHG-20W", "25000", 4, 1).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "items": [{ "variant_id": variant["id"], "quantity": 1 }],
                "payment_method": { "type": "cash", "amount": "25000" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .contains("Customer is required"));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/sales",
            Some(sale_body(
                &json!("00000000-0000-0000-0000-000000000001"),
                &variant["id"],
                1,
                "25000",
            )),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn configured_tax_and_discount_apply_to_totals() {
    let app = TestApp::with_config(|cfg| cfg.sales_tax_rate = dec!(0.18)).await;
    let customer = app.create_customer("Zawadi Mwita", "0713444555").await;
    let (_, variant) = app.create_product("CASE-A52", "10000", 10, 2).await;

    let sale = app
        .expect_data(
            Method::POST,
            "/api/v1/sales",
            Some(json!({
                "customer_id": customer["id"],
                "items": [{ "variant_id": variant["id"], "quantity": 2 }],
                "discount_type": "percentage",
                "discount_value": "10",
                "payment_method": { "type": "mobile_money", "amount": "21240" }
            })),
            StatusCode::CREATED,
        )
        .await;

    assert_eq!(decimal(&sale["subtotal"]), dec!(20000));
    assert_eq!(decimal(&sale["discount_amount"]), dec!(2000));
    assert_eq!(decimal(&sale["tax"]), dec!(3240));
    assert_eq!(decimal(&sale["total_amount"]), dec!(21240));
}

#[tokio::test]
async fn stock_falling_to_reorder_level_shows_in_low_stock() {
    let app = TestApp::new().await;
    let customer = app.create_customer("Grace Lyimo", "0713666777").await;
    let (_, variant) = app.create_product("CAM-X10", "50000", 3, 2).await;

    let low = app
        .expect_data(Method::GET, "/api/v1/inventory/low-stock", None, StatusCode::OK)
        .await;
    assert!(low.as_array().unwrap().is_empty());

    app.expect_data(
        Method::POST,
        "/api/v1/sales",
        Some(sale_body(&customer["id"], &variant["id"], 1, "50000")),
        StatusCode::CREATED,
    )
    .await;

    let low = app
        .expect_data(Method::GET, "/api/v1/inventory/low-stock", None, StatusCode::OK)
        .await;
    let low = low.as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["sku"], "CAM-X10-V1");
    assert_eq!(low[0]["product_name"], "Product CAM-X10");
}

#[tokio::test]
async fn manual_stock_adjustments_record_movements() {
    let app = TestApp::new().await;
    let (product, variant) = app.create_product("FLEX-P30", "8000", 2, 0).await;
    let adjust_uri = format!(
        "/api/v1/inventory/variants/{}/adjust",
        variant["id"].as_str().unwrap()
    );

    let movement = app
        .expect_data(
            Method::POST,
            &adjust_uri,
            Some(json!({ "movement_type": "in", "quantity": 4, "reason": "Restock" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(movement["new_quantity"], 6);

    let (status, _) = app
        .send(
            Method::POST,
            &adjust_uri,
            Some(json!({ "movement_type": "out", "quantity": 7, "reason": "Damaged" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let movement = app
        .expect_data(
            Method::POST,
            &adjust_uri,
            Some(json!({ "movement_type": "adjustment", "quantity": 1, "reason": "Stock count" })),
            StatusCode::OK,
        )
        .await;
    assert_eq!(movement["previous_quantity"], 6);
    assert_eq!(movement["new_quantity"], 1);
    assert_eq!(variant_quantity(&app, &product["id"]).await, 1);
}

#[tokio::test]
async fn duplicate_product_sku_conflicts() {
    let app = TestApp::new().await;
    app.create_product("DUP-1", "1000", 1, 0).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Again",
                "sku": "DUP-1",
                "variants": [{ "name": "Default", "sku": "DUP-1-V2", "price": "1000", "cost_price": "500" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_variants_reject_the_whole_product() {
    let app = TestApp::new().await;
    let cases = [
        json!({ "name": "", "sku": "BAD-V1", "price": "1000", "cost_price": "500" }),
        json!({ "name": "Default", "sku": "BAD-V1", "price": "1000", "cost_price": "500", "quantity": 100001 }),
        json!({ "name": "Default", "sku": "BAD-V1", "price": "-1", "cost_price": "500" }),
        json!({ "name": "Default", "sku": "BAD-V1", "price": "1000000000001", "cost_price": "500" }),
    ];

    for variant in cases {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/v1/products",
                Some(json!({ "name": "Broken", "sku": "BAD-1", "variants": [variant.clone()] })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", variant);
    }

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Fixed",
                "sku": "BAD-1",
                "variants": [{ "name": "Default", "sku": "BAD-V1", "price": "1000", "cost_price": "500" }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}
