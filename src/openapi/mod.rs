use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LATS API",
        version = "1.0.0",
        description = r#"
# LATS Repair Shop API

Back office for a phone and electronics repair shop.

## Features

- **Customers & Loyalty**: Customer records, points ledger, tiers and rewards
- **Inventory**: Products, variants, serialized units and stock movements
- **Point of Sale**: Sales with receipts, tax and loyalty points
- **Procurement**: Suppliers, purchase orders, receiving and supplier payments
- **Repairs**: Device intake and the role-gated repair workflow
- **Diagnostics**: Batch device testing, checklists and admin review
- **Payments**: Customer payments, mobile money and anomaly monitoring
- **Finance**: Accounts, expenses and transfers
- **Notifications**: SMS and WhatsApp delivery

## Authentication

Every endpoint except the mobile money webhook requires a bearer JWT:

```
Authorization: Bearer <your-jwt-token>
```

The webhook is authenticated with the gateway's `x-api-key` header.

## Pagination

List endpoints that paginate accept `page` (default 1) and `limit`
(default 20, max 100).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Customers", description = "Customer records"),
        (name = "Loyalty", description = "Points, tiers and rewards"),
        (name = "Inventory", description = "Products and stock"),
        (name = "Sales", description = "Point of sale"),
        (name = "Purchase Orders", description = "Suppliers and procurement"),
        (name = "Repairs", description = "Device repair workflow"),
        (name = "Diagnostics", description = "Device testing requests, checks and templates"),
        (name = "Payments", description = "Customer payments and gateway performance"),
        (name = "Mobile Money", description = "Mobile money collections"),
        (name = "Payment Security", description = "Payment anomaly alerts"),
        (name = "Finance", description = "Accounts, expenses and transfers"),
        (name = "Notifications", description = "SMS and WhatsApp"),
        (name = "Settings", description = "Runtime settings")
    ),
    paths(
        // Customers & loyalty
        crate::handlers::customers::create_customer,
        crate::handlers::customers::list_customers,
        crate::handlers::customers::get_customer,
        crate::handlers::customers::update_customer,
        crate::handlers::customers::adjust_points,
        crate::handlers::customers::points_history,
        crate::handlers::customers::redeem_reward,
        crate::handlers::customers::loyalty_metrics,
        crate::handlers::customers::list_rewards,

        // Inventory
        crate::handlers::inventory::create_product,
        crate::handlers::inventory::list_products,
        crate::handlers::inventory::get_product,
        crate::handlers::inventory::list_serials,
        crate::handlers::inventory::adjust_stock,
        crate::handlers::inventory::list_movements,
        crate::handlers::inventory::low_stock,

        // Sales
        crate::handlers::sales::process_sale,
        crate::handlers::sales::recent_sales,
        crate::handlers::sales::get_sale,
        crate::handlers::sales::get_receipt,

        // Procurement
        crate::handlers::purchase_orders::create_supplier,
        crate::handlers::purchase_orders::list_suppliers,
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_status,
        crate::handlers::purchase_orders::receive,
        crate::handlers::purchase_orders::add_payment,
        crate::handlers::purchase_orders::list_payments,
        crate::handlers::purchase_orders::payment_summary,
        crate::handlers::purchase_orders::audit_log,
        crate::handlers::purchase_orders::add_message,
        crate::handlers::purchase_orders::list_messages,
        crate::handlers::purchase_orders::add_quality_check,
        crate::handlers::purchase_orders::list_quality_checks,

        // Repairs
        crate::handlers::repairs::register_device,
        crate::handlers::repairs::list_devices,
        crate::handlers::repairs::get_device,
        crate::handlers::repairs::available_transitions,
        crate::handlers::repairs::update_device_status,
        crate::handlers::repairs::transition_history,
        crate::handlers::repairs::request_part,
        crate::handlers::repairs::list_repair_parts,
        crate::handlers::repairs::update_part_status,
        crate::handlers::repairs::use_part,
        crate::handlers::repairs::create_spare_part,
        crate::handlers::repairs::list_spare_parts,

        // Diagnostics
        crate::handlers::diagnostics::create_request,
        crate::handlers::diagnostics::list_requests,
        crate::handlers::diagnostics::stats,
        crate::handlers::diagnostics::get_request,
        crate::handlers::diagnostics::update_request,
        crate::handlers::diagnostics::get_device,
        crate::handlers::diagnostics::record_check,
        crate::handlers::diagnostics::update_check,
        crate::handlers::diagnostics::submit_feedback,
        crate::handlers::diagnostics::complete_action,
        crate::handlers::diagnostics::list_templates,
        crate::handlers::diagnostics::match_template,
        crate::handlers::diagnostics::create_template,
        crate::handlers::diagnostics::update_template,
        crate::handlers::diagnostics::delete_template,

        // Payments
        crate::handlers::payments::record_payment,
        crate::handlers::payments::list_customer_payments,
        crate::handlers::payments::update_payment_status,
        crate::handlers::payments::create_mobile_money_order,
        crate::handlers::payments::list_mobile_money_orders,
        crate::handlers::payments::check_mobile_money_status,
        crate::handlers::payments::performance,
        crate::handlers::payments::record_metric,
        crate::handlers::payments::scan,
        crate::handlers::payments::list_alerts,
        crate::handlers::payments::update_alert,
        crate::handlers::payment_webhooks::mobile_money_webhook,

        // Finance
        crate::handlers::finance::create_account,
        crate::handlers::finance::list_accounts,
        crate::handlers::finance::get_account,
        crate::handlers::finance::record_expense,
        crate::handlers::finance::list_expenses,
        crate::handlers::finance::transfer,
        crate::handlers::finance::list_transfers,
        crate::handlers::finance::summary,

        // Notifications
        crate::handlers::notifications::send_sms,
        crate::handlers::notifications::send_bulk_sms,
        crate::handlers::notifications::sms_logs,
        crate::handlers::notifications::sms_stats,
        crate::handlers::notifications::send_whatsapp,

        // Settings
        crate::handlers::settings::list_settings,
        crate::handlers::settings::get_setting,
        crate::handlers::settings::put_setting,
        crate::handlers::settings::delete_setting,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::handlers::customers::AdjustPointsRequest,
            crate::handlers::customers::RedeemRequest,
            crate::services::loyalty::LoyaltyMetrics,
            crate::services::sales::ProcessSaleInput,
            crate::services::repair_workflow::AvailableTransition,
            crate::services::diagnostics::DiagnosticDeviceInput,
            crate::services::diagnostics::DiagnosticStats,
            crate::services::payments::PerformanceSummary,
            crate::services::mobile_money::MobileMoneyWebhook,
            crate::services::finance::FinanceSummary,
            crate::notifications::sms::SmsStats,
        )
    )
)]
pub struct ApiDocV1;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("LATS API"));
        assert!(json.contains("/api/v1/sales"));
        assert!(json.contains("/api/v1/devices/{id}/status"));
        assert!(json.contains("bearer_auth"));
    }

    #[test]
    fn webhook_is_documented_without_bearer_auth() {
        let openapi = ApiDocV1::openapi();
        let path = openapi
            .paths
            .paths
            .get("/api/v1/payments/mobile-money/webhook")
            .expect("webhook path documented");
        let post = path.post.as_ref().expect("webhook is a POST");
        assert!(post.security.is_none());
    }
}
