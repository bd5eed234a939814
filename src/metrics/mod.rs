/*!
 * # Metrics Module
 *
 * Prometheus counters and histograms for the shop's business flows,
 * exposed in the text exposition format at `/metrics`.
 */

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, HistogramVec,
    IntCounter, IntCounterVec, TextEncoder,
};
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to export metrics: {0}")]
    ExportError(String),
}

lazy_static! {
    static ref SALES_COMPLETED: IntCounter = register_int_counter!(
        "lats_sales_completed_total",
        "Total number of completed POS sales"
    )
    .expect("metric can be created");
    static ref SALE_FAILURES: IntCounterVec = register_int_counter_vec!(
        "lats_sale_failures_total",
        "Total number of rejected POS sales by reason",
        &["reason"]
    )
    .expect("metric can be created");
    static ref PURCHASE_ORDERS_RECEIVED: IntCounter = register_int_counter!(
        "lats_purchase_orders_received_total",
        "Total number of purchase order receive operations"
    )
    .expect("metric can be created");
    static ref DEVICE_TRANSITIONS: IntCounterVec = register_int_counter_vec!(
        "lats_device_transitions_total",
        "Total number of repair status transitions by target status",
        &["to_status"]
    )
    .expect("metric can be created");
    static ref SMS_SENT: IntCounter =
        register_int_counter!("lats_sms_sent_total", "Total number of SMS delivered to the provider")
            .expect("metric can be created");
    static ref SMS_FAILED: IntCounter =
        register_int_counter!("lats_sms_failed_total", "Total number of failed SMS attempts")
            .expect("metric can be created");
    static ref GATEWAY_LATENCY: HistogramVec = register_histogram_vec!(
        "lats_gateway_latency_seconds",
        "Latency of outbound payment and messaging gateway calls",
        &["provider", "operation", "status"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("metric can be created");
    static ref SECURITY_ALERTS: IntCounterVec = register_int_counter_vec!(
        "lats_payment_security_alerts_total",
        "Total number of payment security alerts raised",
        &["alert_type", "severity"]
    )
    .expect("metric can be created");
}

pub fn record_sale_completed() {
    SALES_COMPLETED.inc();
}

pub fn record_sale_failure(reason: &str) {
    SALE_FAILURES.with_label_values(&[reason]).inc();
}

pub fn record_purchase_order_received() {
    PURCHASE_ORDERS_RECEIVED.inc();
}

pub fn record_device_transition(to_status: &str) {
    DEVICE_TRANSITIONS.with_label_values(&[to_status]).inc();
}

pub fn record_sms(success: bool) {
    if success {
        SMS_SENT.inc();
    } else {
        SMS_FAILED.inc();
    }
}

pub fn record_gateway_call(provider: &str, operation: &str, success: bool, latency: Duration) {
    let status = if success { "success" } else { "failure" };
    GATEWAY_LATENCY
        .with_label_values(&[provider, operation, status])
        .observe(latency.as_secs_f64());
}

pub fn record_security_alert(alert_type: &str, severity: &str) {
    SECURITY_ALERTS
        .with_label_values(&[alert_type, severity])
        .inc();
}

/// Renders every registered metric in the Prometheus text format.
pub fn render() -> Result<String, MetricsError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| MetricsError::ExportError(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| MetricsError::ExportError(e.to_string()))
}

pub async fn metrics_handler() -> Response {
    match render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_string())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_output_contains_recorded_series() {
        record_sale_completed();
        record_sms(false);
        record_gateway_call("zenopay", "create_order", true, Duration::from_millis(120));
        record_device_transition("in-repair");

        let text = render().unwrap();
        assert!(text.contains("lats_sales_completed_total"));
        assert!(text.contains("lats_sms_failed_total"));
        assert!(text.contains("provider=\"zenopay\""));
        assert!(text.contains("to_status=\"in-repair\""));
    }
}
