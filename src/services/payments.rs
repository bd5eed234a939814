use crate::{
    db::DbPool,
    entities::{
        customer,
        customer_payment::{self, PaymentMethod, PaymentStatus, PaymentType},
        payment_metric::{self, MetricStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordPaymentInput {
    pub customer_id: Uuid,
    pub device_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    #[schema(value_type = String, example = "50000")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub payment_type: Option<PaymentType>,
    pub status: Option<PaymentStatus>,
    #[validate(length(max = 255))]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusInput {
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordMetricInput {
    #[validate(length(min = 1, max = 50))]
    pub provider: String,
    #[validate(length(min = 1, max = 50))]
    pub operation: String,
    pub success: bool,
    #[validate(range(min = 0))]
    pub latency_ms: i64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PerformanceQuery {
    pub provider: Option<String>,
    pub hours: Option<i64>,
}

/// Gateway call statistics for one provider operation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PerformanceSummary {
    pub provider: String,
    pub operation: String,
    pub total_calls: u64,
    pub successful_calls: u64,
    /// Percentage, 0 to 100
    pub success_rate: f64,
    pub average_latency_ms: f64,
    pub p95_latency_ms: i64,
}

/// Longest look-back accepted for payment statistics and scans, one year.
pub const MAX_WINDOW_HOURS: i64 = 8760;

/// Start of a look-back window of `hours`, which must be in `1..=MAX_WINDOW_HOURS`.
pub fn window_start(hours: i64) -> Result<DateTime<Utc>, ServiceError> {
    if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
        return Err(ServiceError::ValidationError(format!(
            "Hours must be between 1 and {}",
            MAX_WINDOW_HOURS
        )));
    }
    ChronoDuration::try_hours(hours)
        .and_then(|window| Utc::now().checked_sub_signed(window))
        .ok_or_else(|| ServiceError::ValidationError("Hours is out of range".to_string()))
}

/// Whether a payment of this type may move between the two statuses.
///
/// Refunds need approval before they complete; payments and deposits may also
/// settle directly from pending.
pub fn can_change_status(payment_type: PaymentType, from: PaymentStatus, to: PaymentStatus) -> bool {
    use PaymentStatus::*;
    match (from, to) {
        (Pending, Approved) | (Pending, Failed) | (Approved, Completed) | (Approved, Failed) => {
            true
        }
        (Pending, Completed) => payment_type != PaymentType::Refund,
        _ => false,
    }
}

/// Nearest-rank percentile of an ascending slice.
pub fn percentile(sorted: &[i64], pct: f64) -> i64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = ((pct / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

/// Groups metric rows per provider and operation.
pub fn summarize_metrics(rows: &[payment_metric::Model]) -> Vec<PerformanceSummary> {
    let mut groups: BTreeMap<(String, String), Vec<&payment_metric::Model>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.provider.clone(), row.operation.clone()))
            .or_default()
            .push(row);
    }

    groups
        .into_iter()
        .map(|((provider, operation), calls)| {
            let total = calls.len() as u64;
            let successful = calls
                .iter()
                .filter(|c| c.status == MetricStatus::Success)
                .count() as u64;
            let mut latencies: Vec<i64> = calls.iter().map(|c| c.latency_ms).collect();
            latencies.sort_unstable();
            let average = latencies.iter().map(|&l| i128::from(l)).sum::<i128>() as f64 / total as f64;

            PerformanceSummary {
                provider,
                operation,
                total_calls: total,
                successful_calls: successful,
                success_rate: (successful as f64 / total as f64 * 10_000.0).round() / 100.0,
                average_latency_ms: (average * 100.0).round() / 100.0,
                p95_latency_ms: percentile(&latencies, 95.0),
            }
        })
        .collect()
}

/// Persists one gateway call and mirrors it into the latency histogram.
pub(crate) async fn record_gateway_metric<C: ConnectionTrait>(
    conn: &C,
    provider: &str,
    operation: &str,
    latency: Duration,
    error: Option<String>,
) -> Result<payment_metric::Model, ServiceError> {
    metrics::record_gateway_call(provider, operation, error.is_none(), latency);
    let status = if error.is_none() {
        MetricStatus::Success
    } else {
        MetricStatus::Failure
    };

    Ok(payment_metric::ActiveModel {
        id: Set(Uuid::new_v4()),
        provider: Set(provider.to_string()),
        operation: Set(operation.to_string()),
        status: Set(status),
        latency_ms: Set(i64::try_from(latency.as_millis()).unwrap_or(i64::MAX)),
        error: Set(error),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?)
}

/// Customer payments and gateway performance
#[derive(Clone)]
pub struct PaymentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn record_payment(
        &self,
        input: RecordPaymentInput,
        actor: &str,
    ) -> Result<customer_payment::Model, ServiceError> {
        input.validate()?;
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }

        let db = &*self.db_pool;
        customer::Entity::find_by_id(input.customer_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
            })?;

        let payment = customer_payment::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(input.customer_id),
            device_id: Set(input.device_id),
            sale_id: Set(input.sale_id),
            amount: Set(input.amount),
            method: Set(input.method),
            payment_type: Set(input.payment_type.unwrap_or(PaymentType::Payment)),
            status: Set(input.status.unwrap_or(PaymentStatus::Completed)),
            reference: Set(input.reference),
            created_by: Set(actor.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        self.event_sender
            .send_or_log(Event::PaymentRecorded(payment.id))
            .await;
        info!(payment_id = %payment.id, amount = %payment.amount, "Payment recorded");
        Ok(payment)
    }

    #[instrument(skip(self))]
    pub async fn list_customer_payments(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<customer_payment::Model>, ServiceError> {
        Ok(customer_payment::Entity::find()
            .filter(customer_payment::Column::CustomerId.eq(customer_id))
            .order_by_desc(customer_payment::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update_payment_status(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<customer_payment::Model, ServiceError> {
        let db = &*self.db_pool;
        let payment = customer_payment::Entity::find_by_id(payment_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;

        let old_status = payment.status;
        if !can_change_status(payment.payment_type, old_status, status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot change payment status from {} to {}",
                old_status, status
            )));
        }

        let mut model: customer_payment::ActiveModel = payment.into();
        model.status = Set(status);
        let payment = model.update(db).await?;

        self.event_sender
            .send_or_log(Event::PaymentStatusChanged {
                payment_id,
                old_status: old_status.to_string(),
                new_status: status.to_string(),
            })
            .await;
        info!(%payment_id, from = %old_status, to = %status, "Payment status changed");
        Ok(payment)
    }

    #[instrument(skip(self, input))]
    pub async fn record_metric(
        &self,
        input: RecordMetricInput,
    ) -> Result<payment_metric::Model, ServiceError> {
        input.validate()?;
        let error = if input.success {
            None
        } else {
            Some(input.error.unwrap_or_else(|| "unknown error".to_string()))
        };
        record_gateway_metric(
            &*self.db_pool,
            &input.provider,
            &input.operation,
            Duration::from_millis(input.latency_ms.max(0) as u64),
            error,
        )
        .await
    }

    /// Per provider and operation statistics over the last `hours`.
    #[instrument(skip(self))]
    pub async fn performance_summary(
        &self,
        provider: Option<String>,
        hours: i64,
    ) -> Result<Vec<PerformanceSummary>, ServiceError> {
        let since = window_start(hours)?;
        let mut query = payment_metric::Entity::find()
            .filter(payment_metric::Column::CreatedAt.gte(since));
        if let Some(provider) = provider {
            query = query.filter(payment_metric::Column::Provider.eq(provider));
        }
        let rows = query.all(&*self.db_pool).await?;
        Ok(summarize_metrics(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric(provider: &str, operation: &str, ok: bool, latency_ms: i64) -> payment_metric::Model {
        payment_metric::Model {
            id: Uuid::new_v4(),
            provider: provider.into(),
            operation: operation.into(),
            status: if ok {
                MetricStatus::Success
            } else {
                MetricStatus::Failure
            },
            latency_ms,
            error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn refund_needs_approval_first() {
        use PaymentStatus::*;
        assert!(!can_change_status(PaymentType::Refund, Pending, Completed));
        assert!(can_change_status(PaymentType::Refund, Pending, Approved));
        assert!(can_change_status(PaymentType::Refund, Approved, Completed));
        assert!(can_change_status(PaymentType::Payment, Pending, Completed));
        assert!(can_change_status(PaymentType::Payment, Pending, Approved));
        assert!(!can_change_status(PaymentType::Payment, Failed, Completed));
        assert!(!can_change_status(PaymentType::Deposit, Completed, Failed));
    }

    #[test]
    fn percentile_uses_nearest_rank() {
        let values: Vec<i64> = (1..=20).map(|v| v * 10).collect();
        assert_eq!(percentile(&values, 95.0), 190);
        assert_eq!(percentile(&[42], 95.0), 42);
        assert_eq!(percentile(&[], 95.0), 0);
    }

    #[test]
    fn summary_groups_by_provider_and_operation() {
        let rows = vec![
            metric("zenopay", "create_order", true, 100),
            metric("zenopay", "create_order", false, 300),
            metric("zenopay", "create_order", true, 200),
            metric("zenopay", "order_status", true, 50),
        ];
        let summary = summarize_metrics(&rows);
        assert_eq!(summary.len(), 2);

        let create = &summary[0];
        assert_eq!(create.operation, "create_order");
        assert_eq!(create.total_calls, 3);
        assert_eq!(create.successful_calls, 2);
        assert_eq!(create.success_rate, 66.67);
        assert_eq!(create.average_latency_ms, 200.0);
        assert_eq!(create.p95_latency_ms, 300);
    }

    #[test]
    fn huge_latencies_average_without_overflow() {
        let rows = vec![
            metric("zenopay", "create_order", true, i64::MAX),
            metric("zenopay", "create_order", true, i64::MAX),
        ];
        let summary = summarize_metrics(&rows);
        assert_eq!(summary[0].average_latency_ms, i64::MAX as f64);
    }

    #[test]
    fn window_hours_are_bounded() {
        let start = window_start(24).unwrap();
        let hours = (Utc::now() - start).num_hours();
        assert!((23..=24).contains(&hours));
        assert!(window_start(MAX_WINDOW_HOURS).is_ok());

        for hours in [0, -1, MAX_WINDOW_HOURS + 1, i64::MAX] {
            assert!(
                matches!(window_start(hours), Err(ServiceError::ValidationError(_))),
                "{hours}"
            );
        }
    }
}
