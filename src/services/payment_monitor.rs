use crate::{
    db::DbPool,
    entities::{
        customer_payment::{self, PaymentStatus},
        security_alert::{self, AlertSeverity, AlertStatus, AlertType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::{checked_sum, payments::window_start},
};
use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Payments examined per scan, newest first.
pub const SCAN_LIMIT: u64 = 50;
pub const MIN_NORMAL_AMOUNT: Decimal = dec!(100);
const UNUSUAL_FACTOR: Decimal = dec!(5);
const HIGH_FACTOR: Decimal = dec!(10);
const FAILURE_THRESHOLD: usize = 3;
const HIGH_FAILURE_THRESHOLD: usize = 5;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateAlertStatusInput {
    pub status: AlertStatus,
}

/// An alert the scan wants to raise, before deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertCandidate {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub customer_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub description: String,
}

/// Flags unusual amounts and repeated failures in a batch of payments.
pub fn detect_anomalies(payments: &[customer_payment::Model]) -> Vec<AlertCandidate> {
    let mut candidates = Vec::new();

    let completed: Vec<&customer_payment::Model> = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .collect();
    let total = match checked_sum(completed.iter().map(|p| p.amount)) {
        Ok(total) => Some(total),
        Err(_) => {
            warn!(payments = completed.len(), "Payment total out of range, skipping amount checks");
            None
        }
    };
    if let Some(total) = total.filter(|_| !completed.is_empty()) {
        let average = total / Decimal::from(completed.len());
        // A multiple that does not fit a Decimal is never exceeded.
        let exceeds = |amount: Decimal, factor: Decimal| {
            average > Decimal::ZERO
                && average
                    .checked_mul(factor)
                    .is_some_and(|limit| amount > limit)
        };

        for payment in &completed {
            let too_large = exceeds(payment.amount, UNUSUAL_FACTOR);
            if !too_large && payment.amount >= MIN_NORMAL_AMOUNT {
                continue;
            }
            let severity = if exceeds(payment.amount, HIGH_FACTOR) {
                AlertSeverity::High
            } else {
                AlertSeverity::Medium
            };
            candidates.push(AlertCandidate {
                alert_type: AlertType::UnusualAmount,
                severity,
                customer_id: Some(payment.customer_id),
                payment_id: Some(payment.id),
                description: format!(
                    "Unusual payment amount {} (average {})",
                    payment.amount.round_dp(2),
                    average.round_dp(2)
                ),
            });
        }
    }

    let mut failures: BTreeMap<Uuid, usize> = BTreeMap::new();
    for payment in payments.iter().filter(|p| p.status == PaymentStatus::Failed) {
        *failures.entry(payment.customer_id).or_default() += 1;
    }
    for (customer_id, count) in failures {
        if count < FAILURE_THRESHOLD {
            continue;
        }
        let severity = if count >= HIGH_FAILURE_THRESHOLD {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        candidates.push(AlertCandidate {
            alert_type: AlertType::MultipleFailures,
            severity,
            customer_id: Some(customer_id),
            payment_id: None,
            description: format!("{} failed payments for one customer", count),
        });
    }

    candidates
}

/// Raises security alerts from recent payment activity.
#[derive(Clone)]
pub struct PaymentMonitorService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    window_hours: i64,
}

impl PaymentMonitorService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, window_hours: i64) -> Self {
        Self {
            db_pool,
            event_sender,
            window_hours,
        }
    }

    /// Scans the configured window and stores any new alerts.
    #[instrument(skip(self))]
    pub async fn scan(&self) -> Result<Vec<security_alert::Model>, ServiceError> {
        self.scan_window(self.window_hours).await
    }

    #[instrument(skip(self))]
    pub async fn scan_window(
        &self,
        window_hours: i64,
    ) -> Result<Vec<security_alert::Model>, ServiceError> {
        let db = &*self.db_pool;
        let since = window_start(window_hours)?;

        let payments = customer_payment::Entity::find()
            .filter(customer_payment::Column::CreatedAt.gte(since))
            .filter(
                customer_payment::Column::Status
                    .is_in([PaymentStatus::Completed, PaymentStatus::Failed]),
            )
            .order_by_desc(customer_payment::Column::CreatedAt)
            .limit(SCAN_LIMIT)
            .all(db)
            .await?;

        let mut raised = Vec::new();
        for candidate in detect_anomalies(&payments) {
            if self.has_open_alert(&candidate).await? {
                continue;
            }

            let alert = security_alert::ActiveModel {
                id: Set(Uuid::new_v4()),
                alert_type: Set(candidate.alert_type),
                severity: Set(candidate.severity),
                status: Set(AlertStatus::Open),
                customer_id: Set(candidate.customer_id),
                payment_id: Set(candidate.payment_id),
                description: Set(candidate.description),
                created_at: Set(Utc::now()),
                resolved_at: Set(None),
            }
            .insert(db)
            .await?;

            metrics::record_security_alert(
                &alert.alert_type.to_string(),
                &alert.severity.to_string(),
            );
            self.event_sender
                .send_or_log(Event::SecurityAlertRaised {
                    alert_id: alert.id,
                    alert_type: alert.alert_type.to_string(),
                    severity: alert.severity.to_string(),
                })
                .await;
            raised.push(alert);
        }

        info!(
            scanned = payments.len(),
            raised = raised.len(),
            "Payment security scan finished"
        );
        Ok(raised)
    }

    async fn has_open_alert(&self, candidate: &AlertCandidate) -> Result<bool, ServiceError> {
        let mut query = security_alert::Entity::find()
            .filter(security_alert::Column::AlertType.eq(candidate.alert_type))
            .filter(
                security_alert::Column::Status
                    .is_in([AlertStatus::Open, AlertStatus::Investigating]),
            );
        query = match (candidate.payment_id, candidate.customer_id) {
            (Some(payment_id), _) => {
                query.filter(security_alert::Column::PaymentId.eq(payment_id))
            }
            (None, Some(customer_id)) => {
                query.filter(security_alert::Column::CustomerId.eq(customer_id))
            }
            (None, None) => query,
        };
        Ok(query.one(&*self.db_pool).await?.is_some())
    }

    #[instrument(skip(self))]
    pub async fn list_alerts(
        &self,
        status: Option<AlertStatus>,
    ) -> Result<Vec<security_alert::Model>, ServiceError> {
        let mut query = security_alert::Entity::find();
        if let Some(status) = status {
            query = query.filter(security_alert::Column::Status.eq(status));
        }
        Ok(query
            .order_by_desc(security_alert::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn update_alert_status(
        &self,
        alert_id: Uuid,
        status: AlertStatus,
    ) -> Result<security_alert::Model, ServiceError> {
        let db = &*self.db_pool;
        let alert = security_alert::Entity::find_by_id(alert_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Security alert {} not found", alert_id)))?;

        let mut model: security_alert::ActiveModel = alert.into();
        model.status = Set(status);
        model.resolved_at = Set(status.is_closed().then(Utc::now));
        Ok(model.update(db).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::customer_payment::{PaymentMethod, PaymentType};

    fn payment(customer_id: Uuid, amount: Decimal, status: PaymentStatus) -> customer_payment::Model {
        customer_payment::Model {
            id: Uuid::new_v4(),
            customer_id,
            device_id: None,
            sale_id: None,
            amount,
            method: PaymentMethod::Cash,
            payment_type: PaymentType::Payment,
            status,
            reference: None,
            created_by: "tester".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn flags_amounts_far_above_average() {
        let customer = Uuid::new_v4();
        let mut payments: Vec<_> = (0..19)
            .map(|_| payment(customer, dec!(10000), PaymentStatus::Completed))
            .collect();
        payments.push(payment(customer, dec!(1000000), PaymentStatus::Completed));

        let alerts = detect_anomalies(&payments);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::UnusualAmount);
        assert_eq!(alerts[0].severity, AlertSeverity::High);
        assert_eq!(alerts[0].payment_id, Some(payments[19].id));
    }

    #[test]
    fn flags_tiny_amounts_as_medium() {
        let customer = Uuid::new_v4();
        let payments = vec![
            payment(customer, dec!(5000), PaymentStatus::Completed),
            payment(customer, dec!(50), PaymentStatus::Completed),
        ];
        let alerts = detect_anomalies(&payments);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Medium);
    }

    #[test]
    fn amounts_near_the_decimal_limit_do_not_panic() {
        let customer = Uuid::new_v4();
        let payments = vec![
            payment(customer, Decimal::MAX, PaymentStatus::Completed),
            payment(customer, Decimal::MAX, PaymentStatus::Completed),
        ];
        assert!(detect_anomalies(&payments).is_empty());

        let payments = vec![
            payment(customer, Decimal::MAX / dec!(4), PaymentStatus::Completed),
            payment(customer, dec!(5000), PaymentStatus::Completed),
        ];
        let alerts = detect_anomalies(&payments);
        assert!(alerts.iter().all(|a| a.alert_type == AlertType::UnusualAmount));
    }

    #[test]
    fn repeated_failures_raise_one_alert_per_customer() {
        let noisy = Uuid::new_v4();
        let quiet = Uuid::new_v4();
        let mut payments: Vec<_> = (0..5)
            .map(|_| payment(noisy, dec!(1000), PaymentStatus::Failed))
            .collect();
        payments.extend((0..2).map(|_| payment(quiet, dec!(1000), PaymentStatus::Failed)));

        let alerts = detect_anomalies(&payments);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::MultipleFailures);
        assert_eq!(alerts[0].customer_id, Some(noisy));
        assert_eq!(alerts[0].severity, AlertSeverity::High);
    }
}
