use crate::{
    config::AppConfig,
    db::{with_transaction, DbPool},
    entities::{
        customer,
        customer_payment::{self, PaymentMethod, PaymentStatus, PaymentType},
        mobile_money_order::{self, GatewayStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{format_phone, http_client},
    services::payments::record_gateway_metric,
};
use chrono::Utc;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const PROVIDER: &str = "zenopay";
const CREATE_ORDER_PATH: &str = "/api/payments/mobile_money_tanzania";
const ORDER_STATUS_PATH: &str = "/api/payments/order-status";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMobileMoneyOrderInput {
    #[schema(value_type = String, example = "15000")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 255))]
    pub buyer_name: String,
    #[validate(length(min = 9, max = 40))]
    pub buyer_phone: String,
    #[validate(email)]
    pub buyer_email: Option<String>,
    pub customer_id: Option<Uuid>,
    pub sale_id: Option<Uuid>,
    pub metadata: Option<Value>,
}

/// Callback body posted by the gateway.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct MobileMoneyWebhook {
    pub order_id: String,
    pub payment_status: String,
    pub reference: Option<String>,
    pub metadata: Option<Value>,
}

/// Outcome of applying a gateway status to a stored order.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusUpdate {
    #[schema(value_type = Object)]
    pub order: mobile_money_order::Model,
    pub changed: bool,
    pub payment_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct CreateOrderRequest<'a> {
    order_id: &'a str,
    buyer_email: &'a str,
    buyer_name: &'a str,
    buyer_phone: &'a str,
    amount: i64,
    metadata: &'a Value,
}

#[derive(Debug, Clone)]
struct ZenoPayConfig {
    base_url: String,
    api_key: String,
}

/// Byte-wise comparison whose running time does not depend on where the inputs differ.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}

pub fn default_buyer_email(phone: &str) -> String {
    format!("{}@mobile.money", format_phone(phone))
}

/// Pulls `payment_status` and `reference` out of an order-status response.
///
/// The gateway wraps results in a `data` array; a flat object is accepted too.
pub fn parse_status_response(body: &Value) -> Option<(GatewayStatus, Option<String>)> {
    let record = body
        .get("data")
        .and_then(|data| data.as_array())
        .and_then(|rows| rows.first())
        .unwrap_or(body);

    let status = record
        .get("payment_status")
        .and_then(Value::as_str)
        .and_then(GatewayStatus::parse)?;
    let reference = record
        .get("reference")
        .or_else(|| record.get("transid"))
        .and_then(Value::as_str)
        .map(str::to_string);
    Some((status, reference))
}

/// ZenoPay mobile-money orders: creation, polling and webhook callbacks.
#[derive(Clone)]
pub struct MobileMoneyService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    client: reqwest::Client,
    gateway: Option<ZenoPayConfig>,
    webhook_key: Option<String>,
}

impl MobileMoneyService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        let gateway = match (
            config.zenopay_base_url.as_deref(),
            config.zenopay_api_key.as_deref(),
        ) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => Some(ZenoPayConfig {
                base_url: url.trim_end_matches('/').to_string(),
                api_key: key.to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            db_pool,
            event_sender,
            client: http_client(config.gateway_timeout())?,
            gateway,
            webhook_key: config
                .zenopay_webhook_key
                .clone()
                .filter(|key| !key.is_empty()),
        })
    }

    fn gateway(&self) -> Result<&ZenoPayConfig, ServiceError> {
        self.gateway.as_ref().ok_or_else(|| {
            ServiceError::ServiceUnavailable("Mobile money gateway not configured".to_string())
        })
    }

    async fn track(&self, operation: &str, latency: Duration, error: Option<String>) {
        if let Err(e) =
            record_gateway_metric(&*self.db_pool, PROVIDER, operation, latency, error).await
        {
            warn!(error = %e, operation, "Failed to persist gateway metric");
        }
    }

    async fn read_response(response: reqwest::Response) -> Result<Value, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::ExternalServiceError(format!(
                "Mobile money gateway returned {}: {}",
                status, body
            )));
        }
        let body: Value = response.json().await?;
        match body.get("status").and_then(Value::as_str) {
            Some(s) if !s.eq_ignore_ascii_case("success") => {
                let message = body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(s)
                    .to_string();
                Err(ServiceError::ExternalServiceError(format!(
                    "Mobile money gateway rejected the request: {}",
                    message
                )))
            }
            _ => Ok(body),
        }
    }

    #[instrument(skip(self, input), fields(buyer_phone = %input.buyer_phone))]
    pub async fn create_order(
        &self,
        input: CreateMobileMoneyOrderInput,
    ) -> Result<mobile_money_order::Model, ServiceError> {
        input.validate()?;
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Amount must be greater than zero".to_string(),
            ));
        }
        let amount = input
            .amount
            .round()
            .to_i64()
            .ok_or_else(|| ServiceError::ValidationError("Amount is out of range".to_string()))?;
        let gateway = self.gateway()?;

        let db = &*self.db_pool;
        if let Some(customer_id) = input.customer_id {
            customer::Entity::find_by_id(customer_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Customer {} not found", customer_id))
                })?;
        }

        let order_id = Uuid::new_v4().to_string();
        let buyer_phone = format_phone(&input.buyer_phone);
        let buyer_email = input
            .buyer_email
            .clone()
            .unwrap_or_else(|| default_buyer_email(&buyer_phone));
        let metadata = input.metadata.clone().unwrap_or_else(|| json!({}));

        let started = Instant::now();
        let result = self
            .client
            .post(format!("{}{}", gateway.base_url, CREATE_ORDER_PATH))
            .header("x-api-key", &gateway.api_key)
            .json(&CreateOrderRequest {
                order_id: &order_id,
                buyer_email: &buyer_email,
                buyer_name: &input.buyer_name,
                buyer_phone: &buyer_phone,
                amount,
                metadata: &metadata,
            })
            .send()
            .await;
        let outcome = match result {
            Ok(response) => Self::read_response(response).await,
            Err(e) => Err(ServiceError::from(e)),
        };
        self.track(
            "create_order",
            started.elapsed(),
            outcome.as_ref().err().map(|e| e.to_string()),
        )
        .await;
        outcome?;

        let now = Utc::now();
        let order = mobile_money_order::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            customer_id: Set(input.customer_id),
            sale_id: Set(input.sale_id),
            buyer_email: Set(buyer_email),
            buyer_name: Set(input.buyer_name),
            buyer_phone: Set(buyer_phone),
            amount: Set(input.amount),
            payment_status: Set(GatewayStatus::Pending),
            reference: Set(None),
            metadata: Set(metadata),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(order_id = %order.order_id, amount = %order.amount, "Mobile money order created");
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: &str) -> Result<mobile_money_order::Model, ServiceError> {
        find_order(&*self.db_pool, order_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        status: Option<GatewayStatus>,
        limit: u64,
    ) -> Result<Vec<mobile_money_order::Model>, ServiceError> {
        let mut query = mobile_money_order::Entity::find();
        if let Some(status) = status {
            query = query.filter(mobile_money_order::Column::PaymentStatus.eq(status));
        }
        Ok(query
            .order_by_desc(mobile_money_order::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db_pool)
            .await?)
    }

    /// Polls the gateway and applies whatever status it reports.
    #[instrument(skip(self))]
    pub async fn check_status(&self, order_id: &str) -> Result<StatusUpdate, ServiceError> {
        let gateway = self.gateway()?;
        let order = find_order(&*self.db_pool, order_id).await?;

        let started = Instant::now();
        let result = self
            .client
            .get(format!("{}{}", gateway.base_url, ORDER_STATUS_PATH))
            .query(&[("order_id", order.order_id.as_str())])
            .header("x-api-key", &gateway.api_key)
            .send()
            .await;
        let outcome = match result {
            Ok(response) => Self::read_response(response).await.and_then(|body| {
                parse_status_response(&body).ok_or_else(|| {
                    ServiceError::ExternalServiceError(
                        "Mobile money gateway returned no recognizable payment status"
                            .to_string(),
                    )
                })
            }),
            Err(e) => Err(ServiceError::from(e)),
        };
        self.track(
            "order_status",
            started.elapsed(),
            outcome.as_ref().err().map(|e| e.to_string()),
        )
        .await;
        let (status, reference) = outcome?;

        self.apply_status(&order.order_id, status, reference, None)
            .await
    }

    /// Applies a gateway callback after checking its `x-api-key`.
    #[instrument(skip(self, api_key, payload), fields(order_id = %payload.order_id))]
    pub async fn handle_webhook(
        &self,
        api_key: Option<&str>,
        payload: MobileMoneyWebhook,
    ) -> Result<StatusUpdate, ServiceError> {
        let authorized = match (self.webhook_key.as_deref(), api_key) {
            (Some(expected), Some(given)) => constant_time_eq(expected, given),
            _ => false,
        };
        if !authorized {
            warn!("Rejected mobile money webhook with invalid api key");
            return Err(ServiceError::Unauthorized(
                "Invalid webhook api key".to_string(),
            ));
        }

        let status = GatewayStatus::parse(&payload.payment_status).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Unknown payment status '{}'",
                payload.payment_status
            ))
        })?;

        self.apply_status(&payload.order_id, status, payload.reference, payload.metadata)
            .await
    }

    /// Moves an order to `status`. Terminal statuses are final, so repeated or
    /// late deliveries leave the order untouched.
    async fn apply_status(
        &self,
        order_id: &str,
        status: GatewayStatus,
        reference: Option<String>,
        metadata: Option<Value>,
    ) -> Result<StatusUpdate, ServiceError> {
        let key = order_id.to_string();
        let (update, old_status) = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let mut query = mobile_money_order::Entity::find()
                    .filter(mobile_money_order::Column::OrderId.eq(key.as_str()));
                if txn.get_database_backend() == DbBackend::Postgres {
                    query = query.lock_exclusive();
                }
                let order = query.one(txn).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!("Mobile money order {} not found", key))
                })?;
                let old_status = order.payment_status;

                if old_status == status {
                    return Ok((
                        StatusUpdate {
                            order,
                            changed: false,
                            payment_id: None,
                        },
                        old_status,
                    ));
                }
                if old_status.is_terminal() {
                    warn!(
                        order_id = %key,
                        current = %old_status,
                        reported = %status,
                        "Ignoring status change on a settled mobile money order"
                    );
                    return Ok((
                        StatusUpdate {
                            order,
                            changed: false,
                            payment_id: None,
                        },
                        old_status,
                    ));
                }

                let mut model: mobile_money_order::ActiveModel = order.clone().into();
                model.payment_status = Set(status);
                if reference.is_some() {
                    model.reference = Set(reference.clone());
                }
                if let Some(metadata) = metadata {
                    model.metadata = Set(metadata);
                }
                let order = model.update(txn).await?;

                let payment_id = match (status, order.customer_id) {
                    (GatewayStatus::Completed, Some(customer_id)) => {
                        let payment = customer_payment::ActiveModel {
                            id: Set(Uuid::new_v4()),
                            customer_id: Set(customer_id),
                            device_id: Set(None),
                            sale_id: Set(order.sale_id),
                            amount: Set(order.amount),
                            method: Set(PaymentMethod::MobileMoney),
                            payment_type: Set(PaymentType::Payment),
                            status: Set(PaymentStatus::Completed),
                            reference: Set(Some(
                                order.reference.clone().unwrap_or_else(|| order.order_id.clone()),
                            )),
                            created_by: Set(PROVIDER.to_string()),
                            created_at: Set(Utc::now()),
                        }
                        .insert(txn)
                        .await?;
                        Some(payment.id)
                    }
                    _ => None,
                };

                Ok((
                    StatusUpdate {
                        order,
                        changed: true,
                        payment_id,
                    },
                    old_status,
                ))
            })
        })
        .await?;

        if update.changed {
            self.event_sender
                .send_or_log(Event::MobileMoneyStatusChanged {
                    order_id: update.order.order_id.clone(),
                    old_status: old_status.to_string(),
                    new_status: update.order.payment_status.to_string(),
                })
                .await;
            if let Some(payment_id) = update.payment_id {
                self.event_sender
                    .send_or_log(Event::PaymentRecorded(payment_id))
                    .await;
            }
            info!(
                order_id = %update.order.order_id,
                from = %old_status,
                to = %update.order.payment_status,
                "Mobile money order updated"
            );
        }
        Ok(update)
    }
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    order_id: &str,
) -> Result<mobile_money_order::Model, ServiceError> {
    mobile_money_order::Entity::find()
        .filter(mobile_money_order::Column::OrderId.eq(order_id))
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Mobile money order {} not found", order_id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compares_keys_exactly() {
        assert!(constant_time_eq("secret-key", "secret-key"));
        assert!(!constant_time_eq("secret-key", "secret-kez"));
        assert!(!constant_time_eq("secret", "secret-key"));
    }

    #[test]
    fn reads_status_from_data_array() {
        let body = json!({
            "result": "SUCCESS",
            "data": [{ "order_id": "abc", "payment_status": "COMPLETED", "reference": "0936183435" }]
        });
        assert_eq!(
            parse_status_response(&body),
            Some((GatewayStatus::Completed, Some("0936183435".to_string())))
        );
    }

    #[test]
    fn reads_flat_status_and_rejects_unknown() {
        let flat = json!({ "payment_status": "pending" });
        assert_eq!(
            parse_status_response(&flat),
            Some((GatewayStatus::Pending, None))
        );
        assert_eq!(
            parse_status_response(&json!({ "payment_status": "WAITING" })),
            None
        );
    }

    #[test]
    fn buyer_email_falls_back_to_phone() {
        assert_eq!(default_buyer_email("0712345678"), "255712345678@mobile.money");
    }
}
