use super::format_phone;
use crate::{
    config::AppConfig,
    db::DbPool,
    entities::sms_log::{self, SmsStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::settings::{keys, SettingsService},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Numbers with this prefix never reach the provider.
pub const TEST_NUMBER_PREFIX: &str = "255700";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendSmsInput {
    #[validate(length(min = 9, max = 20))]
    pub phone: String,
    #[validate(length(min = 1, max = 918, message = "Message cannot be empty"))]
    pub message: String,
    pub device_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkSmsInput {
    #[validate(length(min = 1, message = "At least one recipient is required"))]
    pub phones: Vec<String>,
    #[validate(length(min = 1, max = 918, message = "Message cannot be empty"))]
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct BulkSmsResult {
    pub sent: u32,
    pub failed: u32,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SmsStats {
    pub total: u64,
    pub sent: u64,
    pub failed: u64,
    pub pending: u64,
    pub delivered: u64,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
}

/// Body relayed to the SMS proxy.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProxyRequest<'a> {
    phone: &'a str,
    message: &'a str,
    api_url: &'a str,
    api_key: &'a str,
    api_password: &'a str,
    sender_id: &'a str,
}

#[derive(Debug)]
struct Credentials {
    proxy_url: String,
    api_url: String,
    api_key: String,
    api_password: String,
}

/// Sends SMS through the provider proxy and keeps the delivery log.
#[derive(Clone)]
pub struct SmsService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: Arc<SettingsService>,
    client: reqwest::Client,
    proxy_url: Option<String>,
    sender_id: String,
}

impl SmsService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: Arc<SettingsService>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            db_pool,
            event_sender,
            settings,
            client: super::http_client(config.gateway_timeout())?,
            proxy_url: config.sms_proxy_url.clone(),
            sender_id: config.sms_sender_id.clone(),
        })
    }

    async fn credentials(&self) -> Result<Credentials, ServiceError> {
        let not_configured =
            || ServiceError::ServiceUnavailable("SMS provider not configured".to_string());

        let proxy_url = self
            .proxy_url
            .clone()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(not_configured)?;

        let mut values = self
            .settings
            .values(&[
                keys::SMS_PROVIDER_API_KEY,
                keys::SMS_API_URL,
                keys::SMS_PROVIDER_PASSWORD,
            ])
            .await?;

        let api_key = values
            .remove(keys::SMS_PROVIDER_API_KEY)
            .ok_or_else(not_configured)?;
        let api_url = values.remove(keys::SMS_API_URL).ok_or_else(not_configured)?;
        let api_password = values
            .remove(keys::SMS_PROVIDER_PASSWORD)
            .unwrap_or_default();

        Ok(Credentials {
            proxy_url,
            api_url,
            api_key,
            api_password,
        })
    }

    /// Sends one message. The attempt is logged whether or not it succeeds.
    #[instrument(skip(self, message))]
    pub async fn send(
        &self,
        phone: &str,
        message: &str,
        device_id: Option<Uuid>,
        actor: Option<&str>,
    ) -> Result<sms_log::Model, ServiceError> {
        if message.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Message cannot be empty".to_string(),
            ));
        }
        let phone = format_phone(phone);
        if phone.len() < 9 {
            return Err(ServiceError::ValidationError(format!(
                "Invalid phone number: {}",
                phone
            )));
        }

        let credentials = self.credentials().await?;

        let outcome = if phone.starts_with(TEST_NUMBER_PREFIX) {
            info!("Test number, skipping provider call");
            Ok(())
        } else {
            self.deliver(&credentials, &phone, message).await
        };

        let log = self
            .write_log(&phone, message, device_id, actor, outcome.as_ref().err())
            .await?;

        let success = outcome.is_ok();
        metrics::record_sms(success);
        self.event_sender
            .send_or_log(Event::SmsSent {
                phone: phone.clone(),
                success,
            })
            .await;

        match outcome {
            Ok(()) => {
                info!(log_id = %log.id, "SMS sent");
                Ok(log)
            }
            Err(reason) => Err(ServiceError::ExternalServiceError(reason)),
        }
    }

    async fn deliver(
        &self,
        credentials: &Credentials,
        phone: &str,
        message: &str,
    ) -> Result<(), String> {
        let body = ProxyRequest {
            phone,
            message,
            api_url: &credentials.api_url,
            api_key: &credentials.api_key,
            api_password: &credentials.api_password,
            sender_id: &self.sender_id,
        };

        let started = Instant::now();
        let result = self
            .client
            .post(&credentials.proxy_url)
            .json(&body)
            .send()
            .await;

        let outcome = match result {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                Err(format!("SMS proxy returned {}: {}", status, text))
            }
            Err(e) => Err(format!("SMS proxy request failed: {}", e)),
        };

        metrics::record_gateway_call("sms_proxy", "send", outcome.is_ok(), started.elapsed());
        if let Err(reason) = &outcome {
            warn!(%reason, "SMS delivery failed");
        }
        outcome
    }

    async fn write_log(
        &self,
        phone: &str,
        message: &str,
        device_id: Option<Uuid>,
        actor: Option<&str>,
        error: Option<&String>,
    ) -> Result<sms_log::Model, ServiceError> {
        let now = Utc::now();
        let (status, sent_at) = match error {
            None => (SmsStatus::Sent, Some(now)),
            Some(_) => (SmsStatus::Failed, None),
        };

        let log = sms_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            phone_number: Set(phone.to_string()),
            message: Set(message.to_string()),
            status: Set(status),
            error_message: Set(error.cloned()),
            sent_at: Set(sent_at),
            sent_by: Set(actor.map(str::to_string)),
            device_id: Set(device_id),
            cost: Set(None),
            created_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?;
        Ok(log)
    }

    /// Sends the same message to each recipient in turn.
    #[instrument(skip(self, phones, message), fields(recipients = phones.len()))]
    pub async fn send_bulk(
        &self,
        phones: &[String],
        message: &str,
        actor: Option<&str>,
    ) -> Result<BulkSmsResult, ServiceError> {
        // Fail fast instead of logging one rejection per recipient.
        self.credentials().await?;

        let mut result = BulkSmsResult::default();
        for phone in phones {
            match self.send(phone, message, None, actor).await {
                Ok(_) => result.sent += 1,
                Err(e) => {
                    result.failed += 1;
                    result.errors.push(format!("{}: {}", phone, e));
                }
            }
        }

        info!(sent = result.sent, failed = result.failed, "Bulk SMS finished");
        Ok(result)
    }

    /// Best-effort send used by other flows; failures are only logged.
    pub async fn notify(&self, phone: &str, message: &str, device_id: Option<Uuid>, actor: &str) {
        if let Err(e) = self.send(phone, message, device_id, Some(actor)).await {
            warn!(error = %e, "Customer notification not sent");
        }
    }

    #[instrument(skip(self))]
    pub async fn list_logs(&self, limit: u64) -> Result<Vec<sms_log::Model>, ServiceError> {
        Ok(sms_log::Entity::find()
            .order_by_desc(sms_log::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn sms_stats(&self) -> Result<SmsStats, ServiceError> {
        let db = &*self.db_pool;
        let count_status = |status: SmsStatus| {
            sms_log::Entity::find()
                .filter(sms_log::Column::Status.eq(status))
                .count(db)
        };

        let total = sms_log::Entity::find().count(db).await?;
        let sent = count_status(SmsStatus::Sent).await?;
        let failed = count_status(SmsStatus::Failed).await?;
        let pending = count_status(SmsStatus::Pending).await?;
        let delivered = count_status(SmsStatus::Delivered).await?;

        let costs: Vec<Decimal> = sms_log::Entity::find()
            .select_only()
            .column(sms_log::Column::Cost)
            .filter(sms_log::Column::Cost.is_not_null())
            .into_tuple()
            .all(db)
            .await?;

        Ok(SmsStats {
            total,
            sent,
            failed,
            pending,
            delivered,
            total_cost: costs.into_iter().sum(),
        })
    }
}
