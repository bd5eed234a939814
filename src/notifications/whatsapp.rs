use super::format_phone;
use crate::{config::AppConfig, errors::ServiceError, metrics};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

const CHAT_SUFFIX: &str = "@c.us";

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SendWhatsAppInput {
    #[validate(length(min = 9, max = 40))]
    pub phone: String,
    #[validate(length(min = 1, max = 4096, message = "Message cannot be empty"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WhatsAppSent {
    pub chat_id: String,
    pub id_message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageResponse {
    id_message: String,
}

#[derive(Debug, Clone)]
struct GreenApiConfig {
    api_url: String,
    instance_id: String,
    token: String,
}

/// Turns a phone number into a Green API chat id.
pub fn chat_id(phone: &str) -> String {
    if phone.ends_with(CHAT_SUFFIX) {
        phone.to_string()
    } else {
        format!("{}{}", format_phone(phone), CHAT_SUFFIX)
    }
}

/// Green API client for outbound WhatsApp text messages.
#[derive(Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    config: Option<GreenApiConfig>,
}

impl WhatsAppClient {
    pub fn new(config: &AppConfig) -> Result<Self, ServiceError> {
        let green = match (
            config.green_api_url.as_deref(),
            config.green_api_instance_id.as_deref(),
            config.green_api_token.as_deref(),
        ) {
            (Some(url), Some(id), Some(token))
                if !url.is_empty() && !id.is_empty() && !token.is_empty() =>
            {
                Some(GreenApiConfig {
                    api_url: url.trim_end_matches('/').to_string(),
                    instance_id: id.to_string(),
                    token: token.to_string(),
                })
            }
            _ => None,
        };

        Ok(Self {
            client: super::http_client(config.gateway_timeout())?,
            config: green,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    #[instrument(skip(self, message))]
    pub async fn send_text(&self, phone: &str, message: &str) -> Result<WhatsAppSent, ServiceError> {
        let config = self.config.as_ref().ok_or_else(|| {
            ServiceError::ServiceUnavailable("WhatsApp provider not configured".to_string())
        })?;

        let chat_id = chat_id(phone);
        let url = format!(
            "{}/waInstance{}/sendMessage/{}",
            config.api_url, config.instance_id, config.token
        );

        let started = Instant::now();
        let result = self
            .client
            .post(&url)
            .json(&SendMessageRequest {
                chat_id: &chat_id,
                message,
            })
            .send()
            .await;

        let outcome = match result {
            Ok(response) if response.status().is_success() => response
                .json::<SendMessageResponse>()
                .await
                .map_err(|e| {
                    ServiceError::ExternalServiceError(format!(
                        "Unexpected WhatsApp response: {}",
                        e
                    ))
                }),
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                Err(ServiceError::ExternalServiceError(format!(
                    "WhatsApp API returned {}: {}",
                    status, body
                )))
            }
            Err(e) => Err(ServiceError::from(e)),
        };

        metrics::record_gateway_call(
            "green_api",
            "send_message",
            outcome.is_ok(),
            started.elapsed(),
        );

        match outcome {
            Ok(sent) => {
                info!(%chat_id, id_message = %sent.id_message, "WhatsApp message sent");
                Ok(WhatsAppSent {
                    chat_id,
                    id_message: sent.id_message,
                })
            }
            Err(e) => {
                warn!(%chat_id, error = %e, "WhatsApp message failed");
                Err(e)
            }
        }
    }
}
