use crate::{db::DbPool, entities::setting, errors::ServiceError};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

/// Well-known keys read by the SMS sender.
pub mod keys {
    pub const SMS_PROVIDER_API_KEY: &str = "sms_provider_api_key";
    pub const SMS_API_URL: &str = "sms_api_url";
    pub const SMS_PROVIDER_PASSWORD: &str = "sms_provider_password";
}

// Lowercase snake case, optionally dotted: `sms_api_url`, `shop.receipt_footer`
static KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*(\.[a-z0-9_]+)*$").unwrap());

pub fn is_valid_key(key: &str) -> bool {
    key.len() <= 100 && KEY_PATTERN.is_match(key)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct SetSettingInput {
    #[validate(length(max = 4096))]
    pub value: String,
}

/// Runtime key/value settings
#[derive(Clone)]
pub struct SettingsService {
    db_pool: Arc<DbPool>,
}

impl SettingsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, key: &str) -> Result<setting::Model, ServiceError> {
        setting::Entity::find_by_id(key.to_string())
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Setting {} not found", key)))
    }

    /// Inserts the key or overwrites its value.
    #[instrument(skip(self, value))]
    pub async fn set(&self, key: &str, value: String) -> Result<setting::Model, ServiceError> {
        let key = key.trim();
        if !is_valid_key(key) {
            return Err(ServiceError::ValidationError(format!(
                "Invalid setting key '{}'",
                key
            )));
        }

        let model = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value),
            updated_at: Set(Utc::now()),
        };
        setting::Entity::insert(model)
            .on_conflict(
                OnConflict::column(setting::Column::Key)
                    .update_columns([setting::Column::Value, setting::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db_pool)
            .await?;

        info!(key, "Setting saved");
        self.get(key).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<setting::Model>, ServiceError> {
        Ok(setting::Entity::find()
            .order_by_asc(setting::Column::Key)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let existing = self.get(key).await?;
        let model: setting::ActiveModel = existing.into();
        model.delete(&*self.db_pool).await?;
        info!(key, "Setting deleted");
        Ok(())
    }

    /// Values for the given keys that are present and non-blank.
    pub async fn values(&self, keys: &[&str]) -> Result<HashMap<String, String>, ServiceError> {
        load_values(&*self.db_pool, keys).await
    }
}

async fn load_values<C: ConnectionTrait>(
    conn: &C,
    keys: &[&str],
) -> Result<HashMap<String, String>, ServiceError> {
    let rows = setting::Entity::find()
        .filter(setting::Column::Key.is_in(keys.iter().copied()))
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter(|row| !row.value.trim().is_empty())
        .map(|row| (row.key, row.value))
        .collect())
}
