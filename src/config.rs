use crate::services::payments::MAX_WINDOW_HOURS;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "TZS";
const DEFAULT_SMS_SENDER_ID: &str = "INAUZWA";

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret key (minimum 32 characters)
    #[validate(custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// JWT expiration time in seconds
    pub jwt_expiration: usize,

    /// JWT issuer name
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Tax applied to the discounted sale subtotal (0.18 = 18%)
    #[serde(default)]
    #[validate(custom = "validate_tax_rate")]
    pub sales_tax_rate: Decimal,

    /// Currency used for sales, purchase orders and receipts
    #[serde(default = "default_currency")]
    pub currency: String,

    // ========== Mobile money (ZenoPay) ==========
    /// Base URL of the ZenoPay API
    #[serde(default)]
    pub zenopay_base_url: Option<String>,

    /// API key sent as `x-api-key` on gateway requests
    #[serde(default)]
    pub zenopay_api_key: Option<String>,

    /// Key the gateway presents on webhook callbacks
    #[serde(default)]
    pub zenopay_webhook_key: Option<String>,

    /// Timeout for gateway calls (seconds)
    #[serde(default = "default_gateway_timeout_secs")]
    pub gateway_timeout_secs: u64,

    // ========== WhatsApp (Green API) ==========
    #[serde(default)]
    pub green_api_url: Option<String>,
    #[serde(default)]
    pub green_api_instance_id: Option<String>,
    #[serde(default)]
    pub green_api_token: Option<String>,

    // ========== SMS ==========
    /// SMS proxy endpoint that relays to the provider
    #[serde(default)]
    pub sms_proxy_url: Option<String>,

    /// Sender id shown to recipients
    #[serde(default = "default_sms_sender_id")]
    pub sms_sender_id: String,

    /// Payment security monitor look-back window (hours)
    #[serde(default = "default_payment_monitor_window_hours")]
    pub payment_monitor_window_hours: i64,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            sales_tax_rate: Decimal::ZERO,
            currency: default_currency(),
            zenopay_base_url: None,
            zenopay_api_key: None,
            zenopay_webhook_key: None,
            gateway_timeout_secs: default_gateway_timeout_secs(),
            green_api_url: None,
            green_api_instance_id: None,
            green_api_token: None,
            sms_proxy_url: None,
            sms_sender_id: default_sms_sender_id(),
            payment_monitor_window_hours: default_payment_monitor_window_hours(),
        }
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Production always logs JSON
    pub fn json_logs(&self) -> bool {
        self.log_json || self.is_production()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Cross-field checks that the derive validators cannot express
    pub fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_development() && !self.has_cors_allowed_origins() && !self.cors_allow_any_origin
        {
            let mut err = ValidationError::new("cors_allowed_origins");
            err.message = Some(
                "Set cors_allowed_origins or cors_allow_any_origin outside development".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if self.zenopay_base_url.is_some() && self.zenopay_api_key.is_none() {
            let mut err = ValidationError::new("zenopay_api_key");
            err.message = Some("zenopay_api_key is required when zenopay_base_url is set".into());
            errors.add("zenopay_api_key", err);
        }

        if !(1..=MAX_WINDOW_HOURS).contains(&self.payment_monitor_window_hours) {
            let mut err = ValidationError::new("payment_monitor_window_hours");
            err.message = Some(
                format!("payment_monitor_window_hours must be between 1 and {}", MAX_WINDOW_HOURS)
                    .into(),
            );
            errors.add("payment_monitor_window_hours", err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    10
}

fn default_sms_sender_id() -> String {
    DEFAULT_SMS_SENDER_ID.to_string()
}

fn default_payment_monitor_window_hours() -> i64 {
    6
}

fn default_auth_issuer() -> String {
    "lats-auth".to_string()
}

fn default_auth_audience() -> String {
    "lats-api".to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 32 {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be at least 32 characters".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 3] = ["your-secret-key", "default-secret-key", "changeme"];
    let lower = trimmed.to_ascii_lowercase();
    if DISALLOWED.iter().any(|bad| lower.contains(bad)) {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    Ok(())
}

fn validate_tax_rate(rate: &Decimal) -> Result<(), ValidationError> {
    if rate.is_sign_negative() || *rate > Decimal::ONE {
        let mut err = ValidationError::new("sales_tax_rate");
        err.message = Some("sales_tax_rate must be between 0 and 1".into());
        return Err(err);
    }
    Ok(())
}

fn validate_event_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("event_channel_capacity");
        err.message = Some("event_channel_capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("lats_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // jwt_secret has no default and must come from a file or APP__JWT_SECRET
    let config = Config::builder()
        .set_default("database_url", "sqlite://lats.db?mode=rwc")?
        .set_default("jwt_expiration", 3600)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to a random string of at least 32 characters.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://lats.db?mode=memory".into(),
            "q8Zt2vLw9PxR4mNc7KbYh3JfDs6GaUe1".into(),
            3600,
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_allows_override_flag() {
        let mut cfg = base_config();
        cfg.cors_allow_any_origin = true;
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://pos.lats.co.tz".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn development_allows_permissive_by_default() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn gateway_url_requires_api_key() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.zenopay_base_url = Some("https://zenoapi.com".into());
        assert!(cfg.validate_additional_constraints().is_err());
        cfg.zenopay_api_key = Some("zp-key".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn rejects_short_or_placeholder_secret() {
        let mut cfg = base_config();
        cfg.jwt_secret = "short".into();
        assert!(cfg.validate().is_err());
        cfg.jwt_secret = "changeme-changeme-changeme-changeme".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tax_rate_must_be_a_fraction() {
        let mut cfg = base_config();
        cfg.sales_tax_rate = dec!(0.18);
        assert!(cfg.validate().is_ok());
        cfg.sales_tax_rate = dec!(18);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn production_logs_json() {
        let mut cfg = base_config();
        assert!(cfg.json_logs());
        cfg.environment = "development".into();
        assert!(!cfg.json_logs());
        cfg.log_json = true;
        assert!(cfg.json_logs());
    }

    #[test]
    fn event_channel_needs_capacity() {
        let mut cfg = base_config();
        cfg.event_channel_capacity = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn monitor_window_is_bounded() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.payment_monitor_window_hours = MAX_WINDOW_HOURS;
        assert!(cfg.validate_additional_constraints().is_ok());
        cfg.payment_monitor_window_hours = MAX_WINDOW_HOURS + 1;
        assert!(cfg.validate_additional_constraints().is_err());
        cfg.payment_monitor_window_hours = 0;
        assert!(cfg.validate_additional_constraints().is_err());
    }
}
