//! Outbound customer messaging: SMS through the provider proxy and
//! WhatsApp through Green API, plus the message templates both use.

pub mod sms;
pub mod templates;
pub mod whatsapp;

pub use sms::SmsService;
pub use whatsapp::WhatsAppClient;

use crate::errors::ServiceError;
use std::time::Duration;

/// HTTP client for outbound gateway calls, bounded by `timeout`.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, ServiceError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::InternalError(format!("failed to build HTTP client: {}", e)))
}

/// Keeps the digits of a phone number and rewrites a local `0` prefix to `255`.
pub fn format_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    match digits.strip_prefix('0') {
        Some(rest) => format!("255{}", rest),
        None => digits,
    }
}

#[cfg(test)]
mod tests {
    use super::{format_phone, http_client};
    use std::time::Duration;

    #[test]
    fn format_phone_variants() {
        assert_eq!(format_phone("0712345678"), "255712345678");
        assert_eq!(format_phone("+255 712-345-678"), "255712345678");
        assert_eq!(format_phone("255700000001"), "255700000001");
        assert_eq!(format_phone(""), "");
    }

    #[test]
    fn gateway_client_builds() {
        assert!(http_client(Duration::from_secs(5)).is_ok());
    }
}
