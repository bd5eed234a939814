//! Customer-facing message texts.

use crate::entities::{device::DeviceStatus, sale, sale_item};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

const SIGNATURE: &str = "- LATS CHANCE";

/// Formats an amount as whole shillings with thousands separators, e.g. `TZS 15,000`.
pub fn format_money(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("TZS {}{}", sign, grouped)
}

/// Swahili status update for a repair, falling back to a generic update.
pub fn status_sms_text(status: DeviceStatus, customer_name: &str, device_name: &str) -> String {
    let body = match status {
        DeviceStatus::Assigned => format!(
            "Hujambo {}! Kifaa chako {} kimepewa technician. Tutakujulisha mwendelezo wa ukarabati.",
            customer_name, device_name
        ),
        DeviceStatus::DiagnosisStarted => format!(
            "Hujambo {}! Kifaa chako {} kimeanza diagnosis. Technician anachunguza tatizo. Tutakujulisha matokeo.",
            customer_name, device_name
        ),
        DeviceStatus::AwaitingParts => format!(
            "Hujambo {}! Kifaa chako {} kinahitaji spare parts. Tunasubiri parts kufika, tutakujulisha.",
            customer_name, device_name
        ),
        DeviceStatus::InRepair => format!(
            "Hujambo {}! Kifaa chako {} kinakarabatiwa. Technician anafanya kazi, tutakujulisha mwendelezo.",
            customer_name, device_name
        ),
        DeviceStatus::ReassembledTesting => format!(
            "Hujambo {}! Kifaa chako {} kimekarabatiwa na kinajaribiwa. Karibu kukichukua.",
            customer_name, device_name
        ),
        DeviceStatus::RepairComplete => format!(
            "Hujambo {}! Kifaa chako {} kimekarabatiwa! Unaweza kuja kukichukua.",
            customer_name, device_name
        ),
        DeviceStatus::ReturnedToCustomerCare => format!(
            "Hujambo {}! Kifaa chako {} kimekarabatiwa na kiko tayari kuchukuliwa. Karibu ofisini.",
            customer_name, device_name
        ),
        DeviceStatus::Done => format!(
            "Asante {}! Kifaa chako {} kimechukuliwa. Karibu tena!",
            customer_name, device_name
        ),
        DeviceStatus::Failed => format!(
            "Hujambo {}. Kuna tatizo na kifaa chako {}. Tunaomba uje ofisini kujadili.",
            customer_name, device_name
        ),
        DeviceStatus::PartsArrived => format!(
            "Hujambo {}! Kuna update kuhusu kifaa chako {}.",
            customer_name, device_name
        ),
    };
    format!("{} {}", body, SIGNATURE)
}

pub fn device_received_sms_text(
    customer_name: &str,
    device_name: &str,
    expected_return: NaiveDate,
) -> String {
    format!(
        "Hello {}, we have received your {} for repair. Expected return date: {}. {}",
        customer_name,
        device_name,
        expected_return.format("%d/%m/%Y"),
        SIGNATURE
    )
}

pub fn device_ready_sms_text(customer_name: &str, device_name: &str) -> String {
    format!(
        "Hello {}, your {} repair is complete! Please visit us to collect your device. {}",
        customer_name, device_name, SIGNATURE
    )
}

/// Receipt SMS sent to the customer after a sale.
pub fn sale_sms_text(sale: &sale::Model, items: &[sale_item::Model]) -> String {
    let item_list = items
        .iter()
        .map(|item| format!("{} x{}", item.product_name, item.quantity))
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        "Thank you for your purchase!".to_string(),
        format!("Sale #{}", sale.sale_number),
        format!("Items: {}", item_list),
        format!("Total: {}", format_money(sale.total_amount)),
    ];
    if sale.discount_amount > Decimal::ZERO {
        lines.push(format!("Discount: {}", format_money(sale.discount_amount)));
    }
    lines.push(format!("Payment: {}", sale.payment_type_label()));
    lines.push("Thank you for choosing us!".to_string());
    lines.join("\n")
}
