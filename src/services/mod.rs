// Customers & loyalty
pub mod loyalty;

// Inventory & point of sale
pub mod inventory;
pub mod sales;

// Procurement
pub mod purchase_orders;

// Repairs & diagnostics
pub mod diagnostics;
pub mod repair_workflow;
pub mod repairs;

// Payments
pub mod mobile_money;
pub mod payment_monitor;
pub mod payments;

// Finance
pub mod finance;

pub mod settings;

use crate::errors::ServiceError;
use rust_decimal::Decimal;

/// Most units one sale, order, receipt or repair line may carry.
pub const MAX_LINE_QUANTITY: i32 = 100_000;

/// Largest unit price or cost accepted on a line.
pub const MAX_UNIT_PRICE: i64 = 1_000_000_000_000;

/// Rejects negative prices and prices above [`MAX_UNIT_PRICE`].
pub(crate) fn check_price(price: Decimal, label: &str) -> Result<(), ServiceError> {
    if price.is_sign_negative() {
        return Err(ServiceError::ValidationError(format!(
            "{} cannot be negative",
            label
        )));
    }
    if price > Decimal::from(MAX_UNIT_PRICE) {
        return Err(ServiceError::ValidationError(format!(
            "{} cannot exceed {}",
            label, MAX_UNIT_PRICE
        )));
    }
    Ok(())
}

/// `price * quantity`, or a validation error when it does not fit.
pub(crate) fn line_total(price: Decimal, quantity: i32) -> Result<Decimal, ServiceError> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| ServiceError::ValidationError("Line total is out of range".to_string()))
}

/// Sums amounts, failing instead of overflowing.
pub(crate) fn checked_sum<I>(amounts: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts.into_iter().try_fold(Decimal::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| ServiceError::ValidationError("Total is out of range".to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    #[test]
    fn price_bounds() {
        assert!(check_price(dec!(0), "Unit price").is_ok());
        assert!(check_price(Decimal::from(MAX_UNIT_PRICE), "Unit price").is_ok());
        assert_matches!(
            check_price(dec!(-1), "Unit price"),
            Err(ServiceError::ValidationError(msg)) if msg == "Unit price cannot be negative"
        );
        assert_matches!(
            check_price(Decimal::from(MAX_UNIT_PRICE) + dec!(0.01), "Cost price"),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn overflowing_amounts_are_rejected() {
        assert_eq!(line_total(dec!(1500), 3).unwrap(), dec!(4500));
        assert_matches!(
            line_total(Decimal::MAX / dec!(2), 3),
            Err(ServiceError::ValidationError(_))
        );
        assert_eq!(checked_sum([dec!(1), dec!(2)]).unwrap(), dec!(3));
        assert_matches!(
            checked_sum([Decimal::MAX, dec!(1)]),
            Err(ServiceError::ValidationError(_))
        );
    }
}
