//! Property-based tests for the pure pricing, loyalty and formatting rules.

use lats_api::{
    entities::{customer::LoyaltyTier, sale::DiscountType},
    notifications::{format_phone, templates::format_money},
    services::{loyalty::points_for_purchase, sales::compute_totals},
};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn shillings() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_000).prop_map(Decimal::from)
}

fn lines_strategy() -> impl Strategy<Value = Vec<(Decimal, i32)>> {
    prop::collection::vec(((1i64..2_000_000).prop_map(Decimal::from), 1i32..20), 1..6)
}

fn discount_strategy() -> impl Strategy<Value = (Option<DiscountType>, Option<Decimal>)> {
    prop_oneof![
        Just((None, None)),
        (0i64..150).prop_map(|v| (Some(DiscountType::Percentage), Some(Decimal::from(v)))),
        (0i64..5_000_000).prop_map(|v| (Some(DiscountType::Fixed), Some(Decimal::from(v)))),
    ]
}

fn tier_rank(tier: LoyaltyTier) -> u8 {
    match tier {
        LoyaltyTier::Bronze => 0,
        LoyaltyTier::Silver => 1,
        LoyaltyTier::Gold => 2,
        LoyaltyTier::Platinum => 3,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn tiers_never_drop_as_points_grow(a in 0i32..20_000, b in 0i32..20_000) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(tier_rank(LoyaltyTier::for_points(low)) <= tier_rank(LoyaltyTier::for_points(high)));
    }

    #[test]
    fn tier_threshold_is_met(points in 0i32..20_000) {
        let tier = LoyaltyTier::for_points(points);
        prop_assert!(points >= tier.min_points());
    }

    #[test]
    fn purchase_points_are_one_per_thousand(total in shillings()) {
        let points = points_for_purchase(total);
        prop_assert!(points >= 0);
        prop_assert!(Decimal::from(points) * Decimal::from(1000) <= total);
        prop_assert!(Decimal::from(points + 1) * Decimal::from(1000) > total);
    }

    #[test]
    fn sale_totals_stay_consistent(
        lines in lines_strategy(),
        (discount_type, discount_value) in discount_strategy(),
        tax_pct in 0i64..30,
    ) {
        let tax_rate = Decimal::new(tax_pct, 2);
        let totals = compute_totals(&lines, discount_type, discount_value, tax_rate).unwrap();

        let expected_subtotal: Decimal = lines
            .iter()
            .map(|(price, qty)| *price * Decimal::from(*qty))
            .sum();
        prop_assert_eq!(totals.subtotal, expected_subtotal);
        prop_assert!(totals.discount >= Decimal::ZERO);
        prop_assert!(totals.discount <= totals.subtotal);
        prop_assert!(totals.tax >= Decimal::ZERO);
        prop_assert_eq!(totals.total, totals.subtotal - totals.discount + totals.tax);
    }

    #[test]
    fn money_formatting_keeps_the_digits(amount in -10_000_000i64..10_000_000) {
        let text = format_money(Decimal::from(amount));
        prop_assert!(text.starts_with("TZS "));
        let digits: String = text.chars().filter(char::is_ascii_digit).collect();
        prop_assert_eq!(digits, amount.unsigned_abs().to_string());
        prop_assert_eq!(text.contains('-'), amount < 0);
    }

    #[test]
    fn local_phones_gain_the_country_code(rest in "[1-9][0-9]{8}") {
        let formatted = format_phone(&format!("0{}", rest));
        prop_assert_eq!(formatted, format!("255{}", rest));
    }
}
