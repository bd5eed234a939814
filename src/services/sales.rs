use crate::{
    db::{with_transaction, DbPool},
    entities::{
        customer, product, product_variant, receipt,
        sale::{self, DiscountType, SaleStatus},
        sale_item,
        stock_movement::MovementType,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    notifications::SmsService,
    services::{
        check_price, checked_sum,
        inventory::{apply_stock_movement, insufficient_stock_message, lock_variant, stock_event, StockChange},
        line_total,
        loyalty::{accrue_purchase, points_events, PointsUpdate},
    },
};
use chrono::Utc;
use rand::Rng;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub use crate::notifications::templates::{format_money, sale_sms_text};

pub const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PaymentMethodInput {
    /// cash, card, mobile_money, ...
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub method_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    #[schema(value_type = String, example = "29000")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SaleLineInput {
    pub variant_id: Uuid,
    #[validate(range(min = 1, max = 100000, message = "Quantity must be between 1 and 100000"))]
    pub quantity: i32,
    /// Overrides the variant price when present
    #[schema(value_type = Option<String>)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ProcessSaleInput {
    pub customer_id: Option<Uuid>,
    #[validate(length(min = 1, message = "Sale must contain at least one item"))]
    #[validate]
    pub items: Vec<SaleLineInput>,
    pub discount_type: Option<DiscountType>,
    #[schema(value_type = Option<String>)]
    pub discount_value: Option<Decimal>,
    pub payment_method: PaymentMethodInput,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// A sale with its lines and receipt.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetails {
    #[serde(flatten)]
    pub sale: sale::Model,
    pub items: Vec<sale_item::Model>,
    pub receipt: Option<receipt::Model>,
}

/// Computes sale amounts from `(unit_price, quantity)` lines.
///
/// The discount is clamped to `[0, subtotal]`; tax applies to the discounted
/// subtotal and is rounded to two decimals. Amounts that do not fit a
/// `Decimal` are a validation error.
pub fn compute_totals(
    lines: &[(Decimal, i32)],
    discount_type: Option<DiscountType>,
    discount_value: Option<Decimal>,
    tax_rate: Decimal,
) -> Result<SaleTotals, ServiceError> {
    let subtotal = checked_sum(
        lines
            .iter()
            .map(|(price, qty)| line_total(*price, *qty))
            .collect::<Result<Vec<_>, _>>()?,
    )?;
    let out_of_range = || ServiceError::ValidationError("Sale total is out of range".to_string());

    let value = discount_value.unwrap_or(Decimal::ZERO);
    let raw_discount = match discount_type {
        Some(DiscountType::Fixed) => value,
        Some(DiscountType::Percentage) => subtotal
            .checked_mul(value)
            .ok_or_else(out_of_range)?
            .checked_div(Decimal::ONE_HUNDRED)
            .ok_or_else(out_of_range)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        None => Decimal::ZERO,
    };
    let discount = raw_discount.max(Decimal::ZERO).min(subtotal);

    let taxable = subtotal - discount;
    let tax = taxable
        .checked_mul(tax_rate)
        .ok_or_else(out_of_range)?
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    Ok(SaleTotals {
        subtotal,
        discount,
        tax,
        total: taxable.checked_add(tax).ok_or_else(out_of_range)?,
    })
}

/// `SALE-{last 8 digits of epoch ms}-{4 base36 chars}`
pub fn generate_sale_number() -> String {
    let millis = Utc::now().timestamp_millis().to_string();
    let tail = &millis[millis.len().saturating_sub(8)..];
    let mut rng = rand::thread_rng();
    let suffix: String = (0..4)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("SALE-{}-{}", tail, suffix)
}

pub fn receipt_number(sale_number: &str) -> String {
    format!("RCP-{}", sale_number)
}

struct CompletedSale {
    details: SaleDetails,
    stock_changes: Vec<StockChange>,
    points: PointsUpdate,
}

/// Point-of-sale checkout
#[derive(Clone)]
pub struct SalesService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    sms: Arc<SmsService>,
    tax_rate: Decimal,
}

impl SalesService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        sms: Arc<SmsService>,
        tax_rate: Decimal,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            sms,
            tax_rate,
        }
    }

    /// Validates stock, records the sale, decrements inventory, accrues
    /// loyalty and issues the receipt in one transaction.
    #[instrument(skip(self, input), fields(lines = input.items.len()))]
    pub async fn process_sale(
        &self,
        input: ProcessSaleInput,
        actor: &str,
    ) -> Result<SaleDetails, ServiceError> {
        let customer_id = validate_sale_input(&input)?;
        let tax_rate = self.tax_rate;
        let actor_owned = actor.to_string();

        let result = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move { record_sale(txn, customer_id, input, tax_rate, &actor_owned).await })
        })
        .await;

        let completed = match result {
            Ok(completed) => completed,
            Err(e) => {
                let reason = match &e {
                    ServiceError::InsufficientStock(_) => "insufficient_stock",
                    ServiceError::ValidationError(_) => "validation",
                    _ => "error",
                };
                metrics::record_sale_failure(reason);
                return Err(e);
            }
        };

        let sale = &completed.details.sale;
        metrics::record_sale_completed();
        info!(sale_id = %sale.id, sale_number = %sale.sale_number, total = %sale.total_amount, "Sale completed");

        for change in &completed.stock_changes {
            self.event_sender.send_or_log(stock_event(change)).await;
        }
        for event in points_events(&completed.points) {
            self.event_sender.send_or_log(event).await;
        }
        self.event_sender
            .send_or_log(Event::SaleCompleted {
                sale_id: sale.id,
                sale_number: sale.sale_number.clone(),
                customer_id: sale.customer_id,
                total_amount: sale.total_amount,
            })
            .await;

        if let Some(phone) = sale.customer_phone.as_deref().filter(|p| !p.trim().is_empty()) {
            let text = sale_sms_text(sale, &completed.details.items);
            self.sms.notify(phone, &text, None, actor).await;
        }

        Ok(completed.details)
    }

    #[instrument(skip(self))]
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleDetails, ServiceError> {
        let db = &*self.db_pool;
        let sale = sale::Entity::find_by_id(sale_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Sale {} not found", sale_id)))?;
        let items = sale_item::Entity::find()
            .filter(sale_item::Column::SaleId.eq(sale_id))
            .all(db)
            .await?;
        let receipt = receipt::Entity::find()
            .filter(receipt::Column::SaleId.eq(sale_id))
            .one(db)
            .await?;

        Ok(SaleDetails {
            sale,
            items,
            receipt,
        })
    }

    #[instrument(skip(self))]
    pub async fn recent_sales(&self, limit: u64) -> Result<Vec<sale::Model>, ServiceError> {
        Ok(sale::Entity::find()
            .order_by_desc(sale::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_receipt(&self, sale_id: Uuid) -> Result<receipt::Model, ServiceError> {
        receipt::Entity::find()
            .filter(receipt::Column::SaleId.eq(sale_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Receipt for sale {} not found", sale_id)))
    }
}

fn validate_sale_input(input: &ProcessSaleInput) -> Result<Uuid, ServiceError> {
    let customer_id = input
        .customer_id
        .ok_or_else(|| ServiceError::ValidationError("Customer is required".to_string()))?;

    input.validate()?;
    input.payment_method.validate()?;
    for line in &input.items {
        if let Some(price) = line.unit_price {
            check_price(price, "Unit price")?;
        }
    }
    if input.discount_value.is_some_and(|v| v < Decimal::ZERO) {
        return Err(ServiceError::ValidationError(
            "Discount cannot be negative".to_string(),
        ));
    }
    Ok(customer_id)
}

async fn record_sale<C: ConnectionTrait>(
    txn: &C,
    customer_id: Uuid,
    input: ProcessSaleInput,
    tax_rate: Decimal,
    actor: &str,
) -> Result<CompletedSale, ServiceError> {
    let customer = customer::Entity::find_by_id(customer_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::ValidationError(format!("Customer {} not found", customer_id)))?;

    // Current variant state, keyed by id, so repeated lines see earlier decrements.
    let mut variants: HashMap<Uuid, product_variant::Model> = HashMap::new();
    let mut products: HashMap<Uuid, product::Model> = HashMap::new();
    let mut requested: HashMap<Uuid, i32> = HashMap::new();

    for line in &input.items {
        if !variants.contains_key(&line.variant_id) {
            let variant = lock_variant(txn, line.variant_id).await?;
            if !products.contains_key(&variant.product_id) {
                let product = product::Entity::find_by_id(variant.product_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Product {} not found", variant.product_id))
                    })?;
                products.insert(product.id, product);
            }
            variants.insert(variant.id, variant);
        }

        let total_requested = requested.entry(line.variant_id).or_insert(0);
        *total_requested = total_requested.checked_add(line.quantity).ok_or_else(|| {
            ServiceError::ValidationError("Requested quantity is out of range".to_string())
        })?;

        let variant = &variants[&line.variant_id];
        if *total_requested > variant.quantity {
            let product_name = products
                .get(&variant.product_id)
                .map(|p| p.name.as_str())
                .unwrap_or_default();
            warn!(variant_id = %variant.id, available = variant.quantity, requested = *total_requested, "Sale rejected for stock");
            return Err(ServiceError::InsufficientStock(insufficient_stock_message(
                product_name,
                &variant.name,
                variant.quantity,
                *total_requested,
            )));
        }
    }

    let priced: Vec<(Decimal, i32)> = input
        .items
        .iter()
        .map(|line| {
            let price = line
                .unit_price
                .unwrap_or_else(|| variants[&line.variant_id].price);
            (price, line.quantity)
        })
        .collect();
    let totals = compute_totals(&priced, input.discount_type, input.discount_value, tax_rate)?;

    let sale_number = generate_sale_number();
    let now = Utc::now();
    let payment_method = serde_json::to_value(&input.payment_method)?;
    let payment_label = input.payment_method.method_type.to_lowercase();

    let sale = sale::ActiveModel {
        id: Set(Uuid::new_v4()),
        sale_number: Set(sale_number.clone()),
        customer_id: Set(customer.id),
        customer_name: Set(Some(customer.name.clone())),
        customer_phone: Set(Some(customer.phone.clone()).filter(|p| !p.is_empty())),
        subtotal: Set(totals.subtotal),
        discount_amount: Set(totals.discount),
        discount_type: Set(input.discount_type),
        discount_value: Set(input.discount_value),
        tax: Set(totals.tax),
        total_amount: Set(totals.total),
        payment_method: Set(payment_method),
        status: Set(SaleStatus::Completed),
        created_by: Set(actor.to_string()),
        notes: Set(input.notes.clone()),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    let mut items = Vec::with_capacity(input.items.len());
    let mut stock_changes = Vec::with_capacity(input.items.len());
    for (line, (unit_price, quantity)) in input.items.iter().zip(priced) {
        let variant = variants
            .remove(&line.variant_id)
            .ok_or_else(|| ServiceError::InternalError("variant state lost".to_string()))?;
        let product_name = products
            .get(&variant.product_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        let total_price = line_total(unit_price, quantity)?;
        let cost_total = line_total(variant.cost_price, quantity)?;
        let item = sale_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            sale_id: Set(sale.id),
            product_id: Set(variant.product_id),
            variant_id: Set(variant.id),
            product_name: Set(product_name.clone()),
            variant_name: Set(variant.name.clone()),
            quantity: Set(quantity),
            unit_price: Set(unit_price),
            total_price: Set(total_price),
            cost_price: Set(variant.cost_price),
            profit: Set(total_price - cost_total),
        }
        .insert(txn)
        .await?;

        let note = format!(
            "Sold {} units of {} ({})",
            quantity, product_name, variant.name
        );
        let change = apply_stock_movement(
            txn,
            variant,
            MovementType::Out,
            quantity,
            &format!("Sale {}", sale_number),
            Some(sale.id.to_string()),
            Some(note),
            Some(actor.to_string()),
        )
        .await?;

        variants.insert(change.variant.id, change.variant.clone());
        stock_changes.push(change);
        items.push(item);
    }

    let points = accrue_purchase(txn, customer.id, totals.total, &sale_number, actor).await?;

    let customer_name = Some(customer.name.trim())
        .filter(|n| !n.is_empty())
        .unwrap_or(WALK_IN_CUSTOMER)
        .to_string();
    let receipt = receipt::ActiveModel {
        id: Set(Uuid::new_v4()),
        sale_id: Set(sale.id),
        receipt_number: Set(receipt_number(&sale_number)),
        customer_name: Set(customer_name),
        customer_phone: Set(sale.customer_phone.clone()),
        total_amount: Set(totals.total),
        payment_method: Set(payment_label),
        items_count: Set(items.iter().map(|i| i.quantity).sum()),
        generated_by: Set(actor.to_string()),
        created_at: Set(now),
    }
    .insert(txn)
    .await?;

    Ok(CompletedSale {
        details: SaleDetails {
            sale,
            items,
            receipt: Some(receipt),
        },
        stock_changes,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn totals_with_percentage_discount_and_tax() {
        let totals = compute_totals(
            &[(dec!(10000), 2), (dec!(5000), 1)],
            Some(DiscountType::Percentage),
            Some(dec!(10)),
            dec!(0.18),
        )
        .unwrap();
        assert_eq!(totals.subtotal, dec!(25000));
        assert_eq!(totals.discount, dec!(2500));
        assert_eq!(totals.tax, dec!(4050));
        assert_eq!(totals.total, dec!(26550));
    }

    #[test]
    fn fixed_discount_is_clamped_to_subtotal() {
        let totals = compute_totals(
            &[(dec!(3000), 1)],
            Some(DiscountType::Fixed),
            Some(dec!(5000)),
            Decimal::ZERO,
        )
        .unwrap();
        assert_eq!(totals.discount, dec!(3000));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn no_discount_without_type() {
        let totals =
            compute_totals(&[(dec!(1500), 3)], None, Some(dec!(50)), Decimal::ZERO).unwrap();
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, dec!(4500));
    }

    #[test]
    fn totals_that_overflow_are_rejected() {
        let err = compute_totals(&[(Decimal::MAX / dec!(2), 3)], None, None, Decimal::ZERO)
            .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));

        let err = compute_totals(
            &[(Decimal::MAX / dec!(2), 1)],
            Some(DiscountType::Percentage),
            Some(dec!(1000)),
            Decimal::ZERO,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }

    #[test]
    fn sale_number_shape() {
        let number = generate_sale_number();
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "SALE");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert_eq!(receipt_number(&number), format!("RCP-{}", number));
    }

    #[test]
    fn missing_customer_is_a_validation_error() {
        let input = ProcessSaleInput {
            customer_id: None,
            items: vec![SaleLineInput {
                variant_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: None,
            }],
            discount_type: None,
            discount_value: None,
            payment_method: PaymentMethodInput {
                method_type: "cash".into(),
                details: None,
                amount: dec!(1000),
            },
            notes: None,
        };
        let err = validate_sale_input(&input).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(msg) if msg == "Customer is required"));
    }
}
