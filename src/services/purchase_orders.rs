use crate::{
    db::{with_transaction, DbPool},
    entities::{
        inventory_adjustment::{self, AdjustmentType},
        inventory_item::{self, ItemStatus},
        product_variant,
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_audit, purchase_order_item,
        purchase_order_message::{self, MessageType},
        purchase_order_payment::{self, SupplierPaymentStatus},
        quality_check,
        serial_movement::{self, SerialMovementType},
        stock_movement::MovementType,
        supplier,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    services::{
        check_price, checked_sum,
        inventory::{apply_stock_movement, lock_variant, stock_event, StockChange},
        line_total,
    },
};
use chrono::{NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemInput {
    pub variant_id: Uuid,
    #[validate(range(
        min = 1,
        max = 100000,
        message = "Ordered quantity must be between 1 and 100000"
    ))]
    pub quantity: i32,
    #[schema(value_type = String, example = "11000")]
    pub cost_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderInput {
    pub supplier_id: Uuid,
    #[validate(length(min = 3, max = 3))]
    pub currency: Option<String>,
    pub expected_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
    #[validate(length(min = 1, message = "Purchase order must contain at least one item"))]
    #[validate]
    pub items: Vec<PurchaseOrderItemInput>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePurchaseOrderStatusInput {
    pub status: PurchaseOrderStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SerialNumberInput {
    #[validate(length(min = 1, max = 100))]
    pub serial_number: String,
    pub imei: Option<String>,
    pub mac_address: Option<String>,
    pub barcode: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReceiveItemInput {
    pub item_id: Uuid,
    /// Units received in this delivery, added to what was already received
    #[validate(range(max = 100000, message = "Received quantity cannot exceed 100000"))]
    pub quantity: i32,
    #[serde(default)]
    #[validate]
    pub serial_numbers: Vec<SerialNumberInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReceivePurchaseOrderInput {
    #[validate(length(min = 1, message = "At least one item is required"))]
    #[validate]
    pub items: Vec<ReceiveItemInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddPurchaseOrderPaymentInput {
    #[validate(length(min = 1, max = 50))]
    pub payment_method: String,
    #[schema(value_type = String, example = "250000")]
    pub amount: Decimal,
    pub currency: Option<String>,
    pub status: Option<SupplierPaymentStatus>,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddMessageInput {
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
    pub message_type: Option<MessageType>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddQualityCheckInput {
    pub item_id: Uuid,
    pub passed: bool,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOrderDetails {
    #[serde(flatten)]
    pub order: purchase_order::Model,
    pub items: Vec<purchase_order_item::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReceiveResult {
    #[serde(flatten)]
    pub details: PurchaseOrderDetails,
    pub units_received: i32,
    pub serials_created: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentSummary {
    pub currency: String,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub total_paid: Decimal,
    #[schema(value_type = String)]
    pub outstanding: Decimal,
    pub payments_count: usize,
}

/// `PO-{yyyymmdd}-{4 hex}`
pub fn generate_order_number() -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("PO-{}-{:04X}", Utc::now().format("%Y%m%d"), suffix)
}

/// Checks a receive request against the current lines, collecting every problem.
pub fn validate_receipt(
    items: &[purchase_order_item::Model],
    lines: &[ReceiveItemInput],
) -> Result<(), ServiceError> {
    let by_id: HashMap<Uuid, &purchase_order_item::Model> =
        items.iter().map(|item| (item.id, item)).collect();
    let mut pending: HashMap<Uuid, i32> = HashMap::new();
    let mut errors = Vec::new();

    for line in lines {
        let Some(item) = by_id.get(&line.item_id) else {
            errors.push(format!("Item {} not found in purchase order", line.item_id));
            continue;
        };
        if line.quantity < 0 {
            errors.push(format!(
                "Received quantity cannot be negative for item {}",
                line.item_id
            ));
            continue;
        }

        let already = pending.entry(item.id).or_insert(item.received_quantity);
        let Some(next) = already.checked_add(line.quantity) else {
            errors.push(format!(
                "Received quantity for item {} is out of range",
                line.item_id
            ));
            continue;
        };
        if next > item.quantity {
            errors.push(format!(
                "Received quantity ({}) cannot exceed ordered quantity ({})",
                next, item.quantity
            ));
            continue;
        }
        *already = next;

        if line.serial_numbers.len() > line.quantity as usize {
            errors.push(format!(
                "Serial numbers ({}) exceed received quantity ({}) for item {}",
                line.serial_numbers.len(),
                line.quantity,
                line.item_id
            ));
        }
        for serial in &line.serial_numbers {
            if serial.serial_number.trim().is_empty() {
                errors.push(format!("Empty serial number for item {}", line.item_id));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "Validation errors: {}",
            errors.join("; ")
        )))
    }
}

struct ReceiveOutcome {
    details: PurchaseOrderDetails,
    old_status: PurchaseOrderStatus,
    units_received: i32,
    serials_created: usize,
    stock_changes: Vec<StockChange>,
}

/// Suppliers, purchase orders and the goods-receipt workflow
#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PurchaseOrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create_supplier(
        &self,
        input: CreateSupplierInput,
    ) -> Result<supplier::Model, ServiceError> {
        input.validate()?;
        let supplier = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            contact_person: Set(input.contact_person),
            phone: Set(input.phone),
            email: Set(input.email),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?;

        info!(supplier_id = %supplier.id, "Supplier created");
        Ok(supplier)
    }

    #[instrument(skip(self))]
    pub async fn list_suppliers(&self) -> Result<Vec<supplier::Model>, ServiceError> {
        Ok(supplier::Entity::find()
            .order_by_asc(supplier::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input), fields(supplier_id = %input.supplier_id))]
    pub async fn create_purchase_order(
        &self,
        input: CreatePurchaseOrderInput,
        actor: &str,
    ) -> Result<PurchaseOrderDetails, ServiceError> {
        input.validate()?;
        for item in &input.items {
            check_price(item.cost_price, "Cost price")?;
        }
        let total = checked_sum(
            input
                .items
                .iter()
                .map(|i| line_total(i.cost_price, i.quantity))
                .collect::<Result<Vec<_>, _>>()?,
        )?;
        let actor = actor.to_string();

        let details = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                supplier::Entity::find_by_id(input.supplier_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Supplier {} not found", input.supplier_id))
                    })?;

                let now = Utc::now();
                let order = purchase_order::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_number: Set(generate_order_number()),
                    supplier_id: Set(input.supplier_id),
                    status: Set(PurchaseOrderStatus::Draft),
                    currency: Set(input
                        .currency
                        .map(|c| c.to_uppercase())
                        .unwrap_or_else(|| "TZS".to_string())),
                    total_amount: Set(total),
                    expected_delivery: Set(input.expected_delivery),
                    notes: Set(input.notes),
                    created_by: Set(actor.clone()),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                let mut items = Vec::with_capacity(input.items.len());
                for line in input.items {
                    let variant = product_variant::Entity::find_by_id(line.variant_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product variant {} not found",
                                line.variant_id
                            ))
                        })?;
                    let item = purchase_order_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        purchase_order_id: Set(order.id),
                        product_id: Set(variant.product_id),
                        variant_id: Set(variant.id),
                        quantity: Set(line.quantity),
                        received_quantity: Set(0),
                        cost_price: Set(line.cost_price),
                    }
                    .insert(txn)
                    .await?;
                    items.push(item);
                }

                write_audit(
                    txn,
                    order.id,
                    "created",
                    &actor,
                    json!({ "order_number": order.order_number, "items": items.len(), "total_amount": total }),
                )
                .await?;

                Ok(PurchaseOrderDetails { order, items })
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderCreated(details.order.id))
            .await;
        info!(purchase_order_id = %details.order.id, order_number = %details.order.order_number, "Purchase order created");
        Ok(details)
    }

    #[instrument(skip(self))]
    pub async fn get_purchase_order(&self, id: Uuid) -> Result<PurchaseOrderDetails, ServiceError> {
        load_details(&*self.db_pool, id).await
    }

    #[instrument(skip(self))]
    pub async fn list_purchase_orders(
        &self,
        status: Option<PurchaseOrderStatus>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<purchase_order::Model>, u64), ServiceError> {
        let mut query = purchase_order::Entity::find();
        if let Some(status) = status {
            query = query.filter(purchase_order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(purchase_order::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Manual status change along the allowed transitions.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: PurchaseOrderStatus,
        actor: &str,
    ) -> Result<purchase_order::Model, ServiceError> {
        let actor = actor.to_string();
        let (order, old_status) = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let order = find_order(txn, id).await?;
                let old_status = order.status;
                if !old_status.can_transition_to(status) {
                    return Err(ServiceError::InvalidStatus(format!(
                        "Cannot change purchase order status from {} to {}",
                        old_status, status
                    )));
                }

                let mut model: purchase_order::ActiveModel = order.into();
                model.status = Set(status);
                let order = model.update(txn).await?;

                let description = format!("Status changed to {}", status);
                write_audit(
                    txn,
                    id,
                    "status_changed",
                    &actor,
                    json!({ "from": old_status, "to": status, "message": description }),
                )
                .await?;
                write_message(txn, id, "system", &description, MessageType::System).await?;
                Ok((order, old_status))
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::PurchaseOrderStatusChanged {
                purchase_order_id: id,
                old_status: old_status.to_string(),
                new_status: order.status.to_string(),
            })
            .await;
        info!(purchase_order_id = %id, from = %old_status, to = %order.status, "Purchase order status changed");
        Ok(order)
    }

    /// Receives goods against a purchase order.
    ///
    /// Line quantities are deltas added to what was received before. Stock,
    /// adjustments, serialized items, status and audit commit together.
    #[instrument(skip(self, input), fields(lines = input.items.len()))]
    pub async fn receive(
        &self,
        id: Uuid,
        input: ReceivePurchaseOrderInput,
        actor: &str,
    ) -> Result<ReceiveResult, ServiceError> {
        input.validate()?;
        let actor = actor.to_string();

        let outcome = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move { receive_in_txn(txn, id, input, &actor).await })
        })
        .await?;

        metrics::record_purchase_order_received();
        for change in &outcome.stock_changes {
            self.event_sender.send_or_log(stock_event(change)).await;
        }
        let order = &outcome.details.order;
        let fully_received = order.status == PurchaseOrderStatus::Received;
        if outcome.old_status != order.status {
            self.event_sender
                .send_or_log(Event::PurchaseOrderStatusChanged {
                    purchase_order_id: id,
                    old_status: outcome.old_status.to_string(),
                    new_status: order.status.to_string(),
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::PurchaseOrderReceived {
                purchase_order_id: id,
                units_received: outcome.units_received,
                fully_received,
            })
            .await;

        info!(
            purchase_order_id = %id,
            units = outcome.units_received,
            serials = outcome.serials_created,
            status = %order.status,
            "Purchase order received"
        );
        Ok(ReceiveResult {
            details: outcome.details,
            units_received: outcome.units_received,
            serials_created: outcome.serials_created,
        })
    }

    #[instrument(skip(self, input))]
    pub async fn add_payment(
        &self,
        id: Uuid,
        input: AddPurchaseOrderPaymentInput,
        actor: &str,
    ) -> Result<purchase_order_payment::Model, ServiceError> {
        input.validate()?;
        if input.amount <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Payment amount must be greater than zero".to_string(),
            ));
        }
        let actor = actor.to_string();

        let payment = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let order = find_order(txn, id).await?;
                let payment = purchase_order_payment::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    purchase_order_id: Set(id),
                    payment_method: Set(input.payment_method),
                    amount: Set(input.amount),
                    currency: Set(input
                        .currency
                        .map(|c| c.to_uppercase())
                        .unwrap_or(order.currency)),
                    status: Set(input.status.unwrap_or(SupplierPaymentStatus::Completed)),
                    reference: Set(input.reference),
                    created_by: Set(actor.clone()),
                    created_at: Set(Utc::now()),
                }
                .insert(txn)
                .await?;

                write_audit(
                    txn,
                    id,
                    "payment_added",
                    &actor,
                    json!({ "payment_id": payment.id, "amount": payment.amount, "currency": payment.currency }),
                )
                .await?;
                Ok(payment)
            })
        })
        .await?;

        info!(purchase_order_id = %id, payment_id = %payment.id, "Purchase order payment added");
        Ok(payment)
    }

    #[instrument(skip(self))]
    pub async fn list_payments(
        &self,
        id: Uuid,
    ) -> Result<Vec<purchase_order_payment::Model>, ServiceError> {
        find_order(&*self.db_pool, id).await?;
        Ok(purchase_order_payment::Entity::find()
            .filter(purchase_order_payment::Column::PurchaseOrderId.eq(id))
            .order_by_desc(purchase_order_payment::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn payment_summary(&self, id: Uuid) -> Result<PaymentSummary, ServiceError> {
        let order = find_order(&*self.db_pool, id).await?;
        let payments = self.list_payments(id).await?;
        let total_paid: Decimal = payments
            .iter()
            .filter(|p| p.status == SupplierPaymentStatus::Completed)
            .map(|p| p.amount)
            .sum();

        Ok(PaymentSummary {
            currency: order.currency,
            total_amount: order.total_amount,
            total_paid,
            outstanding: order.total_amount - total_paid,
            payments_count: payments.len(),
        })
    }

    #[instrument(skip(self))]
    pub async fn audit_log(
        &self,
        id: Uuid,
    ) -> Result<Vec<purchase_order_audit::Model>, ServiceError> {
        find_order(&*self.db_pool, id).await?;
        Ok(purchase_order_audit::Entity::find()
            .filter(purchase_order_audit::Column::PurchaseOrderId.eq(id))
            .order_by_asc(purchase_order_audit::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn add_message(
        &self,
        id: Uuid,
        input: AddMessageInput,
        actor: &str,
    ) -> Result<purchase_order_message::Model, ServiceError> {
        input.validate()?;
        find_order(&*self.db_pool, id).await?;
        write_message(
            &*self.db_pool,
            id,
            actor,
            &input.content,
            input.message_type.unwrap_or(MessageType::User),
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn list_messages(
        &self,
        id: Uuid,
    ) -> Result<Vec<purchase_order_message::Model>, ServiceError> {
        find_order(&*self.db_pool, id).await?;
        Ok(purchase_order_message::Entity::find()
            .filter(purchase_order_message::Column::PurchaseOrderId.eq(id))
            .order_by_asc(purchase_order_message::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn add_quality_check(
        &self,
        id: Uuid,
        input: AddQualityCheckInput,
        actor: &str,
    ) -> Result<quality_check::Model, ServiceError> {
        let db = &*self.db_pool;
        find_order(db, id).await?;
        let belongs = purchase_order_item::Entity::find_by_id(input.item_id)
            .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
            .one(db)
            .await?;
        if belongs.is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Item {} not found in purchase order",
                input.item_id
            )));
        }

        let check = quality_check::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(id),
            item_id: Set(input.item_id),
            passed: Set(input.passed),
            notes: Set(input.notes),
            checked_by: Set(actor.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;

        if !check.passed {
            warn!(purchase_order_id = %id, item_id = %check.item_id, "Quality check failed");
        }
        Ok(check)
    }

    #[instrument(skip(self))]
    pub async fn list_quality_checks(
        &self,
        id: Uuid,
    ) -> Result<Vec<quality_check::Model>, ServiceError> {
        find_order(&*self.db_pool, id).await?;
        Ok(quality_check::Entity::find()
            .filter(quality_check::Column::PurchaseOrderId.eq(id))
            .order_by_asc(quality_check::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }
}

async fn receive_in_txn<C: ConnectionTrait>(
    txn: &C,
    id: Uuid,
    input: ReceivePurchaseOrderInput,
    actor: &str,
) -> Result<ReceiveOutcome, ServiceError> {
    let order = lock_order(txn, id).await?;
    if !order.status.can_receive() {
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot receive purchase order in status {}",
            order.status
        )));
    }

    let items = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
        .all(txn)
        .await?;
    validate_receipt(&items, &input.items)?;

    let units_received = input
        .items
        .iter()
        .try_fold(0i32, |acc, l| acc.checked_add(l.quantity))
        .ok_or_else(|| ServiceError::ValidationError("Received quantity is out of range".to_string()))?;
    if units_received == 0 {
        return Err(ServiceError::ValidationError(
            "No quantities to receive".to_string(),
        ));
    }

    let reason = format!("Partial receive from purchase order {}", order.order_number);
    let mut current: HashMap<Uuid, purchase_order_item::Model> =
        items.into_iter().map(|item| (item.id, item)).collect();
    let mut seen_serials = HashSet::new();
    let mut stock_changes = Vec::new();
    let mut serials_created = 0;
    let now = Utc::now();

    for line in &input.items {
        if line.quantity == 0 {
            continue;
        }
        let item = current
            .remove(&line.item_id)
            .ok_or_else(|| ServiceError::NotFound(format!("Item {} not found in purchase order", line.item_id)))?;

        let received = item.received_quantity.checked_add(line.quantity).ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Received quantity for item {} is out of range",
                line.item_id
            ))
        })?;
        let mut model: purchase_order_item::ActiveModel = item.clone().into();
        model.received_quantity = Set(received);
        let item = model.update(txn).await?;

        let variant = lock_variant(txn, item.variant_id).await?;
        let change = apply_stock_movement(
            txn,
            variant,
            MovementType::In,
            line.quantity,
            &reason,
            Some(order.order_number.clone()),
            None,
            Some(actor.to_string()),
        )
        .await?;
        stock_changes.push(change);

        inventory_adjustment::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_order_id: Set(id),
            product_id: Set(item.product_id),
            variant_id: Set(item.variant_id),
            adjustment_type: Set(AdjustmentType::Receive),
            quantity: Set(line.quantity),
            cost_price: Set(item.cost_price),
            reason: Set(reason.clone()),
            adjusted_by: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;

        for serial in &line.serial_numbers {
            let serial_number = serial.serial_number.trim().to_string();
            let taken = inventory_item::Entity::find()
                .filter(inventory_item::Column::SerialNumber.eq(serial_number.as_str()))
                .one(txn)
                .await?;
            if taken.is_some() || !seen_serials.insert(serial_number.clone()) {
                return Err(ServiceError::Conflict(format!(
                    "Serial number {} already exists",
                    serial_number
                )));
            }

            let unit = inventory_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(item.product_id),
                variant_id: Set(Some(item.variant_id)),
                purchase_order_id: Set(Some(id)),
                serial_number: Set(serial_number),
                imei: Set(serial.imei.clone()),
                mac_address: Set(serial.mac_address.clone()),
                barcode: Set(serial.barcode.clone()),
                location: Set(serial.location.clone()),
                status: Set(ItemStatus::Available),
                notes: Set(serial.notes.clone()),
                cost_price: Set(item.cost_price),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;

            serial_movement::ActiveModel {
                id: Set(Uuid::new_v4()),
                inventory_item_id: Set(unit.id),
                movement_type: Set(SerialMovementType::Received),
                reference: Set(Some(order.order_number.clone())),
                created_at: Set(now),
            }
            .insert(txn)
            .await?;
            serials_created += 1;
        }

        current.insert(item.id, item);
    }

    let mut items: Vec<purchase_order_item::Model> = current.into_values().collect();
    items.sort_by_key(|item| item.id);
    let fully_received = items.iter().all(|item| item.outstanding() == 0);
    let new_status = if fully_received {
        PurchaseOrderStatus::Received
    } else {
        PurchaseOrderStatus::PartiallyReceived
    };

    let old_status = order.status;
    let mut model: purchase_order::ActiveModel = order.into();
    model.status = Set(new_status);
    let order = model.update(txn).await?;

    write_audit(
        txn,
        id,
        "received",
        actor,
        json!({
            "units_received": units_received,
            "serials": serials_created,
            "status": new_status,
            "items": input.items.iter().map(|l| json!({ "item_id": l.item_id, "quantity": l.quantity })).collect::<Vec<_>>(),
        }),
    )
    .await?;

    Ok(ReceiveOutcome {
        details: PurchaseOrderDetails { order, items },
        old_status,
        units_received,
        serials_created,
        stock_changes,
    })
}

async fn find_order<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    purchase_order::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", id)))
}

/// Reads the order `FOR UPDATE` on Postgres so concurrent receipts serialize.
async fn lock_order<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<purchase_order::Model, ServiceError> {
    let mut query = purchase_order::Entity::find_by_id(id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Purchase order {} not found", id)))
}

async fn load_details<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<PurchaseOrderDetails, ServiceError> {
    let order = find_order(conn, id).await?;
    let items = purchase_order_item::Entity::find()
        .filter(purchase_order_item::Column::PurchaseOrderId.eq(id))
        .order_by_asc(purchase_order_item::Column::Id)
        .all(conn)
        .await?;
    Ok(PurchaseOrderDetails { order, items })
}

async fn write_audit<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
    action: &str,
    user_id: &str,
    details: serde_json::Value,
) -> Result<purchase_order_audit::Model, ServiceError> {
    Ok(purchase_order_audit::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(purchase_order_id),
        action: Set(action.to_string()),
        user_id: Set(user_id.to_string()),
        details: Set(details),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?)
}

async fn write_message<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
    sender: &str,
    content: &str,
    message_type: MessageType,
) -> Result<purchase_order_message::Model, ServiceError> {
    Ok(purchase_order_message::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(purchase_order_id),
        sender: Set(sender.to_string()),
        content: Set(content.to_string()),
        message_type: Set(message_type),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: Uuid, ordered: i32, received: i32) -> purchase_order_item::Model {
        purchase_order_item::Model {
            id,
            purchase_order_id: Uuid::nil(),
            product_id: Uuid::nil(),
            variant_id: Uuid::nil(),
            quantity: ordered,
            received_quantity: received,
            cost_price: Decimal::new(1000, 0),
        }
    }

    fn receive(item_id: Uuid, quantity: i32) -> ReceiveItemInput {
        ReceiveItemInput {
            item_id,
            quantity,
            serial_numbers: Vec::new(),
        }
    }

    #[test]
    fn order_number_shape() {
        let number = generate_order_number();
        assert!(number.starts_with("PO-"));
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn receipt_within_ordered_quantity_passes() {
        let id = Uuid::new_v4();
        assert!(validate_receipt(&[line(id, 10, 4)], &[receive(id, 6)]).is_ok());
    }

    #[test]
    fn receipt_collects_every_error() {
        let known = Uuid::new_v4();
        let unknown = Uuid::new_v4();
        let err = validate_receipt(
            &[line(known, 5, 3)],
            &[receive(unknown, 1), receive(known, 3)],
        )
        .unwrap_err();

        let ServiceError::ValidationError(msg) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            msg,
            format!(
                "Validation errors: Item {} not found in purchase order; Received quantity (6) cannot exceed ordered quantity (5)",
                unknown
            )
        );
    }

    #[test]
    fn overflowing_receipt_is_rejected() {
        let id = Uuid::new_v4();
        let err = validate_receipt(&[line(id, 5, 1)], &[receive(id, i32::MAX)]).unwrap_err();
        assert!(err
            .to_string()
            .contains(&format!("Received quantity for item {} is out of range", id)));
    }

    #[test]
    fn receive_line_quantity_is_bounded() {
        assert!(receive(Uuid::new_v4(), 100_000).validate().is_ok());
        assert!(receive(Uuid::new_v4(), 100_001).validate().is_err());
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let id = Uuid::new_v4();
        let err = validate_receipt(&[line(id, 5, 0)], &[receive(id, -1)]).unwrap_err();
        assert!(err
            .to_string()
            .contains("Received quantity cannot be negative"));
    }

    #[test]
    fn more_serials_than_units_is_rejected() {
        let id = Uuid::new_v4();
        let mut input = receive(id, 1);
        input.serial_numbers = vec![
            SerialNumberInput {
                serial_number: "SN-1".into(),
                ..Default::default()
            },
            SerialNumberInput {
                serial_number: "SN-2".into(),
                ..Default::default()
            },
        ];
        assert!(validate_receipt(&[line(id, 5, 0)], &[input]).is_err());
    }
}
