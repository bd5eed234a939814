use crate::{
    db::{with_transaction, DbPool},
    entities::{
        inventory_item, product, product_variant,
        stock_movement::{self, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::check_price,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateVariantInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[schema(value_type = String, example = "15000")]
    pub price: Decimal,
    #[schema(value_type = String, example = "11000")]
    pub cost_price: Decimal,
    #[validate(range(min = 0, max = 100000))]
    #[serde(default)]
    pub quantity: i32,
    #[validate(range(min = 0, max = 100000))]
    #[serde(default)]
    pub min_quantity: i32,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    pub barcode: Option<String>,
    pub category: Option<String>,
    #[validate]
    #[validate(length(min = 1, message = "At least one variant is required"))]
    pub variants: Vec<CreateVariantInput>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdjustStockInput {
    pub movement_type: MovementType,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(length(min = 1, max = 255, message = "Reason is required"))]
    pub reason: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: product::Model,
    pub variants: Vec<product_variant::Model>,
}

/// A variant at or below its reorder level, with its product name.
#[derive(Debug, Clone, Serialize)]
pub struct LowStockItem {
    pub product_name: String,
    #[serde(flatten)]
    pub variant: product_variant::Model,
}

/// Stock movement produced by one write.
#[derive(Debug, Clone)]
pub(crate) struct StockChange {
    pub variant: product_variant::Model,
    pub movement: stock_movement::Model,
}

/// Formats the shortfall message shared by sales and manual stock-outs.
pub fn insufficient_stock_message(
    product_name: &str,
    variant_name: &str,
    available: i32,
    requested: i32,
) -> String {
    format!(
        "Insufficient stock for {} ({}). Available: {}, Requested: {}",
        product_name, variant_name, available, requested
    )
}

/// Quantity after a movement, or `None` when an `out` would go negative.
pub fn quantity_after(current: i32, movement_type: MovementType, quantity: i32) -> Option<i32> {
    match movement_type {
        MovementType::In => Some(current.saturating_add(quantity)),
        MovementType::Out => {
            let next = current - quantity;
            (next >= 0).then_some(next)
        }
        MovementType::Adjustment => Some(quantity),
    }
}

/// Product catalog and stock levels
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductWithVariants, ServiceError> {
        input.validate()?;
        for variant in &input.variants {
            check_price(variant.price, "Price")?;
            check_price(variant.cost_price, "Cost price")?;
        }

        let created = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let duplicate = product::Entity::find()
                    .filter(product::Column::Sku.eq(input.sku.as_str()))
                    .one(txn)
                    .await?;
                if duplicate.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Product with SKU {} already exists",
                        input.sku
                    )));
                }

                let product = product::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    name: Set(input.name),
                    description: Set(input.description),
                    sku: Set(input.sku),
                    barcode: Set(input.barcode),
                    category: Set(input.category),
                    is_active: Set(true),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                let mut variants = Vec::with_capacity(input.variants.len());
                for v in input.variants {
                    let taken = product_variant::Entity::find()
                        .filter(product_variant::Column::Sku.eq(v.sku.as_str()))
                        .one(txn)
                        .await?;
                    if taken.is_some() {
                        return Err(ServiceError::Conflict(format!(
                            "Variant with SKU {} already exists",
                            v.sku
                        )));
                    }

                    let now = Utc::now();
                    let variant = product_variant::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product.id),
                        name: Set(v.name),
                        sku: Set(v.sku),
                        price: Set(v.price),
                        cost_price: Set(v.cost_price),
                        quantity: Set(v.quantity),
                        min_quantity: Set(v.min_quantity),
                        is_active: Set(true),
                        created_at: Set(now),
                        updated_at: Set(now),
                    }
                    .insert(txn)
                    .await?;
                    variants.push(variant);
                }

                Ok(ProductWithVariants { product, variants })
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::ProductCreated(created.product.id))
            .await;
        info!(product_id = %created.product.id, "Product created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductWithVariants, ServiceError> {
        let db = &*self.db_pool;
        let product = product::Entity::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let variants = product_variant::Entity::find()
            .filter(product_variant::Column::ProductId.eq(product_id))
            .order_by_asc(product_variant::Column::Name)
            .all(db)
            .await?;

        Ok(ProductWithVariants { product, variants })
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        search: Option<String>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = product::Entity::find();
        if let Some(term) = search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(product::Column::Name.contains(term))
                    .add(product::Column::Sku.contains(term))
                    .add(product::Column::Barcode.contains(term))
                    .add(product::Column::Category.contains(term)),
            );
        }

        let paginator = query
            .order_by_asc(product::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    /// Applies a manual stock movement to one variant.
    #[instrument(skip(self, input), fields(movement_type = %input.movement_type, quantity = input.quantity))]
    pub async fn adjust_stock(
        &self,
        variant_id: Uuid,
        input: AdjustStockInput,
        actor: &str,
    ) -> Result<stock_movement::Model, ServiceError> {
        input.validate()?;
        let actor = actor.to_string();

        let change = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let variant = lock_variant(txn, variant_id).await?;
                apply_stock_movement(
                    txn,
                    variant,
                    input.movement_type,
                    input.quantity,
                    &input.reason,
                    input.reference,
                    input.notes,
                    Some(actor),
                )
                .await
            })
        })
        .await?;

        self.publish_stock_change(&change).await;
        Ok(change.movement)
    }

    #[instrument(skip(self))]
    pub async fn list_movements(
        &self,
        variant_id: Uuid,
        limit: u64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        Ok(stock_movement::Entity::find()
            .filter(stock_movement::Column::VariantId.eq(variant_id))
            .order_by_desc(stock_movement::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db_pool)
            .await?)
    }

    /// Active variants whose quantity is at or below their minimum.
    #[instrument(skip(self))]
    pub async fn low_stock(&self, limit: u64) -> Result<Vec<LowStockItem>, ServiceError> {
        let rows = product_variant::Entity::find()
            .filter(product_variant::Column::IsActive.eq(true))
            .filter(
                sea_orm::sea_query::Expr::col(product_variant::Column::Quantity)
                    .lte(sea_orm::sea_query::Expr::col(product_variant::Column::MinQuantity)),
            )
            .order_by_asc(product_variant::Column::Quantity)
            .limit(limit)
            .find_also_related(product::Entity)
            .all(&*self.db_pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(variant, product)| LowStockItem {
                product_name: product.map(|p| p.name).unwrap_or_default(),
                variant,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn list_serials(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<inventory_item::Model>, ServiceError> {
        Ok(inventory_item::Entity::find()
            .filter(inventory_item::Column::ProductId.eq(product_id))
            .order_by_desc(inventory_item::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    pub(crate) async fn publish_stock_change(&self, change: &StockChange) {
        self.event_sender
            .send_or_log(stock_event(change))
            .await;
    }
}

pub(crate) fn stock_event(change: &StockChange) -> Event {
    Event::StockAdjusted {
        product_id: change.variant.product_id,
        variant_id: change.variant.id,
        movement_type: change.movement.movement_type.to_string(),
        previous_quantity: change.movement.previous_quantity,
        new_quantity: change.movement.new_quantity,
        min_quantity: change.variant.min_quantity,
        reference: change.movement.reference.clone(),
    }
}

/// Reads a variant for update inside the caller's transaction.
pub(crate) async fn lock_variant<C: ConnectionTrait>(
    conn: &C,
    variant_id: Uuid,
) -> Result<product_variant::Model, ServiceError> {
    let mut query = product_variant::Entity::find_by_id(variant_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product variant {} not found", variant_id)))
}

/// Writes the new variant quantity and its movement row.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn apply_stock_movement<C: ConnectionTrait>(
    conn: &C,
    variant: product_variant::Model,
    movement_type: MovementType,
    quantity: i32,
    reason: &str,
    reference: Option<String>,
    notes: Option<String>,
    actor: Option<String>,
) -> Result<StockChange, ServiceError> {
    let previous = variant.quantity;
    let new_quantity = match quantity_after(previous, movement_type, quantity) {
        Some(q) => q,
        None => {
            let product_name = product::Entity::find_by_id(variant.product_id)
                .one(conn)
                .await?
                .map(|p| p.name)
                .unwrap_or_default();
            warn!(variant_id = %variant.id, previous, quantity, "Stock-out rejected");
            return Err(ServiceError::InsufficientStock(insufficient_stock_message(
                &product_name,
                &variant.name,
                previous,
                quantity,
            )));
        }
    };

    let mut model: product_variant::ActiveModel = variant.into();
    model.quantity = Set(new_quantity);
    model.updated_at = Set(Utc::now());
    let variant = model.update(conn).await?;

    let movement = stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(variant.product_id),
        variant_id: Set(variant.id),
        movement_type: Set(movement_type),
        quantity: Set(quantity),
        previous_quantity: Set(previous),
        new_quantity: Set(new_quantity),
        reason: Set(reason.to_string()),
        reference: Set(reference),
        notes: Set(notes),
        created_by: Set(actor),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;

    Ok(StockChange { variant, movement })
}
