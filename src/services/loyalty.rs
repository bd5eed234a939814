use crate::{
    db::{with_transaction, DbPool},
    entities::{
        customer::{self, ColorTag, LoyaltyTier},
        points_transaction::{self, PointsTransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Points earned per this many shillings spent.
const SHILLINGS_PER_POINT: i64 = 1000;

/// A reward customers can redeem points for.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LoyaltyReward {
    pub points: i32,
    pub name: &'static str,
    pub description: &'static str,
}

pub const REWARD_CATALOG: [LoyaltyReward; 4] = [
    LoyaltyReward {
        points: 500,
        name: "Free Diagnostic",
        description: "Free device diagnostic service",
    },
    LoyaltyReward {
        points: 1000,
        name: "10% Discount",
        description: "10% discount on next purchase",
    },
    LoyaltyReward {
        points: 2000,
        name: "Free Screen Protector",
        description: "Free screen protector installation",
    },
    LoyaltyReward {
        points: 5000,
        name: "Free Repair Service",
        description: "Free repair service (up to 50,000 TZS)",
    },
];

/// Maps a point balance onto its loyalty tier.
pub fn calculate_tier(points: i32) -> LoyaltyTier {
    LoyaltyTier::for_points(points)
}

/// Points a purchase of `total` earns: one point per full 1,000.
pub fn points_for_purchase(total: Decimal) -> i32 {
    if total <= Decimal::ZERO {
        return 0;
    }
    (total / Decimal::from(SHILLINGS_PER_POINT))
        .floor()
        .to_i32()
        .unwrap_or(i32::MAX)
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerInput {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 7, max = 32, message = "Phone number is required"))]
    pub phone: String,
    #[validate(email)]
    pub email: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub whatsapp: Option<String>,
    pub color_tag: Option<ColorTag>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateCustomerInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 7, max = 32))]
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub whatsapp: Option<String>,
    pub color_tag: Option<ColorTag>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerFilter {
    pub tier: Option<LoyaltyTier>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TierChange {
    pub from: LoyaltyTier,
    pub to: LoyaltyTier,
}

impl TierChange {
    fn reason(&self) -> String {
        let direction = if self.to > self.from {
            "upgraded"
        } else {
            "downgraded"
        };
        format!("Tier {} from {} to {}", direction, self.from, self.to)
    }
}

/// Customer state after a points change.
#[derive(Debug, Clone, Serialize)]
pub struct PointsUpdate {
    pub customer: customer::Model,
    pub points_change: i32,
    pub tier_change: Option<TierChange>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoyaltyMetrics {
    pub total_customers: u64,
    pub total_points: i64,
    pub vip_customers: u64,
    pub active_customers: u64,
    #[schema(value_type = String)]
    pub total_spent: Decimal,
    pub average_points: i64,
    pub tier_breakdown: BTreeMap<String, u64>,
}

/// Customer records, points ledger and loyalty tiers
#[derive(Clone)]
pub struct LoyaltyService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl LoyaltyService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(phone = %input.phone))]
    pub async fn create_customer(
        &self,
        input: CreateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        let db = &*self.db_pool;

        let existing = customer::Entity::find()
            .filter(customer::Column::Phone.eq(input.phone.trim()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Customer with phone {} already exists",
                input.phone.trim()
            )));
        }

        let customer = customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            phone: Set(input.phone.trim().to_string()),
            email: Set(input.email),
            gender: Set(input.gender),
            city: Set(input.city),
            whatsapp: Set(input.whatsapp),
            loyalty_level: Set(LoyaltyTier::Bronze),
            points: Set(0),
            color_tag: Set(input.color_tag.unwrap_or(ColorTag::New)),
            total_spent: Set(Decimal::ZERO),
            total_orders: Set(0),
            last_visit: Set(None),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;

        self.event_sender
            .send_or_log(Event::CustomerCreated(customer.id))
            .await;
        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    #[instrument(skip(self))]
    pub async fn get_customer(&self, customer_id: Uuid) -> Result<customer::Model, ServiceError> {
        find_customer(&*self.db_pool, customer_id).await
    }

    #[instrument(skip(self, input))]
    pub async fn update_customer(
        &self,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = find_customer(db, customer_id).await?;

        if let Some(phone) = input.phone.as_deref().map(str::trim) {
            if phone != existing.phone {
                let taken = customer::Entity::find()
                    .filter(customer::Column::Phone.eq(phone))
                    .one(db)
                    .await?;
                if taken.is_some() {
                    return Err(ServiceError::Conflict(format!(
                        "Customer with phone {} already exists",
                        phone
                    )));
                }
            }
        }

        let mut model: customer::ActiveModel = existing.into();
        if let Some(name) = input.name {
            model.name = Set(name.trim().to_string());
        }
        if let Some(phone) = input.phone {
            model.phone = Set(phone.trim().to_string());
        }
        if input.email.is_some() {
            model.email = Set(input.email);
        }
        if input.gender.is_some() {
            model.gender = Set(input.gender);
        }
        if input.city.is_some() {
            model.city = Set(input.city);
        }
        if input.whatsapp.is_some() {
            model.whatsapp = Set(input.whatsapp);
        }
        if let Some(tag) = input.color_tag {
            model.color_tag = Set(tag);
        }
        if let Some(active) = input.is_active {
            model.is_active = Set(active);
        }

        Ok(model.update(db).await?)
    }

    /// Lists customers newest first; returns the page and the total match count.
    #[instrument(skip(self))]
    pub async fn list_customers(
        &self,
        filter: CustomerFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let mut query = customer::Entity::find();

        if let Some(tier) = filter.tier {
            query = query.filter(customer::Column::LoyaltyLevel.eq(tier));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(customer::Column::IsActive.eq(active));
        }
        if let Some(term) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query = query.filter(
                Condition::any()
                    .add(customer::Column::Name.contains(term))
                    .add(customer::Column::Phone.contains(term))
                    .add(customer::Column::Email.contains(term)),
            );
        }

        let paginator = query
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((customers, total))
    }

    /// Applies a points change, clamping the balance at zero and re-tiering the customer.
    #[instrument(skip(self, reason))]
    pub async fn update_points(
        &self,
        customer_id: Uuid,
        change: i32,
        reason: String,
        transaction_type: PointsTransactionType,
        device_id: Option<Uuid>,
        actor: &str,
    ) -> Result<PointsUpdate, ServiceError> {
        if change == 0 {
            return Err(ServiceError::ValidationError(
                "Points change cannot be zero".to_string(),
            ));
        }
        let actor = actor.to_string();
        let update = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let existing = lock_customer(txn, customer_id).await?;
                apply_points(
                    txn,
                    existing,
                    change,
                    transaction_type,
                    &reason,
                    device_id,
                    &actor,
                )
                .await
            })
        })
        .await?;

        self.publish_points_events(&update).await;
        info!(
            %customer_id,
            change,
            balance = update.customer.points,
            "Customer points updated"
        );
        Ok(update)
    }

    /// Redeems a catalog reward, failing when the balance cannot cover it.
    #[instrument(skip(self))]
    pub async fn redeem_reward(
        &self,
        customer_id: Uuid,
        reward_points: i32,
        actor: &str,
    ) -> Result<PointsUpdate, ServiceError> {
        let reward = REWARD_CATALOG
            .iter()
            .find(|r| r.points == reward_points)
            .copied()
            .ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "No reward costs {} points",
                    reward_points
                ))
            })?;

        let actor = actor.to_string();
        let update = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                // Check and debit under the same row lock
                let existing = lock_customer(txn, customer_id).await?;
                if existing.points < reward.points {
                    return Err(ServiceError::InvalidOperation(format!(
                        "Insufficient points: {} available, {} required",
                        existing.points, reward.points
                    )));
                }
                apply_points(
                    txn,
                    existing,
                    -reward.points,
                    PointsTransactionType::Redeemed,
                    &format!("Redeemed reward: {}", reward.name),
                    None,
                    &actor,
                )
                .await
            })
        })
        .await?;

        self.publish_points_events(&update).await;
        info!(
            %customer_id,
            reward = reward.name,
            balance = update.customer.points,
            "Loyalty reward redeemed"
        );
        Ok(update)
    }

    #[instrument(skip(self))]
    pub async fn points_history(
        &self,
        customer_id: Uuid,
        limit: u64,
    ) -> Result<Vec<points_transaction::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_customer(db, customer_id).await?;

        Ok(points_transaction::Entity::find()
            .filter(points_transaction::Column::CustomerId.eq(customer_id))
            .order_by_desc(points_transaction::Column::CreatedAt)
            .limit(limit)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn loyalty_metrics(&self) -> Result<LoyaltyMetrics, ServiceError> {
        let customers = customer::Entity::find().all(&*self.db_pool).await?;

        let total_customers = customers.len() as u64;
        let total_points: i64 = customers.iter().map(|c| i64::from(c.points)).sum();
        let total_spent: Decimal = customers.iter().map(|c| c.total_spent).sum();
        let vip_customers = customers
            .iter()
            .filter(|c| c.loyalty_level == LoyaltyTier::Platinum)
            .count() as u64;
        let active_customers = customers.iter().filter(|c| c.is_active).count() as u64;

        let mut tier_breakdown = BTreeMap::new();
        for c in &customers {
            *tier_breakdown
                .entry(c.loyalty_level.to_string())
                .or_insert(0u64) += 1;
        }

        let average_points = if total_customers > 0 {
            (total_points as f64 / total_customers as f64).round() as i64
        } else {
            0
        };

        Ok(LoyaltyMetrics {
            total_customers,
            total_points,
            vip_customers,
            active_customers,
            total_spent,
            average_points,
            tier_breakdown,
        })
    }

    pub(crate) async fn publish_points_events(&self, update: &PointsUpdate) {
        for event in points_events(update) {
            self.event_sender.send_or_log(event).await;
        }
    }
}

/// Events describing a committed points change.
pub(crate) fn points_events(update: &PointsUpdate) -> Vec<Event> {
    let mut events = vec![Event::PointsUpdated {
        customer_id: update.customer.id,
        change: update.points_change,
        balance: update.customer.points,
    }];
    if let Some(tc) = &update.tier_change {
        events.push(Event::LoyaltyTierChanged {
            customer_id: update.customer.id,
            from: tc.from.to_string(),
            to: tc.to.to_string(),
        });
    }
    events
}

/// Folds a completed purchase into the customer's stats, points and tier.
///
/// Runs on the caller's connection so it joins the sale's transaction.
pub async fn accrue_purchase<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    total: Decimal,
    sale_number: &str,
    actor: &str,
) -> Result<PointsUpdate, ServiceError> {
    let existing = lock_customer(conn, customer_id).await?;
    let earned = points_for_purchase(total);
    let new_points = existing.points.saturating_add(earned).max(0);
    let tier_change = tier_change(existing.loyalty_level, new_points);
    let total_spent = existing.total_spent.checked_add(total).ok_or_else(|| {
        ServiceError::ValidationError("Customer total spent is out of range".to_string())
    })?;

    let mut model: customer::ActiveModel = existing.clone().into();
    model.total_spent = Set(total_spent);
    model.total_orders = Set(existing.total_orders.saturating_add(1));
    model.points = Set(new_points);
    model.last_visit = Set(Some(Utc::now()));
    if existing.color_tag == ColorTag::New {
        model.color_tag = Set(ColorTag::Purchased);
    }
    if let Some(tc) = &tier_change {
        model.loyalty_level = Set(tc.to);
    }
    let customer = model.update(conn).await?;

    if earned > 0 || tier_change.is_some() {
        record_points_rows(
            conn,
            customer_id,
            earned,
            PointsTransactionType::Earned,
            &format!("Purchase {}", sale_number),
            None,
            actor,
            tier_change.as_ref(),
        )
        .await?;
    }

    Ok(PointsUpdate {
        customer,
        points_change: earned,
        tier_change,
    })
}

pub(crate) async fn find_customer<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> Result<customer::Model, ServiceError> {
    customer::Entity::find_by_id(customer_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
}

/// Reads the customer `FOR UPDATE` on Postgres so points changes serialize.
pub(crate) async fn lock_customer<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> Result<customer::Model, ServiceError> {
    let mut query = customer::Entity::find_by_id(customer_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Customer {} not found", customer_id)))
}

/// Writes a points change onto an already locked customer row.
async fn apply_points<C: ConnectionTrait>(
    conn: &C,
    existing: customer::Model,
    change: i32,
    transaction_type: PointsTransactionType,
    reason: &str,
    device_id: Option<Uuid>,
    actor: &str,
) -> Result<PointsUpdate, ServiceError> {
    let customer_id = existing.id;
    let new_points = existing.points.saturating_add(change).max(0);
    let tier_change = tier_change(existing.loyalty_level, new_points);

    let mut model: customer::ActiveModel = existing.into();
    model.points = Set(new_points);
    if let Some(tc) = &tier_change {
        model.loyalty_level = Set(tc.to);
    }
    let customer = model.update(conn).await?;

    record_points_rows(
        conn,
        customer_id,
        change,
        transaction_type,
        reason,
        device_id,
        actor,
        tier_change.as_ref(),
    )
    .await?;

    Ok(PointsUpdate {
        customer,
        points_change: change,
        tier_change,
    })
}

fn tier_change(current: LoyaltyTier, new_points: i32) -> Option<TierChange> {
    let next = calculate_tier(new_points);
    (next != current).then_some(TierChange {
        from: current,
        to: next,
    })
}

#[allow(clippy::too_many_arguments)]
async fn record_points_rows<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
    change: i32,
    transaction_type: PointsTransactionType,
    reason: &str,
    device_id: Option<Uuid>,
    actor: &str,
    tier_change: Option<&TierChange>,
) -> Result<(), ServiceError> {
    let now = Utc::now();

    if change != 0 {
        points_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            points_change: Set(change),
            transaction_type: Set(transaction_type),
            reason: Set(reason.to_string()),
            device_id: Set(device_id),
            created_by: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }

    if let Some(tc) = tier_change {
        points_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            points_change: Set(0),
            transaction_type: Set(PointsTransactionType::Adjusted),
            reason: Set(tc.reason()),
            device_id: Set(device_id),
            created_by: Set(actor.to_string()),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn tier_boundaries() {
        assert_eq!(calculate_tier(0), LoyaltyTier::Bronze);
        assert_eq!(calculate_tier(999), LoyaltyTier::Bronze);
        assert_eq!(calculate_tier(1000), LoyaltyTier::Silver);
        assert_eq!(calculate_tier(1999), LoyaltyTier::Silver);
        assert_eq!(calculate_tier(2000), LoyaltyTier::Gold);
        assert_eq!(calculate_tier(4999), LoyaltyTier::Gold);
        assert_eq!(calculate_tier(5000), LoyaltyTier::Platinum);
    }

    #[test]
    fn purchase_points_floor_per_thousand() {
        assert_eq!(points_for_purchase(dec!(999.99)), 0);
        assert_eq!(points_for_purchase(dec!(15000)), 15);
        assert_eq!(points_for_purchase(dec!(15999)), 15);
        assert_eq!(points_for_purchase(dec!(-50)), 0);
    }

    #[test]
    fn tier_change_reason_names_direction() {
        let up = TierChange {
            from: LoyaltyTier::Bronze,
            to: LoyaltyTier::Silver,
        };
        assert_eq!(up.reason(), "Tier upgraded from bronze to silver");

        let down = TierChange {
            from: LoyaltyTier::Gold,
            to: LoyaltyTier::Silver,
        };
        assert_eq!(down.reason(), "Tier downgraded from gold to silver");
    }

    #[test]
    fn tier_change_is_none_within_tier() {
        assert!(tier_change(LoyaltyTier::Silver, 1500).is_none());
        assert!(tier_change(LoyaltyTier::Silver, 2000).is_some());
    }

    #[test]
    fn reward_catalog_is_sorted_by_cost() {
        let costs: Vec<i32> = REWARD_CATALOG.iter().map(|r| r.points).collect();
        assert_eq!(costs, vec![500, 1000, 2000, 5000]);
    }
}
