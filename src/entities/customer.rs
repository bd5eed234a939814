use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Loyalty tier derived from the customer's point balance.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LoyaltyTier {
    #[sea_orm(string_value = "bronze")]
    Bronze,
    #[sea_orm(string_value = "silver")]
    Silver,
    #[sea_orm(string_value = "gold")]
    Gold,
    #[sea_orm(string_value = "platinum")]
    Platinum,
}

impl LoyaltyTier {
    /// Minimum points needed to hold this tier.
    pub fn min_points(self) -> i32 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 1000,
            Self::Gold => 2000,
            Self::Platinum => 5000,
        }
    }

    /// Discount percentage granted at checkout.
    pub fn discount_percent(self) -> u32 {
        match self {
            Self::Bronze => 0,
            Self::Silver => 2,
            Self::Gold => 3,
            Self::Platinum => 5,
        }
    }

    pub fn for_points(points: i32) -> Self {
        [Self::Platinum, Self::Gold, Self::Silver]
            .into_iter()
            .find(|tier| points >= tier.min_points())
            .unwrap_or(Self::Bronze)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ColorTag {
    #[sea_orm(string_value = "new")]
    New,
    #[sea_orm(string_value = "vip")]
    Vip,
    #[sea_orm(string_value = "complainer")]
    Complainer,
    #[sea_orm(string_value = "purchased")]
    Purchased,
}

/// Shop customer with loyalty standing.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub phone: String,
    #[sea_orm(nullable)]
    pub email: Option<String>,
    #[sea_orm(nullable)]
    pub gender: Option<String>,
    #[sea_orm(nullable)]
    pub city: Option<String>,
    #[sea_orm(nullable)]
    pub whatsapp: Option<String>,
    pub loyalty_level: LoyaltyTier,
    pub points: i32,
    pub color_tag: ColorTag,
    pub total_spent: Decimal,
    pub total_orders: i32,
    #[sea_orm(nullable)]
    pub last_visit: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::points_transaction::Entity")]
    PointsHistory,
    #[sea_orm(has_many = "super::device::Entity")]
    Devices,
}

impl Related<super::points_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PointsHistory.def()
    }
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Devices.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
