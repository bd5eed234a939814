use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
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
pub enum RepairPartStatus {
    #[sea_orm(string_value = "needed")]
    Needed,
    #[sea_orm(string_value = "ordered")]
    Ordered,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "used")]
    Used,
}

impl RepairPartStatus {
    /// Still waiting on the part to arrive.
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Needed | Self::Ordered)
    }
}

/// Spare part requested for a device repair.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repair_parts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub device_id: Uuid,
    pub spare_part_id: Uuid,
    pub quantity_needed: i32,
    pub quantity_used: i32,
    pub cost_per_unit: Decimal,
    pub status: RepairPartStatus,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
