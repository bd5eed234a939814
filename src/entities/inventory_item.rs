use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "sold")]
    Sold,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "damaged")]
    Damaged,
}

/// A serialized unit of stock (phone, laptop) tracked by serial number.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    #[sea_orm(nullable)]
    pub variant_id: Option<Uuid>,
    #[sea_orm(nullable)]
    pub purchase_order_id: Option<Uuid>,
    #[sea_orm(unique)]
    pub serial_number: String,
    #[sea_orm(nullable)]
    pub imei: Option<String>,
    #[sea_orm(nullable)]
    pub mac_address: Option<String>,
    #[sea_orm(nullable)]
    pub barcode: Option<String>,
    #[sea_orm(nullable)]
    pub location: Option<String>,
    pub status: ItemStatus,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub cost_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
