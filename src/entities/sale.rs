use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[sea_orm(string_value = "fixed")]
    Fixed,
    #[sea_orm(string_value = "percentage")]
    Percentage,
}

/// Point-of-sale transaction header.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub sale_number: String,
    pub customer_id: Uuid,
    #[sea_orm(nullable)]
    pub customer_name: Option<String>,
    #[sea_orm(nullable)]
    pub customer_phone: Option<String>,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    #[sea_orm(nullable)]
    pub discount_type: Option<DiscountType>,
    #[sea_orm(nullable)]
    pub discount_value: Option<Decimal>,
    pub tax: Decimal,
    pub total_amount: Decimal,
    /// `{type, details, amount}` as captured at the till
    #[sea_orm(column_type = "Json")]
    pub payment_method: Json,
    pub status: SaleStatus,
    pub created_by: String,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Upper-cased payment type for receipts and SMS, e.g. `CASH`.
    pub fn payment_type_label(&self) -> String {
        self.payment_method
            .get("type")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_uppercase()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_item::Entity")]
    Items,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
