use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[sea_orm(string_value = "bank")]
    Bank,
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "mobile_money")]
    MobileMoney,
    #[sea_orm(string_value = "credit_card")]
    CreditCard,
    #[sea_orm(string_value = "savings")]
    Savings,
    #[sea_orm(string_value = "investment")]
    Investment,
    #[sea_orm(string_value = "other")]
    Other,
}

impl AccountType {
    /// Credit lines may carry a negative balance.
    pub fn allows_overdraft(self) -> bool {
        matches!(self, Self::CreditCard)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "finance_accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    #[sea_orm(nullable)]
    pub account_number: Option<String>,
    #[sea_orm(nullable)]
    pub bank_name: Option<String>,
    pub currency: String,
    pub is_active: bool,
    pub is_payment_method: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
