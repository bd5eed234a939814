use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Repair lifecycle of a device checked in by customer care.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceStatus {
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "diagnosis-started")]
    DiagnosisStarted,
    #[sea_orm(string_value = "awaiting-parts")]
    AwaitingParts,
    #[sea_orm(string_value = "parts-arrived")]
    PartsArrived,
    #[sea_orm(string_value = "in-repair")]
    InRepair,
    #[sea_orm(string_value = "reassembled-testing")]
    ReassembledTesting,
    #[sea_orm(string_value = "repair-complete")]
    RepairComplete,
    #[sea_orm(string_value = "returned-to-customer-care")]
    ReturnedToCustomerCare,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub brand: String,
    pub model: String,
    #[sea_orm(nullable)]
    pub serial_number: Option<String>,
    pub issue_description: String,
    pub status: DeviceStatus,
    /// Technician user id
    #[sea_orm(nullable)]
    pub assigned_to: Option<String>,
    pub expected_return_date: NaiveDate,
    pub repair_price: Decimal,
    pub repair_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.brand, self.model)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::device_transition::Entity")]
    Transitions,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::device_transition::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transitions.def()
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
            if let ActiveValue::NotSet = active_model.repair_count {
                active_model.repair_count = Set(0);
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
