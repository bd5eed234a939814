use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ConnectionTrait, Set};
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
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "sent")]
    Sent,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "partially_received")]
    PartiallyReceived,
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Manual status changes. `received` and `partially_received` are only
    /// reachable through the receive workflow.
    pub fn can_transition_to(self, next: Self) -> bool {
        use PurchaseOrderStatus::*;
        matches!(
            (self, next),
            (Draft, Sent)
                | (Draft, Cancelled)
                | (Sent, Confirmed)
                | (Sent, Cancelled)
                | (Confirmed, Cancelled)
                | (PartiallyReceived, Cancelled)
        )
    }

    pub fn can_receive(self) -> bool {
        matches!(
            self,
            Self::Sent | Self::Confirmed | Self::PartiallyReceived
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub supplier_id: Uuid,
    pub status: PurchaseOrderStatus,
    pub currency: String,
    pub total_amount: Decimal,
    #[sea_orm(nullable)]
    pub expected_delivery: Option<NaiveDate>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_order_item::Entity")]
    Items,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        active_model.updated_at = Set(Utc::now());
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::PurchaseOrderStatus::{self, *};

    #[test]
    fn receive_states_cannot_be_set_manually() {
        for from in [Draft, Sent, Confirmed, PartiallyReceived] {
            assert!(!from.can_transition_to(Received));
            assert!(!from.can_transition_to(PartiallyReceived));
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        let all = [Draft, Sent, Confirmed, PartiallyReceived, Received, Cancelled];
        for to in all {
            assert!(!Received.can_transition_to(to));
            assert!(!Cancelled.can_transition_to(to));
        }
    }

    #[test]
    fn only_dispatched_orders_can_be_received() {
        let receivable: Vec<PurchaseOrderStatus> = [Draft, Sent, Confirmed, PartiallyReceived, Received, Cancelled]
            .into_iter()
            .filter(|s| s.can_receive())
            .collect();
        assert_eq!(receivable, vec![Sent, Confirmed, PartiallyReceived]);
    }
}
