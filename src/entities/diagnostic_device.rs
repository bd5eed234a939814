use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where a device stands in testing and admin review.
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
pub enum DiagnosticResult {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "passed")]
    Passed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "partially_failed")]
    PartiallyFailed,
    #[sea_orm(string_value = "repair_required")]
    RepairRequired,
    #[sea_orm(string_value = "replacement_required")]
    ReplacementRequired,
    #[sea_orm(string_value = "no_action_required")]
    NoActionRequired,
    #[sea_orm(string_value = "escalated")]
    Escalated,
    #[sea_orm(string_value = "sent_to_care")]
    SentToCare,
}

impl DiagnosticResult {
    /// Still open to new check results.
    pub fn is_testing(self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Passed | Self::Failed | Self::PartiallyFailed
        )
    }
}

/// Admin decision for a tested device.
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
pub enum NextAction {
    #[sea_orm(string_value = "repair")]
    Repair,
    #[sea_orm(string_value = "replace")]
    Replace,
    #[sea_orm(string_value = "ignore")]
    Ignore,
    #[sea_orm(string_value = "escalate")]
    Escalate,
}

impl NextAction {
    pub fn result_status(self) -> DiagnosticResult {
        match self {
            Self::Repair => DiagnosticResult::RepairRequired,
            Self::Replace => DiagnosticResult::ReplacementRequired,
            Self::Ignore => DiagnosticResult::NoActionRequired,
            Self::Escalate => DiagnosticResult::Escalated,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "diagnostic_devices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub request_id: Uuid,
    pub device_name: String,
    #[sea_orm(nullable)]
    pub serial_number: Option<String>,
    #[sea_orm(nullable)]
    pub model: Option<String>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,
    pub result_status: DiagnosticResult,
    #[sea_orm(nullable)]
    pub admin_feedback: Option<String>,
    #[sea_orm(nullable)]
    pub next_action: Option<NextAction>,
    #[sea_orm(nullable)]
    pub feedback_submitted_by: Option<String>,
    #[sea_orm(nullable)]
    pub feedback_submitted_at: Option<DateTime<Utc>>,
    #[sea_orm(nullable)]
    pub repair_notes: Option<String>,
    #[sea_orm(nullable)]
    pub repair_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::diagnostic_request::Entity",
        from = "Column::RequestId",
        to = "super::diagnostic_request::Column::Id"
    )]
    Request,
    #[sea_orm(has_many = "super::diagnostic_check::Entity")]
    Checks,
}

impl Related<super::diagnostic_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Request.def()
    }
}

impl Related<super::diagnostic_check::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Checks.def()
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
            if let ActiveValue::NotSet = active_model.result_status {
                active_model.result_status = Set(DiagnosticResult::Pending);
            }
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(now);
            }
        }
        active_model.updated_at = Set(now);

        Ok(active_model)
    }
}
