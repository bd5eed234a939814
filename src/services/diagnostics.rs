use crate::{
    db::{with_transaction, DbPool},
    entities::{
        diagnostic_check::{self, CheckResult},
        diagnostic_device::{self, DiagnosticResult, NextAction},
        diagnostic_request::{self, DiagnosticPriority, DiagnosticStatus},
        diagnostic_template,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Template used when no template matches the device type.
pub const GENERAL_TEMPLATE: &str = "general";

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DiagnosticDeviceInput {
    #[validate(length(min = 1, max = 255, message = "Device name is required"))]
    pub device_name: String,
    #[validate(length(max = 100))]
    pub serial_number: Option<String>,
    #[validate(length(max = 100))]
    pub model: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Identical units to test; each gets its own row
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: Option<i32>,
    /// Serial per unit when quantity is above one
    #[serde(default)]
    pub individual_serials: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateDiagnosticRequestInput {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub priority: Option<DiagnosticPriority>,
    /// Technician user id
    pub assigned_to: Option<String>,
    #[validate]
    #[validate(length(min = 1, max = 50, message = "Between 1 and 50 devices are required"))]
    pub devices: Vec<DiagnosticDeviceInput>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateDiagnosticRequestInput {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    pub priority: Option<DiagnosticPriority>,
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DiagnosticFilter {
    pub status: Option<DiagnosticStatus>,
    pub assigned_to: Option<String>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RecordCheckInput {
    #[validate(length(min = 1, max = 255, message = "Test item is required"))]
    pub test_item: String,
    pub result: CheckResult,
    #[validate(length(max = 2000))]
    pub remarks: Option<String>,
    #[validate(length(max = 2048))]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AdminFeedbackInput {
    #[validate(length(min = 1, max = 2000, message = "Feedback is required"))]
    pub admin_feedback: String,
    pub next_action: NextAction,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CompleteActionInput {
    #[validate(length(max = 2000))]
    pub completion_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct TemplateInput {
    #[validate(length(min = 1, max = 64, message = "Device type is required"))]
    pub device_type: String,
    #[validate(length(min = 1, max = 100, message = "Between 1 and 100 checklist items are required"))]
    pub checklist_items: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticDeviceDetail {
    #[serde(flatten)]
    pub device: diagnostic_device::Model,
    pub checks: Vec<diagnostic_check::Model>,
    pub check_count: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
}

impl DiagnosticDeviceDetail {
    fn new(device: diagnostic_device::Model, checks: Vec<diagnostic_check::Model>) -> Self {
        let passed_checks = checks
            .iter()
            .filter(|c| c.result == CheckResult::Passed)
            .count();
        Self {
            check_count: checks.len(),
            failed_checks: checks.len() - passed_checks,
            passed_checks,
            device,
            checks,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticRequestDetail {
    #[serde(flatten)]
    pub request: diagnostic_request::Model,
    pub devices: Vec<DiagnosticDeviceDetail>,
}

/// Request row with per-result device counts, for list views.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticRequestSummary {
    #[serde(flatten)]
    pub request: diagnostic_request::Model,
    pub device_count: usize,
    pub passed_devices: usize,
    pub failed_devices: usize,
    pub pending_devices: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DiagnosticStats {
    pub total_requests: u64,
    pub pending_requests: u64,
    pub in_progress_requests: u64,
    pub completed_requests: u64,
    pub total_devices: u64,
    pub passed_devices: u64,
    pub failed_devices: u64,
    pub partially_failed_devices: u64,
    pub pending_devices: u64,
}

/// One device row to insert, after quantities are expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedDevice {
    pub device_name: String,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub notes: Option<String>,
}

/// Expands each input into one row per unit.
///
/// Units past the first take their serial from `individual_serials`, falling
/// back to `<serial or SN>-<n>`.
pub fn expand_devices(inputs: &[DiagnosticDeviceInput]) -> Vec<ExpandedDevice> {
    let mut expanded = Vec::new();
    for input in inputs {
        let quantity = input.quantity.unwrap_or(1).max(1);
        if quantity == 1 {
            expanded.push(ExpandedDevice {
                device_name: input.device_name.clone(),
                serial_number: input.serial_number.clone(),
                model: input.model.clone(),
                notes: input.notes.clone(),
            });
            continue;
        }
        let base = input.serial_number.as_deref().unwrap_or("SN");
        for n in 0..quantity as usize {
            let serial = input
                .individual_serials
                .get(n)
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}-{}", base, n + 1));
            expanded.push(ExpandedDevice {
                device_name: input.device_name.clone(),
                serial_number: Some(serial),
                model: input.model.clone(),
                notes: input.notes.clone(),
            });
        }
    }
    expanded
}

/// Device result implied by its check results.
pub fn result_from_checks(results: &[CheckResult]) -> DiagnosticResult {
    let failed = results.iter().filter(|r| **r == CheckResult::Failed).count();
    match (results.len(), failed) {
        (0, _) => DiagnosticResult::Pending,
        (_, 0) => DiagnosticResult::Passed,
        (total, failed) if failed == total => DiagnosticResult::Failed,
        _ => DiagnosticResult::PartiallyFailed,
    }
}

/// Request status implied by the results of its devices.
pub fn request_status_for(results: &[DiagnosticResult]) -> DiagnosticStatus {
    if results.is_empty() {
        return DiagnosticStatus::Pending;
    }
    if results.iter().all(|r| !r.is_testing()) {
        DiagnosticStatus::AdminReviewed
    } else if results.iter().all(|r| *r != DiagnosticResult::Pending) {
        DiagnosticStatus::Completed
    } else if results.iter().any(|r| *r != DiagnosticResult::Pending) {
        DiagnosticStatus::InProgress
    } else {
        DiagnosticStatus::Pending
    }
}

/// Template device type for a free-text model name.
pub fn device_type_for_model(model: &str) -> &'static str {
    let model = model.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| model.contains(w));
    if has(&["laptop", "notebook", "macbook"]) {
        "laptop"
    } else if has(&["tablet", "ipad"]) {
        "tablet"
    } else if has(&["phone", "mobile", "android"]) {
        "phone"
    } else {
        GENERAL_TEMPLATE
    }
}

fn normalize_device_type(device_type: &str) -> String {
    device_type.trim().to_lowercase()
}

fn normalize_checklist(items: Vec<String>) -> Result<serde_json::Value, ServiceError> {
    let items: Vec<String> = items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    if items.is_empty() {
        return Err(ServiceError::ValidationError(
            "Checklist items cannot be blank".to_string(),
        ));
    }
    Ok(serde_json::json!(items))
}

/// Diagnostic batches, per-device check results, admin review and templates
#[derive(Clone)]
pub struct DiagnosticService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl DiagnosticService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_request(
        &self,
        input: CreateDiagnosticRequestInput,
        actor: &str,
    ) -> Result<DiagnosticRequestDetail, ServiceError> {
        input.validate()?;
        let expanded = expand_devices(&input.devices);
        let actor = actor.to_string();

        let detail = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let request = diagnostic_request::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    title: Set(input.title),
                    notes: Set(input.notes),
                    priority: Set(input.priority.unwrap_or_default()),
                    status: Set(DiagnosticStatus::Pending),
                    created_by: Set(actor),
                    assigned_to: Set(input.assigned_to),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                let mut devices = Vec::with_capacity(expanded.len());
                for unit in expanded {
                    let device = diagnostic_device::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        request_id: Set(request.id),
                        device_name: Set(unit.device_name),
                        serial_number: Set(unit.serial_number),
                        model: Set(unit.model),
                        notes: Set(unit.notes),
                        result_status: Set(DiagnosticResult::Pending),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    devices.push(DiagnosticDeviceDetail::new(device, Vec::new()));
                }
                Ok(DiagnosticRequestDetail { request, devices })
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::DiagnosticRequestCreated {
                request_id: detail.request.id,
                device_count: detail.devices.len(),
            })
            .await;
        info!(
            request_id = %detail.request.id,
            device_count = detail.devices.len(),
            "Diagnostic request created"
        );
        Ok(detail)
    }

    #[instrument(skip(self))]
    pub async fn list_requests(
        &self,
        filter: DiagnosticFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<DiagnosticRequestSummary>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = diagnostic_request::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(diagnostic_request::Column::Status.eq(status));
        }
        if let Some(technician) = filter.assigned_to {
            query = query.filter(diagnostic_request::Column::AssignedTo.eq(technician));
        }
        if let Some(creator) = filter.created_by {
            query = query.filter(diagnostic_request::Column::CreatedBy.eq(creator));
        }

        let paginator = query
            .order_by_desc(diagnostic_request::Column::CreatedAt)
            .paginate(db, limit);
        let total = paginator.num_items().await?;
        let requests = paginator.fetch_page(page.saturating_sub(1)).await?;

        let ids: Vec<Uuid> = requests.iter().map(|r| r.id).collect();
        let mut results: HashMap<Uuid, Vec<DiagnosticResult>> = HashMap::new();
        if !ids.is_empty() {
            let rows: Vec<(Uuid, DiagnosticResult)> = diagnostic_device::Entity::find()
                .select_only()
                .column(diagnostic_device::Column::RequestId)
                .column(diagnostic_device::Column::ResultStatus)
                .filter(diagnostic_device::Column::RequestId.is_in(ids))
                .into_tuple()
                .all(db)
                .await?;
            for (request_id, result) in rows {
                results.entry(request_id).or_default().push(result);
            }
        }

        let summaries = requests
            .into_iter()
            .map(|request| {
                let devices = results.remove(&request.id).unwrap_or_default();
                let count = |wanted: DiagnosticResult| devices.iter().filter(|r| **r == wanted).count();
                DiagnosticRequestSummary {
                    device_count: devices.len(),
                    passed_devices: count(DiagnosticResult::Passed),
                    failed_devices: count(DiagnosticResult::Failed),
                    pending_devices: count(DiagnosticResult::Pending),
                    request,
                }
            })
            .collect();
        Ok((summaries, total))
    }

    #[instrument(skip(self))]
    pub async fn get_request(&self, request_id: Uuid) -> Result<DiagnosticRequestDetail, ServiceError> {
        let db = &*self.db_pool;
        let request = find_request(db, request_id).await?;
        let devices = diagnostic_device::Entity::find()
            .filter(diagnostic_device::Column::RequestId.eq(request_id))
            .order_by_asc(diagnostic_device::Column::CreatedAt)
            .find_with_related(diagnostic_check::Entity)
            .all(db)
            .await?;

        let devices = devices
            .into_iter()
            .map(|(device, mut checks)| {
                checks.sort_by_key(|c| c.created_at);
                DiagnosticDeviceDetail::new(device, checks)
            })
            .collect();
        Ok(DiagnosticRequestDetail { request, devices })
    }

    #[instrument(skip(self, input))]
    pub async fn update_request(
        &self,
        request_id: Uuid,
        input: UpdateDiagnosticRequestInput,
    ) -> Result<diagnostic_request::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let request = find_request(db, request_id).await?;

        let mut model: diagnostic_request::ActiveModel = request.into();
        if let Some(title) = input.title {
            model.title = Set(title);
        }
        if let Some(notes) = input.notes {
            model.notes = Set(Some(notes));
        }
        if let Some(priority) = input.priority {
            model.priority = Set(priority);
        }
        if let Some(technician) = input.assigned_to {
            model.assigned_to = Set(Some(technician));
        }
        Ok(model.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_device(&self, device_id: Uuid) -> Result<DiagnosticDeviceDetail, ServiceError> {
        let db = &*self.db_pool;
        let device = find_device(db, device_id).await?;
        let checks = checks_for(db, device_id).await?;
        Ok(DiagnosticDeviceDetail::new(device, checks))
    }

    /// Records one check result and refreshes the device and request status.
    #[instrument(skip(self, input), fields(test_item = %input.test_item, result = %input.result))]
    pub async fn record_check(
        &self,
        device_id: Uuid,
        input: RecordCheckInput,
    ) -> Result<DiagnosticDeviceDetail, ServiceError> {
        input.validate()?;
        let request_id = find_device(&*self.db_pool, device_id).await?.request_id;

        let detail = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                lock_request(txn, request_id).await?;
                let device = lock_device(txn, device_id).await?;
                ensure_testing(&device)?;

                diagnostic_check::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    device_id: Set(device_id),
                    test_item: Set(input.test_item),
                    result: Set(input.result),
                    remarks: Set(input.remarks),
                    image_url: Set(input.image_url),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                }
                .insert(txn)
                .await?;

                refresh_device(txn, device).await
            })
        })
        .await?;

        info!(
            device_id = %device_id,
            result_status = %detail.device.result_status,
            "Diagnostic check recorded"
        );
        Ok(detail)
    }

    #[instrument(skip(self, input))]
    pub async fn update_check(
        &self,
        check_id: Uuid,
        input: RecordCheckInput,
    ) -> Result<DiagnosticDeviceDetail, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let check = diagnostic_check::Entity::find_by_id(check_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Diagnostic check {} not found", check_id)))?;
        let request_id = find_device(db, check.device_id).await?.request_id;

        with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                lock_request(txn, request_id).await?;
                let device = lock_device(txn, check.device_id).await?;
                ensure_testing(&device)?;

                let mut model: diagnostic_check::ActiveModel = check.into();
                model.test_item = Set(input.test_item);
                model.result = Set(input.result);
                model.remarks = Set(input.remarks);
                model.image_url = Set(input.image_url);
                model.updated_at = Set(Utc::now());
                model.update(txn).await?;

                refresh_device(txn, device).await
            })
        })
        .await
    }

    /// Stores the admin decision for a tested device.
    #[instrument(skip(self, input), fields(next_action = %input.next_action))]
    pub async fn submit_feedback(
        &self,
        device_id: Uuid,
        input: AdminFeedbackInput,
        actor: &str,
    ) -> Result<diagnostic_device::Model, ServiceError> {
        input.validate()?;
        let request_id = find_device(&*self.db_pool, device_id).await?.request_id;
        let actor = actor.to_string();

        let device = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                lock_request(txn, request_id).await?;
                let device = lock_device(txn, device_id).await?;
                if device.result_status == DiagnosticResult::Pending {
                    return Err(ServiceError::InvalidStatus(format!(
                        "Device {} has no check results yet",
                        device_id
                    )));
                }
                ensure_testing(&device)?;

                let mut model: diagnostic_device::ActiveModel = device.into();
                model.admin_feedback = Set(Some(input.admin_feedback));
                model.next_action = Set(Some(input.next_action));
                model.feedback_submitted_by = Set(Some(actor));
                model.feedback_submitted_at = Set(Some(Utc::now()));
                model.result_status = Set(input.next_action.result_status());
                let device = model.update(txn).await?;

                sync_request_status(txn, request_id).await?;
                Ok(device)
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::DiagnosticDeviceReviewed {
                device_id: device.id,
                request_id: device.request_id,
                result_status: device.result_status.to_string(),
            })
            .await;
        info!(device_id = %device.id, result_status = %device.result_status, "Admin feedback submitted");
        Ok(device)
    }

    /// Closes the admin action and hands the device back to customer care.
    #[instrument(skip(self, input))]
    pub async fn complete_action(
        &self,
        device_id: Uuid,
        input: CompleteActionInput,
    ) -> Result<diagnostic_device::Model, ServiceError> {
        input.validate()?;
        let device = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let device = lock_device(txn, device_id).await?;
                if device.next_action.is_none() || device.result_status.is_testing() {
                    return Err(ServiceError::InvalidStatus(format!(
                        "Device {} has not been reviewed",
                        device_id
                    )));
                }
                if device.result_status == DiagnosticResult::SentToCare {
                    return Err(ServiceError::InvalidStatus(format!(
                        "Device {} was already sent to customer care",
                        device_id
                    )));
                }

                let mut model: diagnostic_device::ActiveModel = device.into();
                model.repair_notes = Set(input.completion_notes);
                model.repair_completed_at = Set(Some(Utc::now()));
                model.result_status = Set(DiagnosticResult::SentToCare);
                Ok(model.update(txn).await?)
            })
        })
        .await?;

        info!(device_id = %device.id, "Diagnostic device sent to customer care");
        Ok(device)
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<DiagnosticStats, ServiceError> {
        let db = &*self.db_pool;
        let statuses: Vec<DiagnosticStatus> = diagnostic_request::Entity::find()
            .select_only()
            .column(diagnostic_request::Column::Status)
            .into_tuple()
            .all(db)
            .await?;
        let results: Vec<DiagnosticResult> = diagnostic_device::Entity::find()
            .select_only()
            .column(diagnostic_device::Column::ResultStatus)
            .into_tuple()
            .all(db)
            .await?;
        Ok(stats_from(&statuses, &results))
    }

    #[instrument(skip(self))]
    pub async fn list_templates(&self) -> Result<Vec<diagnostic_template::Model>, ServiceError> {
        Ok(diagnostic_template::Entity::find()
            .order_by_asc(diagnostic_template::Column::DeviceType)
            .all(&*self.db_pool)
            .await?)
    }

    /// Template for a device model, falling back to the general template.
    #[instrument(skip(self))]
    pub async fn template_for_model(
        &self,
        model: &str,
    ) -> Result<diagnostic_template::Model, ServiceError> {
        let db = &*self.db_pool;
        let device_type = device_type_for_model(model);
        let mut candidates = vec![device_type];
        if device_type != GENERAL_TEMPLATE {
            candidates.push(GENERAL_TEMPLATE);
        }
        for candidate in candidates {
            if let Some(template) = find_template_by_type(db, candidate).await? {
                return Ok(template);
            }
        }
        Err(ServiceError::NotFound(format!(
            "No diagnostic template for {}",
            model
        )))
    }

    #[instrument(skip(self, input), fields(device_type = %input.device_type))]
    pub async fn create_template(
        &self,
        input: TemplateInput,
    ) -> Result<diagnostic_template::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let device_type = normalize_device_type(&input.device_type);
        if find_template_by_type(db, &device_type).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Diagnostic template for {} already exists",
                device_type
            )));
        }

        let now = Utc::now();
        let template = diagnostic_template::ActiveModel {
            id: Set(Uuid::new_v4()),
            device_type: Set(device_type),
            checklist_items: Set(normalize_checklist(input.checklist_items)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        info!(template_id = %template.id, "Diagnostic template created");
        Ok(template)
    }

    #[instrument(skip(self, input), fields(device_type = %input.device_type))]
    pub async fn update_template(
        &self,
        template_id: Uuid,
        input: TemplateInput,
    ) -> Result<diagnostic_template::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        let template = find_template(db, template_id).await?;
        let device_type = normalize_device_type(&input.device_type);
        if let Some(other) = find_template_by_type(db, &device_type).await? {
            if other.id != template_id {
                return Err(ServiceError::Conflict(format!(
                    "Diagnostic template for {} already exists",
                    device_type
                )));
            }
        }

        let mut model: diagnostic_template::ActiveModel = template.into();
        model.device_type = Set(device_type);
        model.checklist_items = Set(normalize_checklist(input.checklist_items)?);
        model.updated_at = Set(Utc::now());
        Ok(model.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_template(&self, template_id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        find_template(db, template_id).await?;
        diagnostic_template::Entity::delete_by_id(template_id)
            .exec(db)
            .await?;
        info!(%template_id, "Diagnostic template deleted");
        Ok(())
    }
}

pub fn stats_from(statuses: &[DiagnosticStatus], results: &[DiagnosticResult]) -> DiagnosticStats {
    let requests = |wanted: DiagnosticStatus| statuses.iter().filter(|s| **s == wanted).count() as u64;
    let devices = |wanted: DiagnosticResult| results.iter().filter(|r| **r == wanted).count() as u64;
    DiagnosticStats {
        total_requests: statuses.len() as u64,
        pending_requests: requests(DiagnosticStatus::Pending),
        in_progress_requests: requests(DiagnosticStatus::InProgress),
        completed_requests: requests(DiagnosticStatus::Completed),
        total_devices: results.len() as u64,
        passed_devices: devices(DiagnosticResult::Passed),
        failed_devices: devices(DiagnosticResult::Failed),
        partially_failed_devices: devices(DiagnosticResult::PartiallyFailed),
        pending_devices: devices(DiagnosticResult::Pending),
    }
}

fn ensure_testing(device: &diagnostic_device::Model) -> Result<(), ServiceError> {
    if device.result_status.is_testing() {
        Ok(())
    } else {
        Err(ServiceError::InvalidStatus(format!(
            "Device {} was already reviewed ({})",
            device.id, device.result_status
        )))
    }
}

/// Recomputes the device result from its checks, then the request status.
async fn refresh_device<C: ConnectionTrait>(
    conn: &C,
    device: diagnostic_device::Model,
) -> Result<DiagnosticDeviceDetail, ServiceError> {
    let checks = checks_for(conn, device.id).await?;
    let results: Vec<CheckResult> = checks.iter().map(|c| c.result).collect();
    let result_status = result_from_checks(&results);
    let request_id = device.request_id;

    let device = if device.result_status != result_status {
        let mut model: diagnostic_device::ActiveModel = device.into();
        model.result_status = Set(result_status);
        model.update(conn).await?
    } else {
        device
    };

    sync_request_status(conn, request_id).await?;
    Ok(DiagnosticDeviceDetail::new(device, checks))
}

async fn sync_request_status<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<(), ServiceError> {
    let request = find_request(conn, request_id).await?;
    let results: Vec<DiagnosticResult> = diagnostic_device::Entity::find()
        .select_only()
        .column(diagnostic_device::Column::ResultStatus)
        .filter(diagnostic_device::Column::RequestId.eq(request_id))
        .into_tuple()
        .all(conn)
        .await?;
    let status = request_status_for(&results);
    if status != request.status {
        let mut model: diagnostic_request::ActiveModel = request.into();
        model.status = Set(status);
        model.update(conn).await?;
    }
    Ok(())
}

async fn checks_for<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
) -> Result<Vec<diagnostic_check::Model>, ServiceError> {
    Ok(diagnostic_check::Entity::find()
        .filter(diagnostic_check::Column::DeviceId.eq(device_id))
        .order_by_asc(diagnostic_check::Column::CreatedAt)
        .all(conn)
        .await?)
}

async fn find_request<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<diagnostic_request::Model, ServiceError> {
    diagnostic_request::Entity::find_by_id(request_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Diagnostic request {} not found", request_id))
        })
}

async fn lock_request<C: ConnectionTrait>(
    conn: &C,
    request_id: Uuid,
) -> Result<diagnostic_request::Model, ServiceError> {
    let mut query = diagnostic_request::Entity::find_by_id(request_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query.one(conn).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("Diagnostic request {} not found", request_id))
    })
}

async fn find_device<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
) -> Result<diagnostic_device::Model, ServiceError> {
    diagnostic_device::Entity::find_by_id(device_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Diagnostic device {} not found", device_id)))
}

async fn lock_device<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
) -> Result<diagnostic_device::Model, ServiceError> {
    let mut query = diagnostic_device::Entity::find_by_id(device_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Diagnostic device {} not found", device_id)))
}

async fn find_template<C: ConnectionTrait>(
    conn: &C,
    template_id: Uuid,
) -> Result<diagnostic_template::Model, ServiceError> {
    diagnostic_template::Entity::find_by_id(template_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Diagnostic template {} not found", template_id))
        })
}

async fn find_template_by_type<C: ConnectionTrait>(
    conn: &C,
    device_type: &str,
) -> Result<Option<diagnostic_template::Model>, ServiceError> {
    Ok(diagnostic_template::Entity::find()
        .filter(diagnostic_template::Column::DeviceType.eq(device_type))
        .one(conn)
        .await?)
}
