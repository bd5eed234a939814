use crate::{
    auth::AuthUser,
    db::{with_transaction, DbPool},
    entities::{
        customer,
        device::{self, DeviceStatus},
        device_transition,
        repair_part::{self, RepairPartStatus},
        spare_part,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    notifications::{
        templates::{device_ready_sms_text, device_received_sms_text, status_sms_text},
        SmsService,
    },
    services::{
        inventory::insufficient_stock_message,
        repair_workflow::{self, Actor, AvailableTransition, RepairContext},
    },
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterDeviceInput {
    pub customer_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub brand: String,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    pub serial_number: Option<String>,
    #[validate(length(min = 1, max = 2000, message = "Issue description is required"))]
    pub issue_description: String,
    /// Technician user id
    pub assigned_to: Option<String>,
    pub expected_return_date: NaiveDate,
    #[schema(value_type = Option<String>)]
    pub repair_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct DeviceFilter {
    pub status: Option<DeviceStatus>,
    pub assigned_to: Option<String>,
    pub customer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateDeviceStatusInput {
    pub status: DeviceStatus,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    /// Send the customer an SMS after the change
    #[serde(default)]
    pub notify: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSparePartInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub part_number: String,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub quantity: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub min_quantity: i32,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
    #[schema(value_type = String)]
    pub selling_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RequestPartInput {
    pub spare_part_id: Uuid,
    #[validate(range(min = 1, max = 100000, message = "Quantity must be between 1 and 100000"))]
    pub quantity: i32,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePartStatusInput {
    pub status: RepairPartStatus,
}

struct StatusChange {
    device: device::Model,
    from: DeviceStatus,
    notification_only: bool,
    customer: Option<customer::Model>,
}

/// Device intake, repair workflow and spare parts
#[derive(Clone)]
pub struct RepairService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    sms: Arc<SmsService>,
}

impl RepairService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, sms: Arc<SmsService>) -> Self {
        Self {
            db_pool,
            event_sender,
            sms,
        }
    }

    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn register_device(
        &self,
        input: RegisterDeviceInput,
        actor: &str,
    ) -> Result<device::Model, ServiceError> {
        input.validate()?;
        if input.repair_price.is_some_and(|p| p < Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "Repair price cannot be negative".to_string(),
            ));
        }
        let actor_owned = actor.to_string();

        let (device, customer) = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let customer = customer::Entity::find_by_id(input.customer_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Customer {} not found", input.customer_id))
                    })?;

                let device = device::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    customer_id: Set(customer.id),
                    brand: Set(input.brand),
                    model: Set(input.model),
                    serial_number: Set(input.serial_number),
                    issue_description: Set(input.issue_description),
                    status: Set(DeviceStatus::Assigned),
                    assigned_to: Set(input.assigned_to),
                    expected_return_date: Set(input.expected_return_date),
                    repair_price: Set(input.repair_price.unwrap_or(Decimal::ZERO)),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                record_transition(
                    txn,
                    device.id,
                    None,
                    DeviceStatus::Assigned,
                    &actor_owned,
                    Some("Device registered".to_string()),
                )
                .await?;
                Ok((device, customer))
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::DeviceRegistered {
                device_id: device.id,
                customer_id: device.customer_id,
            })
            .await;
        info!(device_id = %device.id, "Device registered");

        if !customer.phone.trim().is_empty() {
            let text = device_received_sms_text(
                &customer.name,
                &device.display_name(),
                device.expected_return_date,
            );
            self.sms
                .notify(&customer.phone, &text, Some(device.id), actor)
                .await;
        }

        Ok(device)
    }

    #[instrument(skip(self))]
    pub async fn get_device(&self, device_id: Uuid) -> Result<device::Model, ServiceError> {
        find_device(&*self.db_pool, device_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_devices(
        &self,
        filter: DeviceFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<device::Model>, u64), ServiceError> {
        let mut query = device::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(device::Column::Status.eq(status));
        }
        if let Some(technician) = filter.assigned_to {
            query = query.filter(device::Column::AssignedTo.eq(technician));
        }
        if let Some(customer_id) = filter.customer_id {
            query = query.filter(device::Column::CustomerId.eq(customer_id));
        }

        let paginator = query
            .order_by_desc(device::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let devices = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((devices, total))
    }

    /// Moves the caller may make on this device right now.
    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn available_transitions(
        &self,
        device_id: Uuid,
        user: &AuthUser,
    ) -> Result<Vec<AvailableTransition>, ServiceError> {
        let db = &*self.db_pool;
        let device = find_device(db, device_id).await?;
        let parts = part_statuses(db, device_id).await?;
        let has_customer = customer::Entity::find_by_id(device.customer_id)
            .one(db)
            .await?
            .is_some();

        let ctx = RepairContext {
            status: device.status,
            assigned_to: device.assigned_to.as_deref(),
            has_customer,
            parts: &parts,
        };
        let actor = Actor {
            user_id: &user.user_id,
            role: user.primary_role(),
        };

        Ok(repair_workflow::available_transitions(&ctx, &actor)
            .into_iter()
            .map(AvailableTransition::from)
            .collect())
    }

    /// Applies a workflow transition and optionally notifies the customer.
    #[instrument(skip(self, input, user), fields(to = %input.status, user_id = %user.user_id))]
    pub async fn update_status(
        &self,
        device_id: Uuid,
        input: UpdateDeviceStatusInput,
        user: &AuthUser,
    ) -> Result<device::Model, ServiceError> {
        input.validate()?;
        let user_id = user.user_id.clone();
        let role = user.primary_role().to_string();
        let to = input.status;
        let notes = input.notes.clone();

        let change = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let device = lock_device(txn, device_id).await?;
                let parts = part_statuses(txn, device_id).await?;
                let customer = customer::Entity::find_by_id(device.customer_id)
                    .one(txn)
                    .await?;

                let ctx = RepairContext {
                    status: device.status,
                    assigned_to: device.assigned_to.as_deref(),
                    has_customer: customer.is_some(),
                    parts: &parts,
                };
                let actor = Actor {
                    user_id: &user_id,
                    role: &role,
                };
                let rule = repair_workflow::validate_transition(&ctx, &actor, to, notes.as_deref())?;
                let from = device.status;

                if rule.is_notification_only() {
                    return Ok(StatusChange {
                        device,
                        from,
                        notification_only: true,
                        customer,
                    });
                }

                if to == DeviceStatus::PartsArrived {
                    repair_part::Entity::update_many()
                        .col_expr(
                            repair_part::Column::Status,
                            sea_orm::sea_query::Expr::value(RepairPartStatus::Received),
                        )
                        .filter(repair_part::Column::DeviceId.eq(device_id))
                        .filter(repair_part::Column::Status.is_in([
                            RepairPartStatus::Needed,
                            RepairPartStatus::Ordered,
                        ]))
                        .exec(txn)
                        .await?;
                }

                let repair_count = device.repair_count;
                let mut model: device::ActiveModel = device.into();
                model.status = Set(to);
                if to == DeviceStatus::Done {
                    model.repair_count = Set(repair_count + 1);
                }
                let device = model.update(txn).await?;

                record_transition(txn, device_id, Some(from), to, &user_id, notes).await?;

                Ok(StatusChange {
                    device,
                    from,
                    notification_only: false,
                    customer,
                })
            })
        })
        .await?;

        let device = &change.device;
        if change.notification_only {
            let customer = change.customer.as_ref().ok_or_else(|| {
                ServiceError::InvalidOperation("Device has no customer to notify".to_string())
            })?;
            let text = status_sms_text(device.status, &customer.name, &device.display_name());
            self.sms
                .send(&customer.phone, &text, Some(device.id), Some(&user.user_id))
                .await?;
            info!(device_id = %device.id, "Repair status SMS sent");
            return Ok(change.device);
        }

        metrics::record_device_transition(&to.to_string());
        self.event_sender
            .send_or_log(Event::DeviceStatusChanged {
                device_id,
                from: change.from.to_string(),
                to: to.to_string(),
                performed_by: user.user_id.clone(),
            })
            .await;
        info!(device_id = %device_id, from = %change.from, to = %to, "Device status changed");

        if input.notify {
            if let Some(customer) = change.customer.as_ref().filter(|c| !c.phone.trim().is_empty()) {
                let text = match to {
                    DeviceStatus::ReturnedToCustomerCare => {
                        device_ready_sms_text(&customer.name, &device.display_name())
                    }
                    _ => status_sms_text(to, &customer.name, &device.display_name()),
                };
                self.sms
                    .notify(&customer.phone, &text, Some(device_id), &user.user_id)
                    .await;
            }
        }

        Ok(change.device)
    }

    #[instrument(skip(self))]
    pub async fn transition_history(
        &self,
        device_id: Uuid,
    ) -> Result<Vec<device_transition::Model>, ServiceError> {
        find_device(&*self.db_pool, device_id).await?;
        Ok(device_transition::Entity::find()
            .filter(device_transition::Column::DeviceId.eq(device_id))
            .order_by_asc(device_transition::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input), fields(part_number = %input.part_number))]
    pub async fn create_spare_part(
        &self,
        input: CreateSparePartInput,
    ) -> Result<spare_part::Model, ServiceError> {
        input.validate()?;
        if input.cost_price < Decimal::ZERO || input.selling_price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Prices cannot be negative".to_string(),
            ));
        }

        let db = &*self.db_pool;
        let taken = spare_part::Entity::find()
            .filter(spare_part::Column::PartNumber.eq(input.part_number.as_str()))
            .one(db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Spare part {} already exists",
                input.part_number
            )));
        }

        let part = spare_part::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            part_number: Set(input.part_number),
            quantity: Set(input.quantity),
            min_quantity: Set(input.min_quantity),
            cost_price: Set(input.cost_price),
            selling_price: Set(input.selling_price),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;
        info!(spare_part_id = %part.id, "Spare part created");
        Ok(part)
    }

    #[instrument(skip(self))]
    pub async fn list_spare_parts(&self) -> Result<Vec<spare_part::Model>, ServiceError> {
        Ok(spare_part::Entity::find()
            .order_by_asc(spare_part::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input))]
    pub async fn request_part(
        &self,
        device_id: Uuid,
        input: RequestPartInput,
    ) -> Result<repair_part::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db_pool;
        find_device(db, device_id).await?;
        let spare = spare_part::Entity::find_by_id(input.spare_part_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Spare part {} not found", input.spare_part_id))
            })?;

        let part = repair_part::ActiveModel {
            id: Set(Uuid::new_v4()),
            device_id: Set(device_id),
            spare_part_id: Set(spare.id),
            quantity_needed: Set(input.quantity),
            quantity_used: Set(0),
            cost_per_unit: Set(spare.cost_price),
            status: Set(RepairPartStatus::Needed),
            notes: Set(input.notes),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await?;
        info!(repair_part_id = %part.id, "Repair part requested");
        Ok(part)
    }

    /// Marks a requested part as ordered or received.
    #[instrument(skip(self))]
    pub async fn update_part_status(
        &self,
        part_id: Uuid,
        status: RepairPartStatus,
    ) -> Result<repair_part::Model, ServiceError> {
        let db = &*self.db_pool;
        let part = find_part(db, part_id).await?;

        let allowed = matches!(
            (part.status, status),
            (RepairPartStatus::Needed, RepairPartStatus::Ordered)
                | (RepairPartStatus::Needed, RepairPartStatus::Received)
                | (RepairPartStatus::Ordered, RepairPartStatus::Received)
        );
        if !allowed {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot change repair part status from {} to {}",
                part.status, status
            )));
        }

        let mut model: repair_part::ActiveModel = part.into();
        model.status = Set(status);
        Ok(model.update(db).await?)
    }

    /// Consumes the part from spare stock.
    #[instrument(skip(self))]
    pub async fn use_part(&self, part_id: Uuid) -> Result<repair_part::Model, ServiceError> {
        let part = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move {
                let part = lock_part(txn, part_id).await?;
                if part.status == RepairPartStatus::Used {
                    return Err(ServiceError::InvalidOperation(
                        "Repair part has already been used".to_string(),
                    ));
                }

                let mut query = spare_part::Entity::find_by_id(part.spare_part_id);
                if txn.get_database_backend() == DbBackend::Postgres {
                    query = query.lock_exclusive();
                }
                let spare = query.one(txn).await?.ok_or_else(|| {
                    ServiceError::NotFound(format!("Spare part {} not found", part.spare_part_id))
                })?;

                if spare.quantity < part.quantity_needed {
                    return Err(ServiceError::InsufficientStock(insufficient_stock_message(
                        &spare.name,
                        &spare.part_number,
                        spare.quantity,
                        part.quantity_needed,
                    )));
                }

                let remaining = spare.quantity - part.quantity_needed;
                let mut spare_model: spare_part::ActiveModel = spare.into();
                spare_model.quantity = Set(remaining);
                spare_model.update(txn).await?;

                let needed = part.quantity_needed;
                let mut model: repair_part::ActiveModel = part.into();
                model.status = Set(RepairPartStatus::Used);
                model.quantity_used = Set(needed);
                Ok(model.update(txn).await?)
            })
        })
        .await?;

        self.event_sender
            .send_or_log(Event::RepairPartUsed {
                device_id: part.device_id,
                spare_part_id: part.spare_part_id,
                quantity: part.quantity_used,
            })
            .await;
        info!(repair_part_id = %part.id, quantity = part.quantity_used, "Repair part used");
        Ok(part)
    }

    #[instrument(skip(self))]
    pub async fn list_repair_parts(
        &self,
        device_id: Uuid,
    ) -> Result<Vec<repair_part::Model>, ServiceError> {
        find_device(&*self.db_pool, device_id).await?;
        Ok(repair_part::Entity::find()
            .filter(repair_part::Column::DeviceId.eq(device_id))
            .order_by_asc(repair_part::Column::CreatedAt)
            .all(&*self.db_pool)
            .await?)
    }
}

async fn find_device<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
) -> Result<device::Model, ServiceError> {
    device::Entity::find_by_id(device_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Device {} not found", device_id)))
}

async fn lock_device<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
) -> Result<device::Model, ServiceError> {
    let mut query = device::Entity::find_by_id(device_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Device {} not found", device_id)))
}

async fn find_part<C: ConnectionTrait>(
    conn: &C,
    part_id: Uuid,
) -> Result<repair_part::Model, ServiceError> {
    repair_part::Entity::find_by_id(part_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Repair part {} not found", part_id)))
}

/// Repair part read `FOR UPDATE` on Postgres, so a part is only consumed once.
async fn lock_part<C: ConnectionTrait>(
    conn: &C,
    part_id: Uuid,
) -> Result<repair_part::Model, ServiceError> {
    let mut query = repair_part::Entity::find_by_id(part_id);
    if conn.get_database_backend() == DbBackend::Postgres {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Repair part {} not found", part_id)))
}

async fn part_statuses<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
) -> Result<Vec<RepairPartStatus>, ServiceError> {
    Ok(repair_part::Entity::find()
        .filter(repair_part::Column::DeviceId.eq(device_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|part| part.status)
        .collect())
}

async fn record_transition<C: ConnectionTrait>(
    conn: &C,
    device_id: Uuid,
    from: Option<DeviceStatus>,
    to: DeviceStatus,
    performed_by: &str,
    notes: Option<String>,
) -> Result<device_transition::Model, ServiceError> {
    Ok(device_transition::ActiveModel {
        id: Set(Uuid::new_v4()),
        device_id: Set(device_id),
        from_status: Set(from),
        to_status: Set(to),
        performed_by: Set(performed_by.to_string()),
        notes: Set(notes),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?)
}
