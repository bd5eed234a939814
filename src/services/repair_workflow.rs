//! Repair status workflow.
//!
//! A static table of transition rules decides which moves a device can make,
//! who may make them, and which require notes. Nothing here touches the
//! database; [`super::repairs::RepairService`] loads the context and applies
//! the result.

use crate::{
    auth::roles::{ADMIN, CUSTOMER_CARE, TECHNICIAN},
    entities::{device::DeviceStatus, repair_part::RepairPartStatus},
    errors::ServiceError,
};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use DeviceStatus::*;

pub const DEFAULT_PRIORITY: u32 = 999;

const TECH_ROLES: &[&str] = &[TECHNICIAN, ADMIN];
const HANDOVER_ROLES: &[&str] = &[TECHNICIAN, ADMIN, CUSTOMER_CARE];
const CARE_ROLES: &[&str] = &[ADMIN, CUSTOMER_CARE];

/// Device state a rule is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct RepairContext<'a> {
    pub status: DeviceStatus,
    pub assigned_to: Option<&'a str>,
    pub has_customer: bool,
    pub parts: &'a [RepairPartStatus],
}

/// The caller attempting a transition.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub user_id: &'a str,
    pub role: &'a str,
}

/// Returns the reason a rule does not apply right now.
pub type Guard = fn(&RepairContext<'_>) -> Result<(), String>;

#[derive(Clone)]
pub struct TransitionRule {
    pub from: DeviceStatus,
    pub to: DeviceStatus,
    pub label: &'static str,
    pub requires_notes: bool,
    pub allowed_roles: &'static [&'static str],
    pub priority: u32,
    pub guard: Option<Guard>,
}

impl fmt::Debug for TransitionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRule")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("label", &self.label)
            .field("requires_notes", &self.requires_notes)
            .field("allowed_roles", &self.allowed_roles)
            .field("priority", &self.priority)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

impl TransitionRule {
    fn new(from: DeviceStatus, to: DeviceStatus, label: &'static str) -> Self {
        Self {
            from,
            to,
            label,
            requires_notes: false,
            allowed_roles: TECH_ROLES,
            priority: DEFAULT_PRIORITY,
            guard: None,
        }
    }

    fn notes(mut self) -> Self {
        self.requires_notes = true;
        self
    }

    fn roles(mut self, roles: &'static [&'static str]) -> Self {
        self.allowed_roles = roles;
        self
    }

    fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    fn guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Same-status rules only send the customer an update.
    pub fn is_notification_only(&self) -> bool {
        self.from == self.to
    }

    fn allows_role(&self, role: &str) -> bool {
        self.allowed_roles.contains(&role)
    }

    fn check_guard(&self, ctx: &RepairContext<'_>) -> Result<(), String> {
        self.guard.map_or(Ok(()), |guard| guard(ctx))
    }
}

/// Serializable view of a rule offered to a caller.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AvailableTransition {
    pub to: DeviceStatus,
    pub label: String,
    pub requires_notes: bool,
    pub notification_only: bool,
    pub priority: u32,
}

impl From<&TransitionRule> for AvailableTransition {
    fn from(rule: &TransitionRule) -> Self {
        Self {
            to: rule.to,
            label: rule.label.to_string(),
            requires_notes: rule.requires_notes,
            notification_only: rule.is_notification_only(),
            priority: rule.priority,
        }
    }
}

fn parts_to_receive(ctx: &RepairContext<'_>) -> Result<(), String> {
    if ctx.parts.is_empty() {
        return Err("No parts have been requested yet.".to_string());
    }
    if !ctx.parts.iter().any(|s| s.is_pending()) {
        return Err("All requested parts have already been received.".to_string());
    }
    Ok(())
}

fn parts_ready(ctx: &RepairContext<'_>) -> Result<(), String> {
    if ctx.parts.is_empty() {
        return Ok(());
    }
    if ctx.parts.iter().any(|s| s.is_pending()) {
        return Err("Some parts are still pending. Receive them before starting the repair.".to_string());
    }
    if !ctx
        .parts
        .iter()
        .any(|s| matches!(s, RepairPartStatus::Received | RepairPartStatus::Used))
    {
        return Err("No parts have been received yet.".to_string());
    }
    Ok(())
}

fn has_customer(ctx: &RepairContext<'_>) -> Result<(), String> {
    if ctx.has_customer {
        Ok(())
    } else {
        Err("Device has no customer to notify.".to_string())
    }
}

static RULES: Lazy<Vec<TransitionRule>> = Lazy::new(|| {
    let mut rules = Vec::new();

    for from in [Assigned, DiagnosisStarted, AwaitingParts, InRepair] {
        rules.push(
            TransitionRule::new(from, PartsArrived, "Receive Spare Parts")
                .priority(1)
                .guard(parts_to_receive),
        );
    }

    rules.extend([
        TransitionRule::new(Assigned, DiagnosisStarted, "Start Diagnosis"),
        TransitionRule::new(DiagnosisStarted, AwaitingParts, "Request Parts").notes(),
        TransitionRule::new(DiagnosisStarted, InRepair, "Start Repair"),
        TransitionRule::new(AwaitingParts, InRepair, "Start Repair").guard(parts_ready),
        TransitionRule::new(PartsArrived, InRepair, "Start Repair"),
        TransitionRule::new(InRepair, ReassembledTesting, "Reassemble & Test").notes(),
        TransitionRule::new(InRepair, Failed, "Mark as Failed").notes(),
        TransitionRule::new(ReassembledTesting, RepairComplete, "Complete Repair").notes(),
        TransitionRule::new(ReassembledTesting, InRepair, "Back to Repair").notes(),
        TransitionRule::new(RepairComplete, ReturnedToCustomerCare, "Return to Customer Care")
            .roles(HANDOVER_ROLES),
        TransitionRule::new(ReturnedToCustomerCare, Done, "Hand Over to Customer")
            .roles(CARE_ROLES),
        TransitionRule::new(Failed, ReturnedToCustomerCare, "Return to Customer Care").notes(),
        TransitionRule::new(Failed, Done, "Close as Failed")
            .notes()
            .roles(CARE_ROLES),
    ]);

    for status in [Assigned, DiagnosisStarted, AwaitingParts, InRepair, RepairComplete] {
        rules.push(
            TransitionRule::new(status, status, "Send SMS Update")
                .roles(CARE_ROLES)
                .priority(2)
                .guard(has_customer),
        );
    }

    rules
});

pub fn rules() -> &'static [TransitionRule] {
    &RULES
}

fn is_assigned_technician(ctx: &RepairContext<'_>, actor: &Actor<'_>) -> bool {
    actor.role != TECHNICIAN || ctx.assigned_to == Some(actor.user_id)
}

/// Rules the actor can apply now, ordered by priority then table order.
pub fn available_transitions(
    ctx: &RepairContext<'_>,
    actor: &Actor<'_>,
) -> Vec<&'static TransitionRule> {
    if !is_assigned_technician(ctx, actor) {
        return Vec::new();
    }

    let mut available: Vec<&'static TransitionRule> = rules()
        .iter()
        .filter(|rule| rule.from == ctx.status)
        .filter(|rule| rule.allows_role(actor.role))
        .filter(|rule| rule.check_guard(ctx).is_ok())
        .collect();
    available.sort_by_key(|rule| rule.priority);
    available
}

/// Resolves the rule for moving to `to`, or the reason the move is refused.
pub fn validate_transition(
    ctx: &RepairContext<'_>,
    actor: &Actor<'_>,
    to: DeviceStatus,
    notes: Option<&str>,
) -> Result<&'static TransitionRule, ServiceError> {
    if !is_assigned_technician(ctx, actor) {
        return Err(ServiceError::Forbidden(
            "Only the assigned technician can update this device".to_string(),
        ));
    }

    let candidates: Vec<&'static TransitionRule> = rules()
        .iter()
        .filter(|rule| rule.from == ctx.status && rule.to == to)
        .collect();
    if candidates.is_empty() {
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot transition from {} to {}",
            ctx.status, to
        )));
    }

    let permitted: Vec<&'static TransitionRule> = candidates
        .into_iter()
        .filter(|rule| rule.allows_role(actor.role))
        .collect();
    if permitted.is_empty() {
        return Err(ServiceError::Forbidden(format!(
            "Role '{}' cannot move a device from {} to {}",
            actor.role, ctx.status, to
        )));
    }

    let mut guard_error = None;
    let rule = permitted.into_iter().find(|rule| match rule.check_guard(ctx) {
        Ok(()) => true,
        Err(message) => {
            guard_error.get_or_insert(message);
            false
        }
    });
    let rule = match rule {
        Some(rule) => rule,
        None => {
            return Err(ServiceError::InvalidOperation(
                guard_error.unwrap_or_else(|| "Transition not allowed".to_string()),
            ))
        }
    };

    if rule.requires_notes && notes.map_or(true, |n| n.trim().is_empty()) {
        return Err(ServiceError::ValidationError(format!(
            "Notes are required to {}",
            rule.label.to_lowercase()
        )));
    }

    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    const TECH_ID: &str = "tech-1";

    fn ctx(status: DeviceStatus, parts: &[RepairPartStatus]) -> RepairContext<'_> {
        RepairContext {
            status,
            assigned_to: Some(TECH_ID),
            has_customer: true,
            parts,
        }
    }

    fn actor(role: &str) -> Actor<'_> {
        let user_id = if role == TECHNICIAN { TECH_ID } else { "staff-9" };
        Actor { user_id, role }
    }

    #[rstest]
    #[case(Assigned, DiagnosisStarted, TECHNICIAN)]
    #[case(DiagnosisStarted, InRepair, TECHNICIAN)]
    #[case(PartsArrived, InRepair, ADMIN)]
    #[case(RepairComplete, ReturnedToCustomerCare, CUSTOMER_CARE)]
    #[case(ReturnedToCustomerCare, Done, CUSTOMER_CARE)]
    #[case(ReturnedToCustomerCare, Done, ADMIN)]
    fn allowed_transitions(
        #[case] from: DeviceStatus,
        #[case] to: DeviceStatus,
        #[case] role: &str,
    ) {
        let rule = validate_transition(&ctx(from, &[]), &actor(role), to, None).unwrap();
        assert_eq!(rule.to, to);
    }

    #[test]
    fn rules_print_without_their_guard() {
        let rule = validate_transition(&ctx(DiagnosisStarted, &[]), &actor(TECHNICIAN), InRepair, None)
            .unwrap();
        let printed = format!("{:?}", rule);
        assert!(printed.starts_with("TransitionRule"));
        assert!(printed.contains("to: InRepair"));
        assert!(printed.contains("guarded: "));
    }

    #[rstest]
    #[case(Assigned, Done)]
    #[case(Done, InRepair)]
    #[case(RepairComplete, InRepair)]
    #[case(PartsArrived, Done)]
    fn transitions_missing_from_table_are_invalid(
        #[case] from: DeviceStatus,
        #[case] to: DeviceStatus,
    ) {
        let err = validate_transition(&ctx(from, &[]), &actor(ADMIN), to, Some("x")).unwrap_err();
        assert_matches!(err, ServiceError::InvalidStatus(_));
    }

    #[rstest]
    #[case(ReturnedToCustomerCare, Done, TECHNICIAN)]
    #[case(Assigned, DiagnosisStarted, CUSTOMER_CARE)]
    #[case(Assigned, DiagnosisStarted, "cashier")]
    fn wrong_role_is_forbidden(
        #[case] from: DeviceStatus,
        #[case] to: DeviceStatus,
        #[case] role: &str,
    ) {
        let err = validate_transition(&ctx(from, &[]), &actor(role), to, Some("x")).unwrap_err();
        assert_matches!(err, ServiceError::Forbidden(_));
    }

    #[rstest]
    #[case(DiagnosisStarted, AwaitingParts)]
    #[case(InRepair, ReassembledTesting)]
    #[case(InRepair, Failed)]
    #[case(ReassembledTesting, RepairComplete)]
    #[case(Failed, Done)]
    fn notes_are_required(#[case] from: DeviceStatus, #[case] to: DeviceStatus) {
        let err = validate_transition(&ctx(from, &[]), &actor(ADMIN), to, Some("  ")).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(_));
        assert!(validate_transition(&ctx(from, &[]), &actor(ADMIN), to, Some("checked")).is_ok());
    }

    #[test]
    fn unassigned_technician_sees_nothing() {
        let context = RepairContext {
            assigned_to: Some("someone-else"),
            ..ctx(Assigned, &[])
        };
        assert!(available_transitions(&context, &actor(TECHNICIAN)).is_empty());
        let err = validate_transition(&context, &actor(TECHNICIAN), DiagnosisStarted, None)
            .unwrap_err();
        assert_matches!(err, ServiceError::Forbidden(_));
    }

    #[test]
    fn receive_parts_comes_first_when_parts_are_pending() {
        let parts = [RepairPartStatus::Needed];
        let available = available_transitions(&ctx(DiagnosisStarted, &parts), &actor(TECHNICIAN));
        let targets: Vec<DeviceStatus> = available.iter().map(|r| r.to).collect();
        assert_eq!(targets, vec![PartsArrived, AwaitingParts, InRepair]);
    }

    #[test]
    fn receive_parts_guard_messages() {
        let err = validate_transition(&ctx(InRepair, &[]), &actor(TECHNICIAN), PartsArrived, None)
            .unwrap_err();
        assert_matches!(err, ServiceError::InvalidOperation(msg) if msg == "No parts have been requested yet.");

        let received = [RepairPartStatus::Received];
        assert!(
            validate_transition(&ctx(InRepair, &received), &actor(TECHNICIAN), PartsArrived, None)
                .is_err()
        );
    }

    #[rstest]
    #[case(&[], true)]
    #[case(&[RepairPartStatus::Received], true)]
    #[case(&[RepairPartStatus::Used, RepairPartStatus::Received], true)]
    #[case(&[RepairPartStatus::Received, RepairPartStatus::Ordered], false)]
    fn awaiting_parts_to_repair_guard(#[case] parts: &[RepairPartStatus], #[case] allowed: bool) {
        let result = validate_transition(&ctx(AwaitingParts, parts), &actor(TECHNICIAN), InRepair, None);
        assert_eq!(result.is_ok(), allowed);
    }

    #[test]
    fn customer_care_can_send_same_status_update() {
        let available = available_transitions(&ctx(InRepair, &[]), &actor(CUSTOMER_CARE));
        assert_eq!(available.len(), 1);
        assert!(available[0].is_notification_only());

        let done = available_transitions(&ctx(Done, &[]), &actor(CUSTOMER_CARE));
        assert!(done.is_empty());
    }

    #[test]
    fn admin_bypasses_assignment() {
        let context = RepairContext {
            assigned_to: None,
            ..ctx(Assigned, &[])
        };
        let targets: Vec<DeviceStatus> = available_transitions(&context, &actor(ADMIN))
            .iter()
            .map(|r| r.to)
            .collect();
        assert_eq!(targets, vec![Assigned, DiagnosisStarted]);
    }
}
