use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::audit::{AuditCategory, AuditContext, AuditOutcome, AuditSink};
use crate::domain::requisition::{
    AuditPatch, Cancellation, FieldUpdate, NewRequisition, Rejection, Requisition,
    RequisitionStatus, RequisitionUpdate, Signoff, SubmissionInput,
};
use crate::domain::user::{Actor, Role};
use crate::errors::DomainError;
use crate::notify::NotificationPlan;
use crate::workflow::guard::AccessGuard;
use crate::workflow::states::{self, InitialRouting, TransitionKind, TransitionRule};

pub const DEFAULT_REASON: &str = "No reason provided.";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionPlan {
    pub requisition: NewRequisition,
    pub notification: Option<NotificationPlan>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPlan {
    pub rule: TransitionRule,
    pub update: RequisitionUpdate,
    pub notification: Option<NotificationPlan>,
}

/// Pure decision logic for submissions and review actions. Callers persist the plans.
#[derive(Clone, Debug, Default)]
pub struct WorkflowEngine {
    guard: AccessGuard,
}

impl WorkflowEngine {
    pub fn new(guard: AccessGuard) -> Self {
        Self { guard }
    }

    pub fn guard(&self) -> &AccessGuard {
        &self.guard
    }

    pub fn initial_routing(&self, role: Role) -> InitialRouting {
        states::initial_routing(role)
    }

    pub fn plan_submission(
        &self,
        actor: &Actor,
        input: &SubmissionInput,
    ) -> Result<SubmissionPlan, DomainError> {
        let department = actor.department().map(str::to_owned);
        if actor.role.requires_department() && department.is_none() {
            return Err(DomainError::IncompleteProfile(
                "user profile is incomplete: a department is required to submit requisitions"
                    .to_owned(),
            ));
        }

        let item_name = non_blank(input.item_name.as_deref())
            .ok_or_else(|| DomainError::Validation("itemName is required".to_owned()))?;

        let quantity = match input.quantity {
            None => return Err(DomainError::Validation("quantity is required".to_owned())),
            Some(quantity) if quantity <= 0 => {
                return Err(DomainError::Validation(
                    "quantity must be a positive integer".to_owned(),
                ))
            }
            Some(quantity) => u32::try_from(quantity).map_err(|_| {
                DomainError::Validation(format!("quantity {quantity} is too large"))
            })?,
        };

        let unit_cost = match input.unit_cost {
            None => return Err(DomainError::Validation("unitCost is required".to_owned())),
            Some(cost) if cost < Decimal::ZERO => {
                return Err(DomainError::Validation("unitCost must not be negative".to_owned()))
            }
            Some(cost) => cost,
        };
        if Decimal::from(quantity).checked_mul(unit_cost).is_none() {
            return Err(DomainError::Validation(
                "quantity times unitCost is too large to total".to_owned(),
            ));
        }

        let routing = self.initial_routing(actor.role);
        let requisition = NewRequisition {
            item_name,
            quantity,
            unit_cost,
            reason: non_blank(input.reason.as_deref()).unwrap_or_else(|| DEFAULT_REASON.to_owned()),
            employee_id: non_blank(input.employee_id.as_deref()),
            requester_name: actor.name.clone(),
            requester_email: actor.email.trim().to_owned(),
            department,
            status: routing.status,
        };

        Ok(SubmissionPlan {
            requisition,
            notification: NotificationPlan::for_submission(routing.next_reviewer),
        })
    }

    /// Checks authorization, then the rejection reason, and builds the update.
    pub fn plan_transition(
        &self,
        actor: &Actor,
        requisition: &Requisition,
        requested: RequisitionStatus,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<TransitionPlan, DomainError> {
        let rule =
            self.guard.authorize(actor, requisition, requested).map_err(DomainError::Forbidden)?;

        let audit = match rule.kind {
            TransitionKind::Approve => {
                let signoff = Signoff { name: actor.name.clone(), email: actor.email.clone(), at: now };
                let (supervisor_approval, owner_approval) = if actor.role.is_owner_level() {
                    (FieldUpdate::Keep, FieldUpdate::Set(signoff))
                } else {
                    (FieldUpdate::Set(signoff), FieldUpdate::Keep)
                };
                AuditPatch {
                    supervisor_approval,
                    owner_approval,
                    rejection: FieldUpdate::Unset,
                    cancellation: FieldUpdate::Unset,
                }
            }
            TransitionKind::Reject => {
                let reason = non_blank(rejection_reason).ok_or_else(|| {
                    DomainError::Validation("a rejection reason is required".to_owned())
                })?;
                AuditPatch {
                    supervisor_approval: FieldUpdate::Unset,
                    owner_approval: FieldUpdate::Unset,
                    rejection: FieldUpdate::Set(Rejection {
                        reason,
                        name: actor.name.clone(),
                        email: actor.email.clone(),
                        at: now,
                    }),
                    cancellation: FieldUpdate::Unset,
                }
            }
            TransitionKind::Cancel => AuditPatch {
                supervisor_approval: FieldUpdate::Unset,
                owner_approval: FieldUpdate::Unset,
                rejection: FieldUpdate::Unset,
                cancellation: FieldUpdate::Set(Cancellation { name: actor.name.clone(), at: now }),
            },
        };

        Ok(TransitionPlan {
            rule,
            update: RequisitionUpdate { expected_status: requisition.status, status: requested, audit },
            notification: NotificationPlan::for_status(requested),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn plan_transition_with_audit<S>(
        &self,
        actor: &Actor,
        requisition: &Requisition,
        requested: RequisitionStatus,
        rejection_reason: Option<&str>,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionPlan, DomainError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.plan_transition(actor, requisition, requested, rejection_reason, now);
        let context = audit.for_requisition(requisition.id.clone());
        match &result {
            Ok(plan) => sink.emit(
                context
                    .event(
                        "requisition.transition_applied",
                        AuditCategory::Transition,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", plan.rule.from.as_str())
                    .with_metadata("to", plan.rule.to.as_str())
                    .with_metadata("role", actor.role.as_str()),
            ),
            Err(error) => sink.emit(
                context
                    .event(
                        "requisition.transition_rejected",
                        AuditCategory::Transition,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("from", requisition.status.as_str())
                    .with_metadata("requested", requested.as_str())
                    .with_metadata("error", error.to_string()),
            ),
        }
        result
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned)
}
