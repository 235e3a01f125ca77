use serde::{Deserialize, Serialize};

use crate::domain::requisition::{Requisition, RequisitionStatus};
use crate::domain::user::{Actor, ReviewerRole, Role};
use crate::workflow::states::{self, Performer, TransitionRule};

pub const DEFAULT_ADMIN_DEPARTMENT: &str = "Admin";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessDenial {
    NotAReviewAction { requested: RequisitionStatus },
    NotCancelable { from: RequisitionStatus },
    InvalidSourceState { from: RequisitionStatus, requested: RequisitionStatus },
    NotRequester,
    RoleMismatch { role: Role, required: ReviewerRole },
    SelfReview,
    DepartmentMismatch { actor_department: Option<String>, requisition_department: Option<String> },
}

impl AccessDenial {
    pub fn reason(&self) -> String {
        match self {
            Self::NotAReviewAction { requested } => {
                format!("`{requested}` cannot be requested as a transition")
            }
            Self::NotCancelable { from } => {
                format!("a requisition in `{from}` can no longer be canceled")
            }
            Self::InvalidSourceState { from, requested } => {
                format!("cannot move a requisition from `{from}` to `{requested}`")
            }
            Self::NotRequester => "only the requester may cancel a requisition".to_owned(),
            Self::RoleMismatch { role, required } => {
                format!("role `{role}` cannot act at the {} review stage", required.as_str())
            }
            Self::SelfReview => "reviewers may not act on their own requisitions".to_owned(),
            Self::DepartmentMismatch { actor_department, requisition_department } => format!(
                "supervisor of `{}` cannot review requisitions from `{}`",
                actor_department.as_deref().unwrap_or("no department"),
                requisition_department.as_deref().unwrap_or("no department"),
            ),
        }
    }
}

/// Decides whether an actor may move a requisition to a requested status.
#[derive(Clone, Debug)]
pub struct AccessGuard {
    admin_department: String,
}

impl Default for AccessGuard {
    fn default() -> Self {
        Self::new(DEFAULT_ADMIN_DEPARTMENT)
    }
}

impl AccessGuard {
    pub fn new(admin_department: impl Into<String>) -> Self {
        Self { admin_department: admin_department.into() }
    }

    pub fn admin_department(&self) -> &str {
        &self.admin_department
    }

    /// Supervisors of the admin department review every department's queue.
    pub fn is_admin_supervisor(&self, actor: &Actor) -> bool {
        actor.role == Role::Supervisor
            && actor
                .department()
                .is_some_and(|department| department.eq_ignore_ascii_case(&self.admin_department))
    }

    pub fn can_transition(
        &self,
        actor: &Actor,
        requisition: &Requisition,
        requested: RequisitionStatus,
    ) -> bool {
        self.authorize(actor, requisition, requested).is_ok()
    }

    pub fn authorize(
        &self,
        actor: &Actor,
        requisition: &Requisition,
        requested: RequisitionStatus,
    ) -> Result<TransitionRule, AccessDenial> {
        if requested.is_pending() {
            return Err(AccessDenial::NotAReviewAction { requested });
        }

        let from = requisition.status;
        let Some(rule) = states::lookup(from, requested) else {
            return Err(if requested == RequisitionStatus::Canceled {
                AccessDenial::NotCancelable { from }
            } else {
                AccessDenial::InvalidSourceState { from, requested }
            });
        };

        match rule.performer {
            Performer::Requester => {
                if !actor.is(&requisition.requester_email) {
                    return Err(AccessDenial::NotRequester);
                }
            }
            Performer::Reviewer(stage) => {
                let role_fits = match stage {
                    ReviewerRole::Supervisor => actor.role == Role::Supervisor,
                    ReviewerRole::Owner => actor.role.is_owner_level(),
                };
                if !role_fits {
                    return Err(AccessDenial::RoleMismatch { role: actor.role, required: stage });
                }
                if actor.is(&requisition.requester_email) {
                    return Err(AccessDenial::SelfReview);
                }
                if stage == ReviewerRole::Supervisor && !self.covers_department(actor, requisition)
                {
                    return Err(AccessDenial::DepartmentMismatch {
                        actor_department: actor.department().map(str::to_owned),
                        requisition_department: requisition.department.clone(),
                    });
                }
            }
        }

        Ok(rule)
    }

    fn covers_department(&self, actor: &Actor, requisition: &Requisition) -> bool {
        if self.is_admin_supervisor(actor) {
            return true;
        }
        match (actor.department(), requisition.department.as_deref().map(str::trim)) {
            (Some(own), Some(theirs)) => own == theirs,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::requisition::{NewRequisition, Requisition, RequisitionId, RequisitionStatus};
    use crate::domain::user::{Actor, ReviewerRole, Role};
    use crate::workflow::guard::{AccessDenial, AccessGuard};

    fn requisition(status: RequisitionStatus, requester: &str, department: &str) -> Requisition {
        NewRequisition {
            item_name: "Monitor".to_owned(),
            quantity: 1,
            unit_cost: Decimal::new(300, 0),
            reason: "No reason provided.".to_owned(),
            employee_id: None,
            requester_name: requester.to_owned(),
            requester_email: format!("{}@corp.test", requester.to_ascii_lowercase()),
            department: Some(department.to_owned()),
            status,
        }
        .into_requisition(RequisitionId("r-1".to_owned()), Utc::now())
    }

    fn actor(name: &str, role: Role, department: Option<&str>) -> Actor {
        Actor::new(format!("{}@corp.test", name.to_ascii_lowercase()), name, role, department)
    }

    #[test]
    fn supervisor_in_same_department_may_approve() {
        let guard = AccessGuard::default();
        let target = requisition(RequisitionStatus::PendingSupervisorReview, "Alice", "Engineering");
        let bob = actor("Bob", Role::Supervisor, Some("Engineering"));

        assert!(guard.can_transition(&bob, &target, RequisitionStatus::ApprovedBySupervisor));
        assert!(guard.can_transition(&bob, &target, RequisitionStatus::RejectedBySupervisor));
    }

    #[test]
    fn supervisor_of_other_department_is_denied() {
        let guard = AccessGuard::default();
        let target = requisition(RequisitionStatus::PendingSupervisorReview, "Alice", "Engineering");
        let dana = actor("Dana", Role::Supervisor, Some("Finance"));

        let denial = guard
            .authorize(&dana, &target, RequisitionStatus::ApprovedBySupervisor)
            .expect_err("cross-department supervisor");
        assert!(matches!(denial, AccessDenial::DepartmentMismatch { .. }));
    }

    #[test]
    fn admin_department_supervisor_acts_across_departments() {
        let guard = AccessGuard::new("Admin");
        let target = requisition(RequisitionStatus::PendingSupervisorReview, "Alice", "Engineering");
        let root = actor("Root", Role::Supervisor, Some("Admin"));

        assert!(guard.is_admin_supervisor(&root));
        assert!(guard.can_transition(&root, &target, RequisitionStatus::ApprovedBySupervisor));
    }

    #[test]
    fn self_review_is_forbidden_for_every_reviewer_role() {
        let guard = AccessGuard::default();

        let own = requisition(RequisitionStatus::PendingSupervisorReview, "Bob", "Engineering");
        let bob = actor("Bob", Role::Supervisor, Some("Engineering"));
        assert_eq!(
            guard.authorize(&bob, &own, RequisitionStatus::ApprovedBySupervisor),
            Err(AccessDenial::SelfReview)
        );

        let own = requisition(RequisitionStatus::PendingOwnerReview, "Carol", "Operations");
        let carol = actor("Carol", Role::Owner, Some("Operations"));
        assert_eq!(
            guard.authorize(&carol, &own, RequisitionStatus::RejectedByOwner),
            Err(AccessDenial::SelfReview)
        );
    }

    #[test]
    fn staff_may_only_cancel_their_own_pending_requisition() {
        let guard = AccessGuard::default();
        let alice = actor("Alice", Role::Staff, Some("Engineering"));
        let own = requisition(RequisitionStatus::PendingSupervisorReview, "Alice", "Engineering");

        assert!(guard.can_transition(&alice, &own, RequisitionStatus::Canceled));
        for requested in RequisitionStatus::ALL {
            if requested != RequisitionStatus::Canceled {
                assert!(!guard.can_transition(&alice, &own, requested), "{requested:?}");
            }
        }

        let someone_else = requisition(RequisitionStatus::PendingSupervisorReview, "Eve", "Engineering");
        assert_eq!(
            guard.authorize(&alice, &someone_else, RequisitionStatus::Canceled),
            Err(AccessDenial::NotRequester)
        );
    }

    #[test]
    fn cancellation_after_review_is_denied() {
        let guard = AccessGuard::default();
        let alice = actor("Alice", Role::Staff, Some("Engineering"));
        let reviewed = requisition(RequisitionStatus::ApprovedBySupervisor, "Alice", "Engineering");

        assert_eq!(
            guard.authorize(&alice, &reviewed, RequisitionStatus::Canceled),
            Err(AccessDenial::NotCancelable { from: RequisitionStatus::ApprovedBySupervisor })
        );
    }

    #[test]
    fn admin_is_treated_as_owner_and_supervisor_cannot_finalize() {
        let guard = AccessGuard::default();
        let target = requisition(RequisitionStatus::ApprovedBySupervisor, "Alice", "Engineering");

        let admin = actor("Ada", Role::Admin, None);
        assert!(guard.can_transition(&admin, &target, RequisitionStatus::Approved));

        let bob = actor("Bob", Role::Supervisor, Some("Engineering"));
        assert_eq!(
            guard.authorize(&bob, &target, RequisitionStatus::Approved),
            Err(AccessDenial::RoleMismatch { role: Role::Supervisor, required: ReviewerRole::Owner })
        );
    }

    #[test]
    fn pending_targets_are_never_requestable() {
        let guard = AccessGuard::default();
        let target = requisition(RequisitionStatus::ApprovedBySupervisor, "Alice", "Engineering");
        let carol = actor("Carol", Role::Owner, None);

        assert_eq!(
            guard.authorize(&carol, &target, RequisitionStatus::PendingOwnerReview),
            Err(AccessDenial::NotAReviewAction { requested: RequisitionStatus::PendingOwnerReview })
        );
    }
}
