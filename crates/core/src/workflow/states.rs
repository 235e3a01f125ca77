use serde::{Deserialize, Serialize};

use crate::domain::requisition::RequisitionStatus;
use crate::domain::user::{ReviewerRole, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionKind {
    Approve,
    Reject,
    Cancel,
}

/// Who may perform a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Performer {
    Requester,
    Reviewer(ReviewerRole),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub from: RequisitionStatus,
    pub to: RequisitionStatus,
    pub kind: TransitionKind,
    pub performer: Performer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialRouting {
    pub status: RequisitionStatus,
    pub next_reviewer: Option<ReviewerRole>,
}

/// Each role skips the review stage it would otherwise perform on itself.
pub fn initial_routing(role: Role) -> InitialRouting {
    match role {
        Role::Staff => InitialRouting {
            status: RequisitionStatus::PendingSupervisorReview,
            next_reviewer: Some(ReviewerRole::Supervisor),
        },
        Role::Supervisor => InitialRouting {
            status: RequisitionStatus::PendingOwnerReview,
            next_reviewer: Some(ReviewerRole::Owner),
        },
        Role::Owner | Role::Admin => {
            InitialRouting { status: RequisitionStatus::Approved, next_reviewer: None }
        }
    }
}

pub fn lookup(from: RequisitionStatus, to: RequisitionStatus) -> Option<TransitionRule> {
    use Performer::{Requester, Reviewer};
    use RequisitionStatus::{
        Approved, ApprovedBySupervisor, Canceled, PendingOwnerReview, PendingSupervisorReview,
        RejectedByOwner, RejectedBySupervisor,
    };
    use TransitionKind::{Approve, Cancel, Reject};

    let (kind, performer) = match (from, to) {
        (PendingSupervisorReview, ApprovedBySupervisor) => {
            (Approve, Reviewer(ReviewerRole::Supervisor))
        }
        (PendingSupervisorReview, RejectedBySupervisor) => {
            (Reject, Reviewer(ReviewerRole::Supervisor))
        }
        (PendingOwnerReview, Approved) | (ApprovedBySupervisor, Approved) => {
            (Approve, Reviewer(ReviewerRole::Owner))
        }
        (PendingOwnerReview, RejectedByOwner) | (ApprovedBySupervisor, RejectedByOwner) => {
            (Reject, Reviewer(ReviewerRole::Owner))
        }
        (PendingSupervisorReview, Canceled) | (PendingOwnerReview, Canceled) => {
            (Cancel, Requester)
        }
        _ => return None,
    };

    Some(TransitionRule { from, to, kind, performer })
}

#[cfg(test)]
mod tests {
    use crate::domain::requisition::RequisitionStatus;
    use crate::domain::user::{ReviewerRole, Role};
    use crate::workflow::states::{initial_routing, lookup, Performer, TransitionKind};

    #[test]
    fn initial_status_depends_only_on_submitter_role() {
        let staff = initial_routing(Role::Staff);
        assert_eq!(staff.status, RequisitionStatus::PendingSupervisorReview);
        assert_eq!(staff.next_reviewer, Some(ReviewerRole::Supervisor));

        let supervisor = initial_routing(Role::Supervisor);
        assert_eq!(supervisor.status, RequisitionStatus::PendingOwnerReview);
        assert_eq!(supervisor.next_reviewer, Some(ReviewerRole::Owner));

        for role in [Role::Owner, Role::Admin] {
            let routing = initial_routing(role);
            assert_eq!(routing.status, RequisitionStatus::Approved);
            assert_eq!(routing.next_reviewer, None);
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for status in RequisitionStatus::ALL {
            let stuck = RequisitionStatus::ALL.into_iter().all(|to| lookup(status, to).is_none());
            assert_eq!(stuck, status.is_terminal(), "{status:?}");
        }
    }

    #[test]
    fn cancellation_is_only_reachable_from_pending_states() {
        for status in RequisitionStatus::ALL {
            let rule = lookup(status, RequisitionStatus::Canceled);
            assert_eq!(rule.is_some(), status.is_pending(), "{status:?}");
            if let Some(rule) = rule {
                assert_eq!(rule.kind, TransitionKind::Cancel);
                assert_eq!(rule.performer, Performer::Requester);
            }
        }
    }

    #[test]
    fn no_jump_between_non_adjacent_states() {
        assert!(lookup(RequisitionStatus::PendingSupervisorReview, RequisitionStatus::Approved)
            .is_none());
        assert!(lookup(
            RequisitionStatus::PendingOwnerReview,
            RequisitionStatus::ApprovedBySupervisor
        )
        .is_none());
        assert!(lookup(
            RequisitionStatus::ApprovedBySupervisor,
            RequisitionStatus::PendingSupervisorReview
        )
        .is_none());
    }

    #[test]
    fn owner_stage_follows_supervisor_approval() {
        let rule = lookup(RequisitionStatus::ApprovedBySupervisor, RequisitionStatus::Approved)
            .expect("owner approval after supervisor");
        assert_eq!(rule.performer, Performer::Reviewer(ReviewerRole::Owner));
        assert_eq!(rule.kind, TransitionKind::Approve);
    }
}
