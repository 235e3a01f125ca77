use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequisitionId(pub String);

impl std::fmt::Display for RequisitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequisitionStatus {
    #[serde(rename = "Pending Supervisor Review")]
    PendingSupervisorReview,
    #[serde(rename = "Approved by Supervisor")]
    ApprovedBySupervisor,
    #[serde(rename = "Pending Owner Review")]
    PendingOwnerReview,
    #[serde(rename = "Approved")]
    Approved,
    #[serde(rename = "Rejected by Supervisor")]
    RejectedBySupervisor,
    #[serde(rename = "Rejected by Owner")]
    RejectedByOwner,
    #[serde(rename = "Canceled")]
    Canceled,
}

impl RequisitionStatus {
    pub const ALL: [RequisitionStatus; 7] = [
        Self::PendingSupervisorReview,
        Self::ApprovedBySupervisor,
        Self::PendingOwnerReview,
        Self::Approved,
        Self::RejectedBySupervisor,
        Self::RejectedByOwner,
        Self::Canceled,
    ];

    /// Accepts the storage form, the display label, or the variant name.
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|ch| ch.is_ascii_alphanumeric())
            .map(|ch| ch.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "pendingsupervisorreview" => Some(Self::PendingSupervisorReview),
            "approvedbysupervisor" => Some(Self::ApprovedBySupervisor),
            "pendingownerreview" => Some(Self::PendingOwnerReview),
            "approved" => Some(Self::Approved),
            "rejectedbysupervisor" => Some(Self::RejectedBySupervisor),
            "rejectedbyowner" => Some(Self::RejectedByOwner),
            "canceled" | "cancelled" => Some(Self::Canceled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingSupervisorReview => "pending_supervisor_review",
            Self::ApprovedBySupervisor => "approved_by_supervisor",
            Self::PendingOwnerReview => "pending_owner_review",
            Self::Approved => "approved",
            Self::RejectedBySupervisor => "rejected_by_supervisor",
            Self::RejectedByOwner => "rejected_by_owner",
            Self::Canceled => "canceled",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::PendingSupervisorReview => "Pending Supervisor Review",
            Self::ApprovedBySupervisor => "Approved by Supervisor",
            Self::PendingOwnerReview => "Pending Owner Review",
            Self::Approved => "Approved",
            Self::RejectedBySupervisor => "Rejected by Supervisor",
            Self::RejectedByOwner => "Rejected by Owner",
            Self::Canceled => "Canceled",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::PendingSupervisorReview | Self::PendingOwnerReview)
    }

    pub fn is_approval(&self) -> bool {
        matches!(self, Self::ApprovedBySupervisor | Self::Approved)
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::RejectedBySupervisor | Self::RejectedByOwner)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Approved | Self::RejectedBySupervisor | Self::RejectedByOwner | Self::Canceled
        )
    }
}

impl std::fmt::Display for RequisitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signoff {
    pub name: String,
    pub email: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub reason: String,
    pub name: String,
    pub email: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub name: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requisition {
    pub id: RequisitionId,
    pub item_name: String,
    pub quantity: u32,
    pub unit_cost: Decimal,
    pub reason: String,
    pub employee_id: Option<String>,
    pub requester_name: String,
    pub requester_email: String,
    pub department: Option<String>,
    pub status: RequisitionStatus,
    pub created_at: DateTime<Utc>,
    pub supervisor_approval: Option<Signoff>,
    pub owner_approval: Option<Signoff>,
    pub rejection: Option<Rejection>,
    pub cancellation: Option<Cancellation>,
}

impl Requisition {
    /// `None` when `quantity × unit_cost` does not fit in a `Decimal`.
    pub fn total_cost(&self) -> Option<Decimal> {
        Decimal::from(self.quantity).checked_mul(self.unit_cost)
    }

    pub fn is_requested_by(&self, email: &str) -> bool {
        self.requester_email.trim().eq_ignore_ascii_case(email.trim())
    }

    /// Number of audit branches (approval, rejection, cancellation) currently populated.
    pub fn audit_branch_count(&self) -> usize {
        let approval = self.supervisor_approval.is_some() || self.owner_approval.is_some();
        [approval, self.rejection.is_some(), self.cancellation.is_some()]
            .into_iter()
            .filter(|set| *set)
            .count()
    }

    pub fn apply(&mut self, update: &RequisitionUpdate) {
        update.audit.supervisor_approval.apply_to(&mut self.supervisor_approval);
        update.audit.owner_approval.apply_to(&mut self.owner_approval);
        update.audit.rejection.apply_to(&mut self.rejection);
        update.audit.cancellation.apply_to(&mut self.cancellation);
        self.status = update.status;
    }
}

/// A validated submission, ready to be persisted. The repository assigns `id` and `created_at`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRequisition {
    pub item_name: String,
    pub quantity: u32,
    pub unit_cost: Decimal,
    pub reason: String,
    pub employee_id: Option<String>,
    pub requester_name: String,
    pub requester_email: String,
    pub department: Option<String>,
    pub status: RequisitionStatus,
}

impl NewRequisition {
    pub fn into_requisition(self, id: RequisitionId, created_at: DateTime<Utc>) -> Requisition {
        Requisition {
            id,
            item_name: self.item_name,
            quantity: self.quantity,
            unit_cost: self.unit_cost,
            reason: self.reason,
            employee_id: self.employee_id,
            requester_name: self.requester_name,
            requester_email: self.requester_email,
            department: self.department,
            status: self.status,
            created_at,
            supervisor_approval: None,
            owner_approval: None,
            rejection: None,
            cancellation: None,
        }
    }
}

/// Caller-supplied fields of a submission. Identity fields are never read from here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionInput {
    pub item_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit_cost: Option<Decimal>,
    pub reason: Option<String>,
    pub employee_id: Option<String>,
}

/// Partial-update marker. `Unset` removes the stored value, which is distinct from `Keep`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Keep,
    Set(T),
    Unset,
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        Self::Keep
    }
}

impl<T: Clone> FieldUpdate<T> {
    pub fn apply_to(&self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *slot = Some(value.clone()),
            Self::Unset => *slot = None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditPatch {
    pub supervisor_approval: FieldUpdate<Signoff>,
    pub owner_approval: FieldUpdate<Signoff>,
    pub rejection: FieldUpdate<Rejection>,
    pub cancellation: FieldUpdate<Cancellation>,
}

/// A status change plus its audit mutations, applied only while the stored
/// status still equals `expected_status`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequisitionUpdate {
    pub expected_status: RequisitionStatus,
    pub status: RequisitionStatus,
    pub audit: AuditPatch,
}
