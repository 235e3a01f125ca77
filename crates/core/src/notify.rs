use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera};
use thiserror::Error;

use crate::domain::requisition::{Requisition, RequisitionStatus};
use crate::domain::user::ReviewerRole;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewSubmission,
    FinalApprovalNeeded,
    Approved,
    Rejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewSubmission => "new_submission",
            Self::FinalApprovalNeeded => "final_approval_needed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    Reviewer(ReviewerRole),
    Requester,
}

/// What to send and to whom, before the recipient address is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPlan {
    pub kind: NotificationKind,
    pub recipient: Recipient,
}

impl NotificationPlan {
    pub fn for_submission(next_reviewer: Option<ReviewerRole>) -> Option<Self> {
        next_reviewer.map(|role| Self {
            kind: NotificationKind::NewSubmission,
            recipient: Recipient::Reviewer(role),
        })
    }

    /// Derived from the status a transition lands in.
    pub fn for_status(status: RequisitionStatus) -> Option<Self> {
        match status {
            RequisitionStatus::ApprovedBySupervisor => Some(Self {
                kind: NotificationKind::FinalApprovalNeeded,
                recipient: Recipient::Reviewer(ReviewerRole::Owner),
            }),
            RequisitionStatus::Approved => {
                Some(Self { kind: NotificationKind::Approved, recipient: Recipient::Requester })
            }
            RequisitionStatus::RejectedBySupervisor | RequisitionStatus::RejectedByOwner => {
                Some(Self { kind: NotificationKind::Rejected, recipient: Recipient::Requester })
            }
            RequisitionStatus::PendingSupervisorReview
            | RequisitionStatus::PendingOwnerReview
            | RequisitionStatus::Canceled => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

const TEMPLATES: [(&str, &str); 5] = [
    ("details.html", include_str!("../../../templates/email/details.html")),
    ("new_submission.html", include_str!("../../../templates/email/new_submission.html")),
    (
        "final_approval_needed.html",
        include_str!("../../../templates/email/final_approval_needed.html"),
    ),
    ("approved.html", include_str!("../../../templates/email/approved.html")),
    ("rejected.html", include_str!("../../../templates/email/rejected.html")),
];

/// Email bodies rendered from the embedded `templates/email` set. The `.html`
/// names keep Tera's autoescaping on for every interpolated field.
#[derive(Clone)]
pub struct EmailTemplates {
    tera: Arc<Tera>,
}

impl EmailTemplates {
    pub fn embedded() -> Result<Self, NotifyError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())
            .map_err(|error| NotifyError::Template(error.to_string()))?;
        Ok(Self { tera: Arc::new(tera) })
    }

    pub fn compose(
        &self,
        kind: NotificationKind,
        requisition: &Requisition,
        to: impl Into<String>,
        dashboard_url: &str,
    ) -> Result<Notification, NotifyError> {
        let mut context = Context::new();
        context.insert("requisition_id", &requisition.id.0);
        context.insert("item", &requisition.item_name);
        context.insert("department", requisition.department.as_deref().unwrap_or("n/a"));
        context.insert("requester", &requisition.requester_name);
        context.insert(
            "total",
            &requisition.total_cost().map(format_money).unwrap_or_else(|| "unavailable".to_owned()),
        );
        context.insert("dashboard", dashboard_url.trim_end_matches('/'));

        let subject = match kind {
            NotificationKind::NewSubmission => {
                format!("ACTION REQUIRED: New Requisition from {}", requisition.requester_name)
            }
            NotificationKind::FinalApprovalNeeded => {
                format!("FINAL APPROVAL NEEDED: {}", requisition.item_name)
            }
            NotificationKind::Approved => {
                format!("APPROVED: {} is Ready for Fulfillment", requisition.item_name)
            }
            NotificationKind::Rejected => {
                let stage = match requisition.status {
                    RequisitionStatus::RejectedBySupervisor => "Supervisor",
                    _ => "Owner",
                };
                context.insert("stage", stage);
                context.insert(
                    "reason",
                    requisition
                        .rejection
                        .as_ref()
                        .map(|rejection| rejection.reason.as_str())
                        .unwrap_or("No reason provided."),
                );
                format!("REJECTED: Your Requisition for {}", requisition.item_name)
            }
        };

        let html_body = self
            .tera
            .render(&format!("{}.html", kind.as_str()), &context)
            .map_err(|error| NotifyError::Template(error.to_string()))?;

        Ok(Notification { to: to.into(), subject, html_body })
    }
}

fn format_money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("email transport failed: {0}")]
    Transport(String),
    #[error("email provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("email template failed to render: {0}")]
    Template(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Keeps every notification in memory. Optionally fails every send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
    fail_with: Option<NotifyError>,
}

impl RecordingNotifier {
    pub fn failing(error: NotifyError) -> Self {
        Self { sent: Arc::default(), fail_with: Some(error) }
    }

    pub fn sent(&self) -> Vec<Notification> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if let Some(error) = &self.fail_with {
            return Err(error.clone());
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(notification.clone()),
            Err(poisoned) => poisoned.into_inner().push(notification.clone()),
        }
        Ok(())
    }
}
