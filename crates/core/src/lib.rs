pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod workflow;

pub use audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::query::{Page, PageMeta, RequisitionFilter, RequisitionQuery};
pub use domain::requisition::{
    AuditPatch, Cancellation, FieldUpdate, NewRequisition, Rejection, Requisition, RequisitionId,
    RequisitionStatus, RequisitionUpdate, Signoff, SubmissionInput,
};
pub use domain::user::{Actor, ReviewerRole, Role, User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use notify::{
    EmailTemplates, Notification, NotificationKind, NotificationPlan, Notifier, NotifyError, Recipient,
    RecordingNotifier,
};
pub use workflow::{
    AccessDenial, AccessGuard, ListPlan, SubmissionPlan, TransitionPlan, View, ViewComposer,
    WorkflowEngine,
};
