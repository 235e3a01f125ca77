pub mod query;
pub mod requisition;
pub mod user;

pub use query::{Page, PageMeta, RequisitionFilter, RequisitionQuery};
pub use requisition::{
    AuditPatch, Cancellation, FieldUpdate, NewRequisition, Rejection, Requisition, RequisitionId,
    RequisitionStatus, RequisitionUpdate, Signoff, SubmissionInput,
};
pub use user::{Actor, ReviewerRole, Role, User, UserId};
