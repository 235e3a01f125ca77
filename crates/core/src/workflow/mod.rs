pub mod engine;
pub mod guard;
pub mod states;
pub mod views;

pub use engine::{SubmissionPlan, TransitionPlan, WorkflowEngine};
pub use guard::{AccessDenial, AccessGuard};
pub use states::{InitialRouting, Performer, TransitionKind, TransitionRule};
pub use views::{ListPlan, View, ViewComposer};
