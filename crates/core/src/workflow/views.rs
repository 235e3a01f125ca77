use serde::{Deserialize, Serialize};

use crate::domain::query::{Page, PageMeta, RequisitionFilter, RequisitionQuery};
use crate::domain::requisition::RequisitionStatus;
use crate::domain::user::{Actor, Role};
use crate::errors::DomainError;
use crate::workflow::guard::AccessGuard;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    MySubmissions,
    Action,
    All,
}

impl View {
    /// No view means the full history the actor may see.
    pub fn parse(raw: Option<&str>) -> Result<Self, DomainError> {
        let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(Self::All);
        };
        match raw.to_ascii_lowercase().as_str() {
            "my-submissions" | "my_submissions" | "mine" => Ok(Self::MySubmissions),
            "action" => Ok(Self::Action),
            "all" => Ok(Self::All),
            other => Err(DomainError::Validation(format!("unknown view `{other}`"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySubmissions => "my-submissions",
            Self::Action => "action",
            Self::All => "all",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListPlan {
    pub view: View,
    pub page: u32,
    pub limit: u32,
    /// Asks for one row more than the page size to detect a following page.
    pub query: RequisitionQuery,
}

#[derive(Clone, Debug)]
pub struct ViewComposer {
    guard: AccessGuard,
    default_page_size: u32,
    max_page_size: u32,
}

impl Default for ViewComposer {
    fn default() -> Self {
        Self::new(AccessGuard::default(), DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl ViewComposer {
    pub fn new(guard: AccessGuard, default_page_size: u32, max_page_size: u32) -> Self {
        Self { guard, default_page_size, max_page_size }
    }

    pub fn filters(&self, actor: &Actor, view: View) -> Result<Vec<RequisitionFilter>, DomainError> {
        use RequisitionStatus::{
            ApprovedBySupervisor, PendingOwnerReview, PendingSupervisorReview, RejectedBySupervisor,
        };

        let own = || vec![RequisitionFilter::RequesterEmail(actor.email.trim().to_owned())];

        let filters = match (actor.role, view) {
            (Role::Staff, _) | (_, View::MySubmissions) => own(),
            (Role::Supervisor, view) => {
                let statuses = match view {
                    View::Action => vec![PendingSupervisorReview],
                    _ => vec![PendingSupervisorReview, ApprovedBySupervisor, RejectedBySupervisor],
                };
                let mut filters = Vec::with_capacity(2);
                if !self.guard.is_admin_supervisor(actor) {
                    let department = actor.department().ok_or_else(|| {
                        DomainError::IncompleteProfile(
                            "user profile is incomplete: supervisors need a department".to_owned(),
                        )
                    })?;
                    filters.push(RequisitionFilter::Department(department.to_owned()));
                }
                filters.push(RequisitionFilter::StatusIn(statuses));
                filters
            }
            (Role::Owner | Role::Admin, View::Action) => {
                vec![RequisitionFilter::status_in([PendingOwnerReview, ApprovedBySupervisor])]
            }
            (Role::Owner | Role::Admin, View::All) => {
                vec![RequisitionFilter::status_in(RequisitionStatus::ALL)]
            }
        };

        Ok(filters)
    }

    pub fn compose(
        &self,
        actor: &Actor,
        view: View,
        page: Option<i64>,
        limit: Option<i64>,
    ) -> Result<ListPlan, DomainError> {
        let page = match page {
            None => 1,
            Some(page) if page >= 1 => u32::try_from(page)
                .map_err(|_| DomainError::Validation(format!("page {page} is out of range")))?,
            Some(page) => {
                return Err(DomainError::Validation(format!("page must be at least 1, got {page}")))
            }
        };
        let limit = match limit {
            None => self.default_page_size,
            Some(limit) if (1..=i64::from(self.max_page_size)).contains(&limit) => limit as u32,
            Some(limit) => {
                return Err(DomainError::Validation(format!(
                    "limit must be between 1 and {}, got {limit}",
                    self.max_page_size
                )))
            }
        };

        let filters = self.filters(actor, view)?;
        let offset = u64::from(page - 1) * u64::from(limit);

        Ok(ListPlan {
            view,
            page,
            limit,
            query: RequisitionQuery { filters, limit: limit + 1, offset },
        })
    }

    pub fn finish<T>(&self, mut rows: Vec<T>, plan: &ListPlan) -> Page<T> {
        let has_next_page = rows.len() > plan.limit as usize;
        rows.truncate(plan.limit as usize);
        Page {
            items: rows,
            meta: PageMeta {
                current_page: plan.page,
                limit: plan.limit,
                has_next_page,
                has_prev_page: plan.page > 1,
            },
        }
    }
}
