use serde::{Deserialize, Serialize};

use crate::domain::requisition::RequisitionStatus;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RequisitionFilter {
    RequesterEmail(String),
    Department(String),
    StatusIn(Vec<RequisitionStatus>),
}

impl RequisitionFilter {
    pub fn status_in(statuses: impl IntoIterator<Item = RequisitionStatus>) -> Self {
        Self::StatusIn(statuses.into_iter().collect())
    }
}

/// Conjunctive filter set. Results are always ordered newest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequisitionQuery {
    pub filters: Vec<RequisitionFilter>,
    pub limit: u32,
    pub offset: u64,
}

impl RequisitionQuery {
    pub fn matches(&self, requisition: &crate::domain::requisition::Requisition) -> bool {
        self.filters.iter().all(|filter| match filter {
            RequisitionFilter::RequesterEmail(email) => requisition.is_requested_by(email),
            RequisitionFilter::Department(department) => {
                requisition.department.as_deref() == Some(department.as_str())
            }
            RequisitionFilter::StatusIn(statuses) => statuses.contains(&requisition.status),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub limit: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}
