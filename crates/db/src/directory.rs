use std::sync::Arc;

use reqflow_core::domain::user::ReviewerRole;

use crate::repositories::{RepositoryError, UserRepository};

/// Resolves the email of the reviewer for a stage.
#[derive(Clone)]
pub struct ReviewerDirectory {
    users: Arc<dyn UserRepository>,
}

impl ReviewerDirectory {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Supervisors are matched by department, owners company-wide.
    /// `None` means nobody to notify, not an error.
    pub async fn find_reviewer(
        &self,
        role: ReviewerRole,
        department: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let department = if role.is_department_scoped() {
            match department.map(str::trim).filter(|value| !value.is_empty()) {
                Some(department) => Some(department),
                None => return Ok(None),
            }
        } else {
            None
        };

        let reviewer = self.users.find_first_by_role(role.role(), department).await?;
        Ok(reviewer.map(|user| user.email))
    }
}
