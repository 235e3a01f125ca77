use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use reqflow_core::domain::query::RequisitionQuery;
use reqflow_core::domain::requisition::{
    NewRequisition, Requisition, RequisitionId, RequisitionUpdate,
};
use reqflow_core::domain::user::{Role, User};

use super::{RepositoryError, RequisitionRepository, UserRepository};

/// Rows are kept in insertion order, which breaks ties between equal timestamps.
#[derive(Default)]
pub struct InMemoryRequisitionRepository {
    rows: RwLock<Vec<Requisition>>,
}

impl InMemoryRequisitionRepository {
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl RequisitionRepository for InMemoryRequisitionRepository {
    async fn create(&self, requisition: NewRequisition) -> Result<Requisition, RepositoryError> {
        let created =
            requisition.into_requisition(RequisitionId(Uuid::new_v4().to_string()), Utc::now());
        self.rows.write().await.push(created.clone());
        Ok(created)
    }

    async fn find_by_id(
        &self,
        id: &RequisitionId,
    ) -> Result<Option<Requisition>, RepositoryError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|row| &row.id == id).cloned())
    }

    async fn update(
        &self,
        id: &RequisitionId,
        update: &RequisitionUpdate,
    ) -> Result<bool, RepositoryError> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|row| &row.id == id) {
            Some(row) if row.status == update.expected_status => {
                row.apply(update);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn query(&self, query: &RequisitionQuery) -> Result<Vec<Requisition>, RepositoryError> {
        let rows = self.rows.read().await;
        let mut matching: Vec<(usize, &Requisition)> =
            rows.iter().enumerate().filter(|(_, row)| query.matches(row)).collect();
        matching.sort_by(|(left_index, left), (right_index, right)| {
            right.created_at.cmp(&left.created_at).then(right_index.cmp(left_index))
        });

        let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        let email = email.trim();
        Ok(users.values().find(|user| user.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_first_by_role(
        &self,
        role: Role,
        department: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        let department = department.map(str::trim);
        Ok(users
            .values()
            .filter(|user| user.role == role)
            .filter(|user| match department {
                Some(department) => user.department.as_deref() == Some(department),
                None => true,
            })
            .min_by(|left, right| {
                left.created_at.cmp(&right.created_at).then_with(|| left.id.0.cmp(&right.id.0))
            })
            .cloned())
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.0.clone(), user);
        Ok(())
    }
}
