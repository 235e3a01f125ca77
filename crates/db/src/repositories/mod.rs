use async_trait::async_trait;
use thiserror::Error;

use reqflow_core::domain::query::RequisitionQuery;
use reqflow_core::domain::requisition::{
    NewRequisition, Requisition, RequisitionId, RequisitionUpdate,
};
use reqflow_core::domain::user::{Role, User};

pub mod memory;
pub mod requisition;
pub mod user;

pub use memory::{InMemoryRequisitionRepository, InMemoryUserRepository};
pub use requisition::SqlRequisitionRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait RequisitionRepository: Send + Sync {
    /// Assigns the id and creation timestamp.
    async fn create(&self, requisition: NewRequisition) -> Result<Requisition, RepositoryError>;

    async fn find_by_id(&self, id: &RequisitionId)
        -> Result<Option<Requisition>, RepositoryError>;

    /// Applies the update only while the stored status equals `update.expected_status`.
    /// Returns `false` when nothing matched.
    async fn update(
        &self,
        id: &RequisitionId,
        update: &RequisitionUpdate,
    ) -> Result<bool, RepositoryError>;

    /// Newest first; insertion order breaks ties.
    async fn query(&self, query: &RequisitionQuery) -> Result<Vec<Requisition>, RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    async fn find_first_by_role(
        &self,
        role: Role,
        department: Option<&str>,
    ) -> Result<Option<User>, RepositoryError>;

    async fn save(&self, user: User) -> Result<(), RepositoryError>;
}
