pub mod connection;
pub mod directory;
pub mod migrations;
pub mod repositories;

pub use connection::{connect, connect_with_config, connect_with_settings, probe, DbPool};
pub use directory::ReviewerDirectory;
pub use repositories::{
    InMemoryRequisitionRepository, InMemoryUserRepository, RepositoryError,
    RequisitionRepository, SqlRequisitionRepository, SqlUserRepository, UserRepository,
};
