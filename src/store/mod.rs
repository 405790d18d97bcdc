/// Persistence boundary
///
/// The auth core only sees these traits. `postgres` backs them with sqlx,
/// `memory` with in-process maps for tests and local runs.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::model::{CredentialRecord, NewCredential, Profile};

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// Login identities and roles
#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// `Ok(None)` means no such username
    async fn get_by_username(&self, username: &str) -> Result<Option<CredentialRecord>, RepositoryError>;

    async fn get(&self, id: Uuid) -> Result<Option<CredentialRecord>, RepositoryError>;

    /// Creates the record and its empty profile together
    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, RepositoryError>;

    async fn change_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepositoryError>;

    /// Removes the record and its profile
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

/// Personal info keyed by credential id
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError>;

    async fn update(&self, profile: &Profile) -> Result<(), RepositoryError>;
}
