use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use super::{CredentialRepository, ProfileRepository};
use crate::error::RepositoryError;
use crate::model::{CredentialRecord, NewCredential, Profile, Role};

#[derive(Default)]
struct Tables {
    credentials: HashMap<Uuid, CredentialRecord>,
    profiles: HashMap<Uuid, Profile>,
}

/// In-process store implementing both repositories.
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, RepositoryError> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::ConnectionPool("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, RepositoryError> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::ConnectionPool("store lock poisoned".to_string()))
    }

    /// Overwrite a stored role, e.g. to simulate an admin downgrading a user
    pub fn set_role(&self, id: Uuid, role: Role) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if let Some(record) = tables.credentials.get_mut(&id) {
            record.role = role;
        }
        Ok(())
    }

    pub fn credential_count(&self) -> usize {
        self.read().map(|t| t.credentials.len()).unwrap_or(0)
    }
}

#[async_trait]
impl CredentialRepository for InMemoryStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<CredentialRecord>, RepositoryError> {
        let tables = self.read()?;
        Ok(tables
            .credentials
            .values()
            .find(|record| record.username == username)
            .cloned())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CredentialRecord>, RepositoryError> {
        Ok(self.read()?.credentials.get(&id).cloned())
    }

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, RepositoryError> {
        let mut tables = self.write()?;
        if tables
            .credentials
            .values()
            .any(|record| record.username == credential.username)
        {
            return Err(RepositoryError::UniqueViolation(format!(
                "username {} already taken",
                credential.username
            )));
        }

        let record = CredentialRecord {
            id: Uuid::new_v4(),
            username: credential.username,
            password_hash: credential.password_hash,
            role: credential.role,
        };
        tables.profiles.insert(record.id, Profile::empty(record.id));
        tables.credentials.insert(record.id, record.clone());

        Ok(record)
    }

    async fn change_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if let Some(record) = tables.credentials.get_mut(&id) {
            record.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        tables.profiles.remove(&id);
        tables.credentials.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.read()?.profiles.get(&user_id).cloned())
    }

    async fn update(&self, profile: &Profile) -> Result<(), RepositoryError> {
        let mut tables = self.write()?;
        if let Some(stored) = tables.profiles.get_mut(&profile.user_id) {
            *stored = profile.clone();
        }
        Ok(())
    }
}
