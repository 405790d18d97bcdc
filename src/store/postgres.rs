use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::{CredentialRepository, ProfileRepository};
use crate::error::RepositoryError;
use crate::model::{CredentialRecord, NewCredential, Profile, Role};

/// PostgreSQL-backed repositories over the `auth_users` and `users` tables
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn credential_from_row(row: &sqlx::postgres::PgRow) -> Result<CredentialRecord, RepositoryError> {
    let role: String = row.try_get("role")?;
    Ok(CredentialRecord {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password")?,
        role: role.parse::<Role>().map_err(RepositoryError::Corrupted)?,
    })
}

#[async_trait]
impl CredentialRepository for PostgresStore {
    async fn get_by_username(&self, username: &str) -> Result<Option<CredentialRecord>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, password, role FROM auth_users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(credential_from_row).transpose()
    }

    async fn get(&self, id: Uuid) -> Result<Option<CredentialRecord>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, password, role FROM auth_users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(credential_from_row).transpose()
    }

    async fn create(&self, credential: NewCredential) -> Result<CredentialRecord, RepositoryError> {
        let record = CredentialRecord {
            id: Uuid::new_v4(),
            username: credential.username,
            password_hash: credential.password_hash,
            role: credential.role,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO auth_users (id, username, password, role)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(record.id)
        .bind(&record.username)
        .bind(&record.password_hash)
        .bind(record.role.as_str())
        .execute(&mut tx)
        .await?;

        sqlx::query("INSERT INTO users (id, user_id) VALUES ($1, $2)")
            .bind(Uuid::new_v4())
            .bind(record.id)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn change_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE auth_users SET password = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(id)
            .execute(&mut tx)
            .await?;

        sqlx::query("DELETE FROM auth_users WHERE id = $1")
            .bind(id)
            .execute(&mut tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for PostgresStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<Profile>, RepositoryError> {
        let row = sqlx::query(
            "SELECT user_id, name, surname, phone, address FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Ok(None),
            Some(row) => Ok(Some(Profile {
                user_id: row.try_get("user_id")?,
                name: row.try_get("name")?,
                surname: row.try_get("surname")?,
                phone: row.try_get("phone")?,
                address: row.try_get("address")?,
            })),
        }
    }

    async fn update(&self, profile: &Profile) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE users
            SET name = $1, surname = $2, phone = $3, address = $4
            WHERE user_id = $5
            "#,
        )
        .bind(&profile.name)
        .bind(&profile.surname)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(profile.user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
