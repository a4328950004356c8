use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, reset_token_hash, \
                            reset_token_expires_at, created_at, updated_at";

#[derive(Debug, thiserror::Error)]
pub enum CreateUserError {
    #[error("email already registered")]
    EmailTaken,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence for user accounts and their pending password resets.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;

    /// Only matches while `reset_token_expires_at > now`.
    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>>;

    /// Inserts a user. A duplicate email surfaces as [`CreateUserError::EmailTaken`].
    async fn create(&self, user: NewUser) -> Result<User, CreateUserError>;

    /// Replaces any pending reset for the user.
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()>;

    /// Drops the pending reset, but only if it is still `token_hash`.
    async fn clear_reset_token(&self, user_id: Uuid, token_hash: &str) -> anyhow::Result<()>;

    /// Stores the new password hash and clears the reset fields in one write.
    /// Returns false when the reset was consumed, replaced or has expired in the meantime.
    async fn complete_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            WHERE reset_token_hash = $1
              AND reset_token_expires_at > $2
            "#
        ))
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&self.db)
        .await
        .context("find user by reset token")?;
        Ok(user)
    }

    async fn create(&self, user: NewUser) -> Result<User, CreateUserError> {
        let res = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CreateUserError::EmailTaken)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET reset_token_hash = $2,
                   reset_token_expires_at = $3,
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(&self.db)
        .await
        .context("set reset token")?;
        Ok(())
    }

    async fn clear_reset_token(&self, user_id: Uuid, token_hash: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET reset_token_hash = NULL,
                   reset_token_expires_at = NULL,
                   updated_at = now()
             WHERE id = $1 AND reset_token_hash = $2
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .execute(&self.db)
        .await
        .context("clear reset token")?;
        Ok(())
    }

    async fn complete_reset(
        &self,
        user_id: Uuid,
        token_hash: &str,
        password_hash: &str,
    ) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $3,
                   reset_token_hash = NULL,
                   reset_token_expires_at = NULL,
                   updated_at = now()
             WHERE id = $1
               AND reset_token_hash = $2
               AND reset_token_expires_at > now()
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(password_hash)
        .execute(&self.db)
        .await
        .context("complete password reset")?;
        Ok(res.rows_affected() == 1)
    }
}
