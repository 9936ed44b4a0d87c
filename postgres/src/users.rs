//! User account repository.

use crate::{Result, StoreError};
use boxoffice_core::ids::UserId;
use boxoffice_core::user::{Role, User};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: Option<String>,
    roles: Vec<String>,
    suspended: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<User> {
        let roles = row
            .roles
            .iter()
            .map(|r| r.parse::<Role>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Corrupt)?;
        Ok(User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            display_name: row.display_name,
            roles,
            suspended: row.suspended,
            created_at: row.created_at,
        })
    }
}

/// Repository for user accounts.
pub struct UserRepo {
    pool: PgPool,
}

impl UserRepo {
    pub(crate) const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Finds a user by email, creating a buyer account on first login.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn upsert_by_email(&self, email: &str) -> Result<User> {
        // ON CONFLICT keeps the existing record; the dummy email update
        // makes RETURNING yield the row either way.
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (id, email)
             VALUES ($1, $2)
             ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
             RETURNING id, email, display_name, roles, suspended, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Loads a user by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    pub async fn get(&self, id: UserId) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, display_name, roles, suspended, created_at
             FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or(StoreError::not_found("user"))?.try_into()
    }

    /// Grants a role. Granting a role the user already holds is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn add_role(&self, id: UserId, role: Role) -> Result<()> {
        sqlx::query(
            "UPDATE users SET roles = array_append(roles, $2)
             WHERE id = $1 AND NOT ($2 = ANY(roles))",
        )
        .bind(id.as_uuid())
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Sets a user's display name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    pub async fn set_display_name(&self, id: UserId, display_name: &str) -> Result<()> {
        let result = sqlx::query("UPDATE users SET display_name = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(display_name)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user"));
        }
        Ok(())
    }

    /// Suspends or reinstates a user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the user does not exist.
    pub async fn set_suspended(&self, id: UserId, suspended: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET suspended = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(suspended)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("user"));
        }
        Ok(())
    }

    /// Paginated admin listing, optionally filtered by email substring and
    /// role.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure.
    pub async fn list(
        &self,
        email_filter: Option<&str>,
        role_filter: Option<Role>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<User>, u64)> {
        let pattern = email_filter.map(|f| format!("%{f}%"));
        let role = role_filter.map(Role::as_str);

        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, email, display_name, roles, suspended, created_at
             FROM users
             WHERE ($1::text IS NULL OR email ILIKE $1)
               AND ($2::text IS NULL OR $2 = ANY(roles))
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(pattern.as_deref())
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users
             WHERE ($1::text IS NULL OR email ILIKE $1)
               AND ($2::text IS NULL OR $2 = ANY(roles))",
        )
        .bind(pattern.as_deref())
        .bind(role)
        .fetch_one(&self.pool)
        .await?;

        let users = rows
            .into_iter()
            .map(UserRow::try_into)
            .collect::<Result<Vec<_>>>()?;

        Ok((users, total.unsigned_abs()))
    }
}
