//! Users and their repository.
//!
//! Users only own feeds and follows; registration happens outside the
//! aggregator, but the repository exposes `create` so feeds can be seeded.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{parse_uuid, DbPool};
use crate::datetime::{format_timestamp, parse_timestamp};
use crate::{GatorError, Result};

/// A registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Unique user ID.
    pub id: Uuid,
    /// User name (unique).
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// User name.
    pub name: String,
}

impl NewUser {
    /// Create a new user request.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = GatorError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            name: row.name,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Repository for user operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    /// Create a new repository over the given pool.
    pub fn new(pool: &DbPool) -> Self {
        Self { pool: pool.clone() }
    }

    /// Create a new user.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let name = new_user.name.trim();
        if name.is_empty() {
            return Err(GatorError::Validation("user name must not be empty".into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query("INSERT INTO users (id, name, created_at, updated_at) VALUES ($1, $2, $3, $4)")
            .bind(user.id.to_string())
            .bind(&user.name)
            .bind(format_timestamp(&user.created_at))
            .bind(format_timestamp(&user.updated_at))
            .execute(&self.pool)
            .await?;

        // Re-read so the returned timestamps carry stored precision
        self.get_by_id(user.id)
            .await?
            .ok_or_else(|| GatorError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by name.
    pub async fn get_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// List all users ordered by name.
    pub async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
