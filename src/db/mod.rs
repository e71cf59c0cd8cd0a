//! Database module for Gator.
//!
//! This module provides the sqlx connection pool and migration management.
//! SQLite is the default backend; PostgreSQL is available behind the
//! `postgres` feature.

mod schema;
mod user;

pub use schema::MIGRATIONS;
pub use user::{NewUser, User, UserRepository};

use tracing::{debug, info};

use crate::{GatorError, Result};

/// Connection pool for the active backend.
#[cfg(feature = "sqlite")]
pub type DbPool = sqlx::SqlitePool;

/// Connection pool for the active backend.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type DbPool = sqlx::PgPool;

#[cfg(feature = "sqlite")]
const TABLE_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = $1)";

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
const TABLE_EXISTS_SQL: &str =
    "SELECT EXISTS(SELECT 1 FROM information_schema.tables WHERE table_schema = current_schema() AND table_name = $1)";

/// Database wrapper owning the pool and applying migrations.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect to the database at `url` and apply pending migrations.
    ///
    /// For SQLite the file (and its parent directory) is created when missing.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Opening database at {}", url);
        let pool = Self::open_pool(url).await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Open an in-memory database for testing.
    #[cfg(feature = "sqlite")]
    pub async fn open_in_memory() -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| GatorError::DatabaseConnection(e.to_string()))?
            .foreign_keys(true);

        // Each connection to :memory: is a separate database, so keep exactly one alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| GatorError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    #[cfg(feature = "sqlite")]
    async fn open_pool(url: &str) -> Result<DbPool> {
        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
        use std::str::FromStr;
        use std::time::Duration;

        if !url.starts_with("sqlite:") {
            return Err(GatorError::DatabaseConnection(format!(
                "unsupported database url '{url}' (expected sqlite:...)"
            )));
        }

        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| GatorError::DatabaseConnection(format!("{url}: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| GatorError::DatabaseConnection(format!("{url}: {e}")))
    }

    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    async fn open_pool(url: &str) -> Result<DbPool> {
        sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| GatorError::DatabaseConnection(e.to_string()))
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the current schema version (0 for a fresh database).
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&self.pool)
                .await?;

        Ok(version)
    }

    /// Apply pending migrations, each in its own transaction.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;
        let target = MIGRATIONS.len() as i64;

        if current_version >= target {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version, target
        );

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version     BIGINT PRIMARY KEY,
                applied_at  TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;

            sqlx::raw_sql(migration).execute(&mut *tx).await?;

            sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES ($1, $2)")
                .bind(version)
                .bind(crate::datetime::format_timestamp(&chrono::Utc::now()))
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            debug!("Migration v{} applied successfully", version);
        }

        info!("Database migration complete (now at version {})", target);
        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(TABLE_EXISTS_SQL)
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// Parse a stored UUID column.
pub(crate) fn parse_uuid(s: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(s)
        .map_err(|e| GatorError::Database(format!("invalid stored id '{s}': {e}")))
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
