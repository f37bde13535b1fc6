/// Database layer
///
/// Manages the SQLite connection pool and embedded migrations, and holds the
/// row types for agents, customers and payments.

pub mod agent;
pub mod customer;
pub mod payment;

use crate::error::{AppError, AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

/// Rows visible to a caller: everything for a super-admin, otherwise the
/// caller's own customers and payments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope<'a> {
    All,
    Agent(&'a str),
}

impl<'a> Scope<'a> {
    /// Whether a row owned by `agent_id` falls inside the scope
    pub fn covers(&self, agent_id: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Agent(id) => *id == agent_id,
        }
    }
}

/// Database connection options
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    pub max_connections: u32,
    pub enable_wal: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            enable_wal: true,
        }
    }
}

/// Create a SQLite connection pool
///
/// The special path `:memory:` yields a single-connection in-memory pool, since
/// every SQLite connection to `:memory:` opens its own private database.
pub async fn create_pool(path: &Path, options: DatabaseOptions) -> AppResult<SqlitePool> {
    if path == Path::new(":memory:") {
        return memory_pool().await;
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(options.max_connections)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(if options.enable_wal {
                    SqliteJournalMode::Wal
                } else {
                    SqliteJournalMode::Delete
                })
                .foreign_keys(true)
                .busy_timeout(std::time::Duration::from_secs(5)),
        )
        .await?;

    Ok(pool)
}

/// In-memory pool used by tests and ephemeral runs
pub async fn memory_pool() -> AppResult<SqlitePool> {
    let options = "sqlite::memory:"
        .parse::<SqliteConnectOptions>()?
        .foreign_keys(true);

    // Dropping the only connection drops the database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Run migrations embedded at compile time from ./migrations
pub async fn run_migrations(pool: &SqlitePool) -> AppResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;

    Ok(())
}

/// Test database connection
pub async fn test_connection(pool: &SqlitePool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Migrated in-memory database for unit tests
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let pool = memory_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
