//! PostgreSQL persistence for status-bearing entities.
//!
//! - [`status_model::StatusModel`] gives an entity type its table, row SQL and
//!   lifecycle accessors.
//! - [`manager::StatusManager`] saves, transitions, soft/hard deletes and
//!   queries entities of one type, writing status history on every save.
//! - [`query::StatusQuery`] is the soft-delete-aware query builder.
//! - [`history`] and [`repositories::StatusChangeRepo`] hold the polymorphic
//!   status change ledger.

use sqlx::postgres::PgPoolOptions;

pub mod history;
pub mod manager;
pub mod models;
pub mod query;
pub mod repositories;
pub mod status_model;

pub use manager::{DeletionSummary, StatusManager};
pub use query::{Direction, FilterValue, StatusQuery};
pub use status_model::StatusModel;

pub type DbPool = sqlx::PgPool;

/// Pool size used by [`create_pool`].
pub const DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    create_pool_with(database_url, DEFAULT_MAX_CONNECTIONS).await
}

/// Create a connection pool with an explicit connection limit.
pub async fn create_pool_with(
    database_url: &str,
    max_connections: u32,
) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Round-trip a trivial query to verify the pool can reach the database.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}
