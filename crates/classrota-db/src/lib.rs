//! # Classrota DB
//!
//! Database pool initialization for the classrota API.
//!
//! The connection string comes from the `DATABASE_URL` environment
//! variable; pool sizing from `DATABASE_MAX_CONNECTIONS` (default 10)
//! and the per-request acquire timeout from
//! `DATABASE_ACQUIRE_TIMEOUT_SECS` (default 5).

use std::env;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

/// Initializes the PostgreSQL connection pool.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the connection cannot be
/// established. Called once at startup; the returned pool is cheaply
/// cloneable.
pub async fn init_db_pool() -> sqlx::PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let acquire_timeout = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(acquire_timeout))
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!(max_connections, "database pool initialized");

    pool
}

// Re-export PgPool for convenience
pub use sqlx::PgPool;
