//! PostgreSQL access for the key, installation and audit stores.
//!
//! The whole service shares one connection pool; the registration workflow
//! leans on PostgreSQL transactions and row locks for its atomicity
//! guarantees, so there is deliberately no other storage path.

use sqlx::{Pool, Postgres};

/// Shared handle to the PostgreSQL pool, cloned into every handler.
pub type DbPool = Pool<Postgres>;

/// Upper bound on pooled connections.
///
/// Validation traffic is short point queries plus one small transaction per
/// registration, so a handful of connections goes a long way.
const MAX_CONNECTIONS: u32 = 5;

/// Open the connection pool.
///
/// Connections are established lazily as requests arrive; startup only
/// validates that the URL parses and the server is reachable.
///
/// # Errors
///
/// Returns an error when the connection string is malformed or PostgreSQL
/// refuses the initial connection (unreachable host, bad credentials).
pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Apply pending schema migrations.
///
/// The migration set is embedded at compile time from `./migrations` and
/// tracked in `_sqlx_migrations`, so reruns are no-ops. Called once at
/// startup, before the router accepts traffic.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
