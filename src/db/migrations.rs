use sqlx::{Pool, Postgres};
use tracing::info;

use crate::db::store::StoreError;

/// Apply pending migrations from `migrations/`.
///
/// Safe to run repeatedly; sqlx records which migrations have been applied.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), StoreError> {
    info!("Running database migrations...");

    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Database migrations completed successfully");
    Ok(())
}
