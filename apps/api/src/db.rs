use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::sinks::PgJobStore;

/// Connects to PostgreSQL and makes sure the jobs schema exists.
pub async fn connect_store(database_url: &str) -> Result<PgJobStore> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connecting to DATABASE_URL")?;

    info!("PostgreSQL connection pool established");

    let store = PgJobStore::new(pool);
    store.ensure_schema().await.context("bootstrapping jobs schema")?;
    Ok(store)
}
