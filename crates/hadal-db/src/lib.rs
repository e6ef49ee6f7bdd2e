pub mod memory;
pub mod models;
mod pg;
pub mod repositories;
pub mod store;

pub use memory::MemoryStore;
pub use models::{AudioCacheStats, CachedAudio, CategorySummary, SpeedCount, WordFilter};
pub use pg::PgStore;
pub use store::{
    AudioCacheStore, ProgressStore, QuizStore, SharedStore, Store, StoreError, WordStore,
};

use anyhow::Context;
use sqlx::{PgPool, Postgres, migrate::MigrateDatabase, postgres::PgPoolOptions};

/// Create a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;

    Ok(pool)
}

/// Create the database if needed, connect, and run the migrations bundled from
/// this crate's `migrations/` folder.
pub async fn connect_and_migrate(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    if !Postgres::database_exists(database_url).await? {
        Postgres::create_database(database_url).await?;
    }

    let pool = create_pool(database_url, max_connections).await?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    Ok(pool)
}
