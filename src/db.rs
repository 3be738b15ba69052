// src/db.rs
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connection pool sized for a small API service.
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}
