use anyhow::Context;
use sqlx::MySqlPool;
use tracing::info;

/// Connects and brings the attendance tables up to date.
pub async fn init_db(database_url: &str) -> anyhow::Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    info!("Database ready");
    Ok(pool)
}
