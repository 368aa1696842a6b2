//! Person import server

use anyhow::Result;
use log::info;
use sqlx::sqlite::SqlitePoolOptions;

use person_batch::{
    config::Config, launcher::PersonImportLauncher, person::repository::MIGRATOR, server,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    info!(
        "Configuration loaded - input {}, chunk size {}, server {}:{}",
        config.batch.input_path.display(),
        config.batch.chunk_size,
        config.server.host,
        config.server.port
    );

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    info!("Database connection pool established");

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    let launcher = PersonImportLauncher::new(config.batch.clone(), pool);

    server::serve(&config.server, launcher).await
}
