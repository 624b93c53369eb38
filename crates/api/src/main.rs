use anyhow::Context;

use vexo_api::app::build_router;
use vexo_api::config::ApiConfig;
use vexo_infra::{MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vexo_observability::init();

    let config = ApiConfig::from_env()?;

    let app = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.txn_timeout)
                .await
                .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to prepare the database schema")?;
            build_router(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (dev only)");
            build_router(MemoryStore::new(config.txn_timeout))
        }
    };

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
