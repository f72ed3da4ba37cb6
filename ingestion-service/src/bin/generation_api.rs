use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use ingestion_service::{
    api::{self, ApiState, PgGenerationReader},
    config::AppConfig,
    metrics_server, observability,
};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    cfg.validate_api()?;

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    let state = ApiState::new(Arc::new(PgGenerationReader::new(pool)), &cfg.api);
    let mut app = api::router(state);

    if let Some(metrics_cfg) = &cfg.metrics {
        let handle = metrics_server::install()?;
        app = app.merge(metrics_server::routes(&metrics_cfg.path, handle));
    }

    let addr: SocketAddr = cfg
        .api
        .bind_addr
        .parse()
        .with_context(|| format!("invalid api.bind_addr: {}", cfg.api.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "serving generation read API");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
