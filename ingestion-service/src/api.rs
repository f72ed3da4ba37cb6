use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use energy_client::{db, domain::GenerationRecord};
use sqlx::PgPool;

use crate::config::ApiConfig;

/// Read side of the generation table.
#[async_trait::async_trait]
pub trait GenerationReader: Send + Sync {
    /// Most recent `limit` rows for `country_code`, newest first.
    async fn latest(&self, country_code: &str, limit: i64) -> anyhow::Result<Vec<GenerationRecord>>;
}

pub struct PgGenerationReader {
    pool: PgPool,
}

impl PgGenerationReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GenerationReader for PgGenerationReader {
    async fn latest(&self, country_code: &str, limit: i64) -> anyhow::Result<Vec<GenerationRecord>> {
        db::latest_for_country(&self.pool, country_code, limit).await
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub reader: Arc<dyn GenerationReader>,
    pub default_country: String,
    pub limit: i64,
}

impl ApiState {
    pub fn new(reader: Arc<dyn GenerationReader>, cfg: &ApiConfig) -> Self {
        Self {
            reader,
            default_country: cfg.default_country.clone(),
            limit: cfg.limit,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct EnergyDataQuery {
    pub country: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/energy-data/", get(energy_data))
        .with_state(state)
}

pub async fn energy_data(
    State(state): State<ApiState>,
    Query(query): Query<EnergyDataQuery>,
) -> Result<Json<Vec<GenerationRecord>>, StatusCode> {
    metrics::counter!("api_energy_data_requests_total").increment(1);

    let country = query
        .country
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| state.default_country.clone());

    match state.reader.latest(&country, state.limit).await {
        Ok(rows) => Ok(Json(rows)),
        Err(e) => {
            tracing::error!(error = %e, country = %country, "failed to read generation records");
            metrics::counter!("api_energy_data_failed_total").increment(1);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
