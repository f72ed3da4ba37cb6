use anyhow::Result;
use sqlx::PgPool;

use crate::domain::{GenerationRecord, GENERATION_TABLE};

/// Most recent `limit` rows for one market area, newest first.
pub async fn latest_for_country(
    pool: &PgPool,
    country_code: &str,
    limit: i64,
) -> Result<Vec<GenerationRecord>> {
    let sql = format!(
        r#"
        SELECT
            timestamp,
            country_code,
            resource_type,
            actual_generation_mw,
            forecast_generation_mw
        FROM {GENERATION_TABLE}
        WHERE country_code = $1
        ORDER BY timestamp DESC
        LIMIT $2
        "#
    );

    let rows = sqlx::query_as::<_, GenerationRecord>(&sql)
        .bind(country_code)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
