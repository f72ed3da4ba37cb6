use energy_client::domain::{GenerationRecord, GENERATION_TABLE};
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};

use super::{GenerationSink, SinkError};

/// Bind parameters per row in the insert statement.
const COLUMNS_PER_ROW: usize = 5;
/// Postgres caps a single statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

pub struct PgGenerationSink {
    pool: PgPool,
    batch_size: usize,
}

impl PgGenerationSink {
    pub fn new(pool: PgPool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.clamp(1, MAX_BIND_PARAMS / COLUMNS_PER_ROW),
        }
    }

    /// Write every chunk inside one transaction so a failed area leaves no partial rows.
    async fn insert_all(&self, rows: &[GenerationRecord]) -> Result<u64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for chunk in rows.chunks(self.batch_size) {
            let mut builder = insert_statement(chunk);
            written += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok(written)
    }
}

fn insert_statement(chunk: &[GenerationRecord]) -> QueryBuilder<'_, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "INSERT INTO {GENERATION_TABLE} (timestamp, country_code, resource_type, actual_generation_mw, forecast_generation_mw) "
    ));

    builder.push_values(chunk, |mut b, r| {
        b.push_bind(r.timestamp)
            .push_bind(&r.country_code)
            .push_bind(&r.resource_type)
            .push_bind(r.actual_generation_mw)
            .push_bind(r.forecast_generation_mw);
    });

    builder
}

#[async_trait::async_trait]
impl GenerationSink for PgGenerationSink {
    async fn append(&self, rows: &[GenerationRecord]) -> Result<u64, SinkError> {
        if rows.is_empty() {
            return Ok(0);
        }

        match self.insert_all(rows).await {
            Ok(written) => {
                metrics::counter!("generation_rows_written_total").increment(written);
                Ok(written)
            }
            Err(e) => {
                metrics::counter!("generation_sink_errors_total").increment(1);
                Err(SinkError::Storage(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn record(resource_type: &str) -> GenerationRecord {
        GenerationRecord {
            timestamp: datetime!(2024-01-01 00:00:00 UTC),
            country_code: "DE".to_string(),
            resource_type: resource_type.to_string(),
            actual_generation_mw: Some(1.0),
            forecast_generation_mw: None,
        }
    }

    #[test]
    fn insert_statement_binds_five_columns_per_row() {
        let rows = vec![record("Wind Onshore"), record("Solar")];
        let builder = insert_statement(&rows);
        let sql = builder.sql();

        assert!(sql.starts_with("INSERT INTO energy_generation (timestamp, country_code"));
        assert!(sql.contains("VALUES ($1, $2, $3, $4, $5), ($6, $7, $8, $9, $10)"));
    }
}
