use async_trait::async_trait;
use energy_client::domain::GenerationRecord;
use tokio::sync::Mutex;

use super::{GenerationSink, SinkError};
use crate::api::GenerationReader;

/// In-process append-only store. Serves reads the same way the database does.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<GenerationRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Vec<GenerationRecord> {
        self.rows.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }
}

#[async_trait]
impl GenerationSink for MemoryStore {
    async fn append(&self, rows: &[GenerationRecord]) -> Result<u64, SinkError> {
        self.rows.lock().await.extend_from_slice(rows);
        Ok(rows.len() as u64)
    }
}

#[async_trait]
impl GenerationReader for MemoryStore {
    async fn latest(&self, country_code: &str, limit: i64) -> anyhow::Result<Vec<GenerationRecord>> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<GenerationRecord> =
            rows.iter().filter(|r| r.country_code == country_code).cloned().collect();

        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        matching.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(matching)
    }
}
