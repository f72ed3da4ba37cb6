pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgGenerationSink;

use energy_client::domain::GenerationRecord;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SinkError {
    #[error("storage error: {0}")]
    Storage(String),
}

/// Append-only destination for generation rows.
///
/// `append` either persists the whole row set or reports an error; it never
/// updates or deletes rows that are already stored.
#[async_trait::async_trait]
pub trait GenerationSink: Send + Sync {
    async fn append(&self, rows: &[GenerationRecord]) -> Result<u64, SinkError>;
}
