mod generation_record;

pub use generation_record::{GenerationRecord, FALLBACK_RESOURCE_TYPE, GENERATION_TABLE};
