pub mod generation_queries;

pub use generation_queries::latest_for_country;
