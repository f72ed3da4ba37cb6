use time::OffsetDateTime;

/// Table holding every persisted generation/load observation.
pub const GENERATION_TABLE: &str = "energy_generation";

/// Resource label assigned to rows derived from aggregate load when the
/// provider has no per-resource breakdown for the window.
pub const FALLBACK_RESOURCE_TYPE: &str = "Total Load (Fallback)";

/// One observation for a market area, resource type and instant.
///
/// Rows are append-only: the store never enforces uniqueness on
/// (`timestamp`, `country_code`, `resource_type`).
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerationRecord {
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    pub country_code: String,
    pub resource_type: String,
    pub actual_generation_mw: Option<f64>,
    pub forecast_generation_mw: Option<f64>,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn serializes_the_five_public_fields() {
        let record = GenerationRecord {
            timestamp: datetime!(2024-03-01 12:00:00 UTC),
            country_code: "GB".to_string(),
            resource_type: "Wind Offshore".to_string(),
            actual_generation_mw: Some(812.0),
            forecast_generation_mw: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 5);
        assert_eq!(obj["timestamp"], "2024-03-01T12:00:00Z");
        assert_eq!(obj["country_code"], "GB");
        assert_eq!(obj["resource_type"], "Wind Offshore");
        assert_eq!(obj["actual_generation_mw"], 812.0);
        assert!(obj["forecast_generation_mw"].is_null());
    }
}
