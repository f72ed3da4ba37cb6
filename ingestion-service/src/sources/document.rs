//! Parsing of the provider's XML market documents into transform tables.
//!
//! A document holds `TimeSeries`, each with one or more `Period`s of
//! positioned `Point`s. A point's instant is
//! `period.start + (position - 1) * resolution`.

use serde::Deserialize;
use time::{
    format_description::{well_known::Rfc3339, FormatItem},
    macros::format_description,
    Duration, OffsetDateTime, PrimitiveDateTime,
};

use super::{psr_type, SourceError};
use crate::transform::{GenerationTable, LoadTable};

const MINUTE_PRECISION: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]T[hour]:[minute]Z");

/// Reason text the provider uses for an empty result set. The reason code
/// (`999`) is shared with every other rejection and cannot be used alone.
const NO_MATCHING_DATA: &str = "No matching data";

/// Variable-sized blocks: omitted positions repeat the previous quantity.
const CURVE_VARIABLE_BLOCKS: &str = "A03";

const UNKNOWN_RESOURCE: &str = "Unknown";

/// Upper bound on positions in one period; a year of quarter hours is ~35k.
const MAX_PERIOD_POSITIONS: i64 = 100_000;

#[derive(Debug, Deserialize)]
struct MarketDocument {
    #[serde(rename = "TimeSeries", default)]
    time_series: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(rename = "MktPSRType")]
    psr: Option<MktPsrType>,
    #[serde(rename = "inBiddingZone_Domain.mRID")]
    in_domain: Option<Domain>,
    #[serde(rename = "outBiddingZone_Domain.mRID")]
    out_domain: Option<Domain>,
    #[serde(rename = "curveType")]
    curve_type: Option<String>,
    #[serde(rename = "Period", default)]
    periods: Vec<Period>,
}

#[derive(Debug, Deserialize)]
struct MktPsrType {
    #[serde(rename = "psrType")]
    psr_type: String,
}

#[derive(Debug, Deserialize)]
struct Domain {
    #[serde(rename = "$text")]
    _mrid: String,
}

#[derive(Debug, Deserialize)]
struct Period {
    #[serde(rename = "timeInterval")]
    interval: TimeInterval,
    resolution: String,
    #[serde(rename = "Point", default)]
    points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
struct TimeInterval {
    start: String,
    end: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct Point {
    position: u32,
    quantity: f64,
}

#[derive(Debug, Deserialize)]
struct AcknowledgementDocument {
    #[serde(rename = "Reason", default)]
    reasons: Vec<Reason>,
}

#[derive(Debug, Deserialize)]
struct Reason {
    code: Option<String>,
    text: Option<String>,
}

/// The provider answers rejected or empty queries with an acknowledgement
/// document instead of a market document.
pub fn is_acknowledgement(body: &str) -> bool {
    body.contains("Acknowledgement_MarketDocument")
}

/// Classify an acknowledgement: "no matching data" or a provider rejection.
pub fn acknowledgement_error(body: &str) -> SourceError {
    let doc: AcknowledgementDocument = match quick_xml::de::from_str(body) {
        Ok(doc) => doc,
        Err(e) => return SourceError::Malformed(format!("unreadable acknowledgement: {e}")),
    };

    let mut details = Vec::with_capacity(doc.reasons.len());
    for reason in &doc.reasons {
        let code = reason.code.as_deref().unwrap_or_default();
        let text = reason.text.as_deref().unwrap_or_default();
        if text.contains(NO_MATCHING_DATA) {
            return SourceError::NoMatchingData(text.to_string());
        }
        details.push(format!("{code}: {text}"));
    }

    SourceError::Provider(format!("request rejected ({})", details.join("; ")))
}

/// Detailed generation, one column per production type.
pub fn parse_generation(xml: &str) -> Result<GenerationTable, SourceError> {
    let doc = parse_market_document(xml)?;

    let mut table = GenerationTable::new();
    for series in &doc.time_series {
        let label = series_label(series);
        for period in &series.periods {
            for (ts, quantity) in expand_points(period, series.curve_type.as_deref())? {
                table.insert(ts, &label, quantity);
            }
        }
    }
    Ok(table)
}

/// Aggregate load, a single value per instant.
pub fn parse_load(xml: &str) -> Result<LoadTable, SourceError> {
    let doc = parse_market_document(xml)?;

    let mut table = LoadTable::new();
    for series in &doc.time_series {
        for period in &series.periods {
            for (ts, quantity) in expand_points(period, series.curve_type.as_deref())? {
                table.insert(ts, quantity);
            }
        }
    }
    Ok(table)
}

fn parse_market_document(xml: &str) -> Result<MarketDocument, SourceError> {
    quick_xml::de::from_str(xml).map_err(|e| SourceError::Malformed(format!("unreadable market document: {e}")))
}

fn series_label(series: &TimeSeries) -> String {
    let name = series
        .psr
        .as_ref()
        .map(|p| psr_type::label(p.psr_type.trim()))
        .unwrap_or(UNKNOWN_RESOURCE);

    // Storage units report their pumping/charging side as a consumption series.
    if series.out_domain.is_some() && series.in_domain.is_none() {
        format!("{name} (Actual Consumption)")
    } else {
        name.to_string()
    }
}

fn expand_points(period: &Period, curve_type: Option<&str>) -> Result<Vec<(OffsetDateTime, f64)>, SourceError> {
    let start = parse_instant(&period.interval.start)?;
    let end = parse_instant(&period.interval.end)?;
    let resolution = parse_resolution(&period.resolution)?;

    let slots = ((end - start).whole_seconds() / resolution.whole_seconds()).max(0);
    if slots > MAX_PERIOD_POSITIONS {
        return Err(SourceError::Malformed(format!(
            "period {} to {} spans {slots} positions at {}",
            period.interval.start, period.interval.end, period.resolution
        )));
    }
    // Bounded by MAX_PERIOD_POSITIONS above.
    let last_position = slots as u32;

    let mut points = period.points.clone();
    points.sort_by_key(|p| p.position);
    if points.first().is_some_and(|p| p.position == 0) {
        return Err(SourceError::Malformed("point positions start at 1".to_string()));
    }
    if let Some(p) = points.last().filter(|p| p.position > last_position) {
        return Err(SourceError::Malformed(format!(
            "point position {} outside a period of {last_position} positions",
            p.position
        )));
    }

    let at = |position: u32| {
        i32::try_from(position - 1)
            .ok()
            .and_then(|steps| resolution.checked_mul(steps))
            .and_then(|offset| start.checked_add(offset))
            .ok_or_else(|| SourceError::Malformed(format!("point position {position} is out of range")))
    };

    if curve_type.map(str::trim) != Some(CURVE_VARIABLE_BLOCKS) {
        return points.iter().map(|p| Ok((at(p.position)?, p.quantity))).collect();
    }

    let mut out = Vec::new();
    for (idx, point) in points.iter().enumerate() {
        let next = points.get(idx + 1).map(|p| p.position).unwrap_or(last_position + 1);
        let stop = next.max(point.position + 1);
        for position in point.position..stop {
            out.push((at(position)?, point.quantity));
        }
    }
    Ok(out)
}

fn parse_instant(s: &str) -> Result<OffsetDateTime, SourceError> {
    let s = s.trim();
    if let Ok(dt) = PrimitiveDateTime::parse(s, MINUTE_PRECISION) {
        return Ok(dt.assume_utc());
    }
    OffsetDateTime::parse(s, &Rfc3339).map_err(|e| SourceError::Malformed(format!("invalid instant '{s}': {e}")))
}

/// ISO 8601 durations as used by the provider: `PT15M`, `PT60M`, `PT1H`, `P1D`, `P7D`, `P1W`.
fn parse_resolution(s: &str) -> Result<Duration, SourceError> {
    let unsupported = || SourceError::Malformed(format!("unsupported resolution '{s}'"));

    let s = s.trim();
    let (body, time_part) = match s.strip_prefix("PT") {
        Some(rest) => (rest, true),
        None => (s.strip_prefix('P').ok_or_else(unsupported)?, false),
    };
    if body.len() < 2 {
        return Err(unsupported());
    }

    let (amount, unit) = body.split_at(body.len() - 1);
    let amount: i64 = amount.parse().map_err(|_| unsupported())?;
    if amount <= 0 {
        return Err(unsupported());
    }

    match (time_part, unit) {
        (true, "M") => Ok(Duration::minutes(amount)),
        (true, "H") => Ok(Duration::hours(amount)),
        (false, "D") => Ok(Duration::days(amount)),
        (false, "W") => Ok(Duration::weeks(amount)),
        _ => Err(unsupported()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const GENERATION_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GL_MarketDocument xmlns="urn:iec62325.351:tc57wg16:451-6:generationloaddocument:3:0">
  <mRID>0a1b2c3d</mRID>
  <type>A75</type>
  <process.processType>A16</process.processType>
  <time_Period.timeInterval>
    <start>2024-01-01T00:00Z</start>
    <end>2024-01-01T02:00Z</end>
  </time_Period.timeInterval>
  <TimeSeries>
    <mRID>1</mRID>
    <businessType>A01</businessType>
    <objectAggregation>A08</objectAggregation>
    <inBiddingZone_Domain.mRID codingScheme="A01">10Y1001A1001A83F</inBiddingZone_Domain.mRID>
    <quantity_Measure_Unit.name>MAW</quantity_Measure_Unit.name>
    <curveType>A01</curveType>
    <MktPSRType>
      <psrType>B19</psrType>
    </MktPSRType>
    <Period>
      <timeInterval>
        <start>2024-01-01T00:00Z</start>
        <end>2024-01-01T02:00Z</end>
      </timeInterval>
      <resolution>PT60M</resolution>
      <Point>
        <position>1</position>
        <quantity>1500</quantity>
      </Point>
      <Point>
        <position>2</position>
        <quantity>1620.5</quantity>
      </Point>
    </Period>
  </TimeSeries>
  <TimeSeries>
    <mRID>2</mRID>
    <businessType>A01</businessType>
    <objectAggregation>A08</objectAggregation>
    <inBiddingZone_Domain.mRID codingScheme="A01">10Y1001A1001A83F</inBiddingZone_Domain.mRID>
    <quantity_Measure_Unit.name>MAW</quantity_Measure_Unit.name>
    <curveType>A01</curveType>
    <MktPSRType>
      <psrType>B16</psrType>
    </MktPSRType>
    <Period>
      <timeInterval>
        <start>2024-01-01T00:00Z</start>
        <end>2024-01-01T02:00Z</end>
      </timeInterval>
      <resolution>PT60M</resolution>
      <Point>
        <position>1</position>
        <quantity>0</quantity>
      </Point>
      <Point>
        <position>2</position>
        <quantity>3</quantity>
      </Point>
    </Period>
  </TimeSeries>
  <TimeSeries>
    <mRID>3</mRID>
    <businessType>A04</businessType>
    <objectAggregation>A08</objectAggregation>
    <outBiddingZone_Domain.mRID codingScheme="A01">10Y1001A1001A83F</outBiddingZone_Domain.mRID>
    <quantity_Measure_Unit.name>MAW</quantity_Measure_Unit.name>
    <curveType>A01</curveType>
    <MktPSRType>
      <psrType>B10</psrType>
    </MktPSRType>
    <Period>
      <timeInterval>
        <start>2024-01-01T00:00Z</start>
        <end>2024-01-01T01:00Z</end>
      </timeInterval>
      <resolution>PT60M</resolution>
      <Point>
        <position>1</position>
        <quantity>210</quantity>
      </Point>
    </Period>
  </TimeSeries>
</GL_MarketDocument>"#;

    const LOAD_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GL_MarketDocument xmlns="urn:iec62325.351:tc57wg16:451-6:generationloaddocument:3:0">
  <type>A65</type>
  <TimeSeries>
    <mRID>1</mRID>
    <businessType>A04</businessType>
    <outBiddingZone_Domain.mRID codingScheme="A01">10YFR-RTE------C</outBiddingZone_Domain.mRID>
    <curveType>A01</curveType>
    <Period>
      <timeInterval>
        <start>2024-01-01T00:00Z</start>
        <end>2024-01-01T00:30Z</end>
      </timeInterval>
      <resolution>PT15M</resolution>
      <Point>
        <position>1</position>
        <quantity>120.5</quantity>
      </Point>
      <Point>
        <position>2</position>
        <quantity>130.2</quantity>
      </Point>
    </Period>
  </TimeSeries>
</GL_MarketDocument>"#;

    const NO_DATA_ACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Acknowledgement_MarketDocument xmlns="urn:iec62325.351:tc57wg16:451-1:acknowledgementdocument:7:0">
  <mRID>5e0c</mRID>
  <createdDateTime>2024-01-04T10:00:00Z</createdDateTime>
  <Reason>
    <code>999</code>
    <text>No matching data found for Data item ACTUAL_GENERATION_PER_PRODUCTION_TYPE [16.1.B&amp;C] (10YES-REE------0).</text>
  </Reason>
</Acknowledgement_MarketDocument>"#;

    const REJECTED_ACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Acknowledgement_MarketDocument xmlns="urn:iec62325.351:tc57wg16:451-1:acknowledgementdocument:7:0">
  <Reason>
    <code>999</code>
    <text>The amount of requested data exceeds allowed limit.</text>
  </Reason>
</Acknowledgement_MarketDocument>"#;

    #[test]
    fn generation_document_becomes_wide_table() {
        let table = parse_generation(GENERATION_DOC).unwrap();

        assert_eq!(
            table.resource_types(),
            &[
                "Wind Onshore".to_string(),
                "Solar".to_string(),
                "Hydro Pumped Storage (Actual Consumption)".to_string()
            ]
        );
        let timestamps: Vec<_> = table.timestamps().copied().collect();
        assert_eq!(
            timestamps,
            vec![datetime!(2024-01-01 00:00:00 UTC), datetime!(2024-01-01 01:00:00 UTC)]
        );
    }

    #[test]
    fn load_document_becomes_single_column() {
        let table = parse_load(LOAD_DOC).unwrap();
        let rows = crate::transform::melt_load(&table, "FR");

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, datetime!(2024-01-01 00:00:00 UTC));
        assert_eq!(rows[1].timestamp, datetime!(2024-01-01 00:15:00 UTC));
        assert_eq!(rows[1].actual_generation_mw, Some(130.2));
    }

    #[test]
    fn document_without_series_parses_empty() {
        let xml = r#"<GL_MarketDocument><type>A75</type></GL_MarketDocument>"#;
        assert!(parse_generation(xml).unwrap().is_empty());
        assert!(parse_load(xml).unwrap().is_empty());
    }

    #[test]
    fn acknowledgements_are_classified() {
        assert!(is_acknowledgement(NO_DATA_ACK));
        assert!(!is_acknowledgement(LOAD_DOC));

        assert!(matches!(acknowledgement_error(NO_DATA_ACK), SourceError::NoMatchingData(_)));
        assert!(matches!(acknowledgement_error(REJECTED_ACK), SourceError::Provider(_)));
    }

    #[test]
    fn non_numeric_quantity_is_malformed() {
        let xml = LOAD_DOC.replace("<quantity>130.2</quantity>", "<quantity>n/a</quantity>");
        assert!(matches!(parse_load(&xml), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn variable_block_curves_fill_omitted_positions() {
        let period = Period {
            interval: TimeInterval {
                start: "2024-01-01T00:00Z".to_string(),
                end: "2024-01-01T01:00Z".to_string(),
            },
            resolution: "PT15M".to_string(),
            points: vec![
                Point { position: 1, quantity: 10.0 },
                Point { position: 3, quantity: 30.0 },
            ],
        };

        let points = expand_points(&period, Some("A03")).unwrap();
        let values: Vec<_> = points.iter().map(|(_, q)| *q).collect();

        assert_eq!(values, vec![10.0, 10.0, 30.0, 30.0]);
        assert_eq!(points[3].0, datetime!(2024-01-01 00:45:00 UTC));

        let sparse = expand_points(&period, Some("A01")).unwrap();
        assert_eq!(sparse.len(), 2);
        assert_eq!(sparse[1].0, datetime!(2024-01-01 00:30:00 UTC));
    }

    #[test]
    fn positions_beyond_the_period_are_malformed() {
        let xml = LOAD_DOC
            .replace("<resolution>PT15M</resolution>", "<resolution>P1W</resolution>")
            .replace("<position>2</position>", "<position>4000000000</position>");

        assert!(matches!(parse_load(&xml), Err(SourceError::Malformed(_))));
        assert!(matches!(parse_generation(&xml), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn oversized_periods_are_malformed() {
        let period = Period {
            interval: TimeInterval {
                start: "2024-01-01T00:00Z".to_string(),
                end: "9999-12-31T23:45Z".to_string(),
            },
            resolution: "PT15M".to_string(),
            points: vec![Point { position: 1, quantity: 10.0 }],
        };

        assert!(matches!(expand_points(&period, Some("A03")), Err(SourceError::Malformed(_))));
        assert!(matches!(expand_points(&period, Some("A01")), Err(SourceError::Malformed(_))));
    }

    #[test]
    fn resolutions_and_instants() {
        assert_eq!(parse_resolution("PT15M").unwrap(), Duration::minutes(15));
        assert_eq!(parse_resolution("PT60M").unwrap(), Duration::hours(1));
        assert_eq!(parse_resolution("PT1H").unwrap(), Duration::hours(1));
        assert_eq!(parse_resolution("P1D").unwrap(), Duration::days(1));
        assert!(parse_resolution("P1Y").is_err());
        assert!(parse_resolution("PT0M").is_err());
        assert!(parse_resolution("15M").is_err());

        assert_eq!(parse_instant("2024-01-01T23:45Z").unwrap(), datetime!(2024-01-01 23:45:00 UTC));
        assert_eq!(parse_instant("2024-01-01T23:45:00Z").unwrap(), datetime!(2024-01-01 23:45:00 UTC));
        assert!(parse_instant("yesterday").is_err());
    }
}
