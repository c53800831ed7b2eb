use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::error::TleError;

pub const MINUTES_PER_DAY: f64 = 1440.0;
pub const ISS_NORAD_ID: u32 = 25544;

/// Width of the mean motion column in line 2 (`NN.NNNNNNNN`).
const MEAN_MOTION_WIDTH: usize = 11;

/// Parsed two-line element set. Superseded, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TleRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
    pub inclination: f64,
    pub raan: f64,
    pub eccentricity: f64,
    pub argument_of_perigee: f64,
    pub mean_anomaly: f64,
    /// Revolutions per day.
    pub mean_motion: f64,
    pub derived_period_minutes: f64,
    /// When the fetch that produced this record was issued.
    pub ingested_at: DateTime<Utc>,
}

pub fn period_from_mean_motion(mean_motion: f64) -> Result<f64, TleError> {
    if !(mean_motion > 0.0) {
        return Err(TleError::NonPositiveMeanMotion(mean_motion));
    }
    Ok(MINUTES_PER_DAY / mean_motion)
}

/// Parse TLE text, selecting `norad_id` when the document holds several
/// satellites and falling back to the first entry otherwise.
pub fn parse_tle(
    content: &str,
    norad_id: Option<u32>,
    ingested_at: DateTime<Utc>,
) -> Result<TleRecord, TleError> {
    let TleEntry { name, line1, line2 } =
        select_entry(content, norad_id).ok_or(TleError::NoEntries)?;

    let fields: Vec<&str> = line2.split_whitespace().collect();
    if fields.len() < 8 {
        return Err(TleError::TooFewFields(fields.len()));
    }

    let inclination = parse_field("inclination", fields[2])?;
    if !(inclination > 0.0 && inclination <= 90.0) {
        return Err(TleError::InvalidInclination(inclination));
    }
    let raan = parse_field("raan", fields[3])?;
    let eccentricity = parse_implied_decimal(fields[4])?;
    let argument_of_perigee = parse_field("argument of perigee", fields[5])?;
    let mean_anomaly = parse_field("mean anomaly", fields[6])?;

    let motion_field = fields[7]
        .get(..fields[7].len().min(MEAN_MOTION_WIDTH))
        .ok_or_else(|| TleError::InvalidField {
            field: "mean motion",
            value: fields[7].to_string(),
        })?;
    let mean_motion = parse_field("mean motion", motion_field)?;
    let derived_period_minutes = period_from_mean_motion(mean_motion)?;

    let name = match name {
        Some(name) => name.to_string(),
        None => catalog_number(line1)
            .map(|id| format!("NORAD {}", id))
            .unwrap_or_else(|| "UNKNOWN".to_string()),
    };

    Ok(TleRecord {
        name,
        line1: line1.to_string(),
        line2: line2.to_string(),
        inclination,
        raan,
        eccentricity,
        argument_of_perigee,
        mean_anomaly,
        mean_motion,
        derived_period_minutes,
        ingested_at,
    })
}

fn parse_field(field: &'static str, value: &str) -> Result<f64, TleError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TleError::InvalidField {
            field,
            value: value.to_string(),
        })
}

/// "0003908" -> 0.0003908
fn parse_implied_decimal(value: &str) -> Result<f64, TleError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TleError::InvalidField {
            field: "eccentricity",
            value: value.to_string(),
        });
    }
    parse_field("eccentricity", &format!("0.{}", value))
}

fn catalog_number(line1: &str) -> Option<u32> {
    line1
        .split_whitespace()
        .nth(1)
        .map(|s| s.trim_end_matches(|c: char| c.is_ascii_alphabetic()))
        .and_then(|s| s.parse().ok())
}

struct TleEntry<'a> {
    name: Option<&'a str>,
    line1: &'a str,
    line2: &'a str,
}

/// Scan the document for `1 `/`2 ` line pairs. The non-blank line right
/// before a pair names it. Returns the entry whose catalog number matches
/// `norad_id`, or the first entry.
fn select_entry(content: &str, norad_id: Option<u32>) -> Option<TleEntry<'_>> {
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .peekable();
    let mut name = None;
    let mut first = None;

    while let Some(line) = lines.next() {
        if line.starts_with("1 ") {
            if let Some(line2) = lines.next_if(|l| l.starts_with("2 ")) {
                let entry = TleEntry {
                    name: name.take(),
                    line1: line,
                    line2,
                };
                match norad_id {
                    Some(id) if catalog_number(line) == Some(id) => return Some(entry),
                    None => return Some(entry),
                    Some(_) => {
                        first.get_or_insert(entry);
                    }
                }
                continue;
            }
        }
        name = Some(line);
    }

    first
}
