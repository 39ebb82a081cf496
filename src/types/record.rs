//! Defines the observation record flowing through the enrichment pipeline and
//! the identifier used to recognise it across runs.

use chrono::NaiveDate;
use std::fmt;

/// The stable identity of an observation.
///
/// Identifiers are parsed from text in one place ([`RecordId::parse`]) so that the
/// candidate source and the checkpoint store always agree on identity: an integer
/// literal becomes [`RecordId::Int`], anything else [`RecordId::Text`].
///
/// # Examples
///
/// ```
/// use eco_enrich::RecordId;
///
/// assert_eq!(RecordId::parse("128984633"), RecordId::Int(128984633));
/// assert_eq!(RecordId::parse(" 42 "), RecordId::Int(42));
/// assert_eq!(RecordId::parse("obs-7"), RecordId::Text("obs-7".to_string()));
/// assert_eq!(RecordId::Int(7).to_string(), "7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<i64>() {
            Ok(value) => RecordId::Int(value),
            Err(_) => RecordId::Text(trimmed.to_string()),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::parse(value)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(value) => write!(f, "{}", value),
            RecordId::Text(value) => write!(f, "{}", value),
        }
    }
}

/// A single ecological observation.
///
/// Records are immutable inputs apart from the result fields, which only the
/// enrichment engine fills in.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Unique observation identifier.
    pub id: RecordId,
    /// Latitude in WGS84 decimal degrees.
    pub latitude: f64,
    /// Longitude in WGS84 decimal degrees.
    pub longitude: f64,
    /// Calendar date the observation was made, if known.
    pub observed_on: Option<NaiveDate>,
    /// Raw observation timestamp as exported upstream (e.g. `2022-08-01 14:40:00 UTC`).
    pub time_observed_at: Option<String>,
    /// Upstream timezone name, not yet normalised.
    pub time_zone: Option<String>,
    /// Elevation in meters, filled in by the engine.
    pub elevation: Option<f64>,
}

impl Record {
    /// Creates a record with only identity and position set.
    pub fn new(id: impl Into<RecordId>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            observed_on: None,
            time_observed_at: None,
            time_zone: None,
            elevation: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.elevation.is_some()
    }
}
