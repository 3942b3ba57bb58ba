#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record types, urgency/need taxonomy, and severity scoring.
//!
//! This crate defines the persisted incident record shared by the batch
//! pipeline, the incident store, and the HTTP API, along with the fixed
//! two-axis severity rubric: an urgency weight plus a need-type weight.
//! Urgency and need type are kept as free text on the record because the
//! language model is not guaranteed to stay inside the taxonomy; lookups
//! that miss the taxonomy simply contribute zero.

pub mod de;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Marker stored on records whose language-model analysis failed.
pub const ANALYSIS_FAILED: &str = "AI analysis failed.";

/// Location text used when no location could be extracted.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Lowest and highest authenticity scores.
pub const AUTHENTICITY_RANGE: std::ops::RangeInclusive<u8> = 1..=10;

/// How urgently an incident needs a response.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum Urgency {
    /// Someone's life is at immediate risk.
    #[serde(rename = "Life-threatening")]
    #[strum(serialize = "Life-threatening")]
    LifeThreatening,
    /// Needs help soon, but not immediately fatal.
    Urgent,
    /// Low priority.
    Minor,
}

impl Urgency {
    /// Returns the severity weight contributed by this urgency.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::LifeThreatening => 10,
            Self::Urgent => 6,
            Self::Minor => 2,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::LifeThreatening, Self::Urgent, Self::Minor]
    }
}

/// What kind of help an incident asks for.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum NeedType {
    /// People trapped or stranded.
    Rescue,
    /// Injury or illness.
    Medical,
    /// Food shortage.
    Food,
    /// Displaced people needing a place to stay.
    Shelter,
    /// General supplies (water, blankets, batteries).
    Supplies,
    /// Damaged roads, bridges, buildings, or utilities.
    Infrastructure,
}

impl NeedType {
    /// Returns the severity weight contributed by this need type.
    #[must_use]
    pub const fn weight(self) -> u32 {
        match self {
            Self::Rescue | Self::Medical => 5,
            Self::Infrastructure => 3,
            Self::Shelter => 2,
            Self::Food | Self::Supplies => 1,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Rescue,
            Self::Medical,
            Self::Food,
            Self::Shelter,
            Self::Supplies,
            Self::Infrastructure,
        ]
    }
}

/// Weight of a free-text urgency label. Labels outside the taxonomy weigh 0.
#[must_use]
pub fn urgency_weight(urgency: &str) -> u32 {
    urgency.parse::<Urgency>().map_or(0, Urgency::weight)
}

/// Weight of a free-text need-type label. Labels outside the taxonomy weigh 0.
#[must_use]
pub fn need_type_weight(need_type: &str) -> u32 {
    need_type.parse::<NeedType>().map_or(0, NeedType::weight)
}

/// Computes the severity score for an urgency/need-type pair.
///
/// The score is the sum of two independent lookups. Unknown labels
/// contribute 0, so `severity_score("Unknown", "Unknown") == 0`.
#[must_use]
pub fn severity_score(urgency: &str, need_type: &str) -> u32 {
    urgency_weight(urgency) + need_type_weight(need_type)
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl Coordinates {
    /// Creates a new coordinate pair.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

/// Error returned when a `"lat,lng"` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidCoordinatesError {
    /// The input that failed to parse.
    pub input: String,
}

impl fmt::Display for InvalidCoordinatesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid coordinates {:?}: expected \"lat,lng\"", self.input)
    }
}

impl std::error::Error for InvalidCoordinatesError {}

impl std::str::FromStr for Coordinates {
    type Err = InvalidCoordinatesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || InvalidCoordinatesError {
            input: s.to_string(),
        };
        let (lat, lng) = s.split_once(',').ok_or_else(err)?;
        let lat = lat.trim().parse::<f64>().map_err(|_| err())?;
        let lng = lng.trim().parse::<f64>().map_err(|_| err())?;
        Ok(Self { lat, lng })
    }
}

/// The need type(s) of an incident.
///
/// Model output carries a single label; synthetic datasets may carry a
/// list of labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NeedTypes {
    /// A single need-type label.
    One(String),
    /// Several need-type labels.
    Many(Vec<String>),
}

impl NeedTypes {
    /// Iterates over every label.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let labels: &[String] = match self {
            Self::One(label) => std::slice::from_ref(label),
            Self::Many(labels) => labels,
        };
        labels.iter().map(String::as_str)
    }

    /// Severity weight of these labels: the heaviest label wins.
    #[must_use]
    pub fn weight(&self) -> u32 {
        self.iter().map(need_type_weight).max().unwrap_or(0)
    }
}

impl From<&str> for NeedTypes {
    fn from(label: &str) -> Self {
        Self::One(label.to_string())
    }
}

impl fmt::Display for NeedTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One(label) => f.write_str(label),
            Self::Many(labels) => f.write_str(&labels.join(", ")),
        }
    }
}

/// A processed incident as persisted in the incident store.
///
/// Every field other than `id` is optional on disk: records whose analysis
/// failed carry only `id` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Identifier, unique within the store.
    pub id: i64,
    /// The raw SOS message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_message: Option<String>,
    /// Extracted location text, or [`UNKNOWN_LOCATION`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_text: Option<String>,
    /// Urgency label (see [`Urgency`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    /// Need-type label(s) (see [`NeedType`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_type: Option<NeedTypes>,
    /// One-sentence summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Derived severity score.
    #[serde(default)]
    pub severity_score: u32,
    /// Geocoded position, absent when geocoding failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    /// Authenticity rating from 1 (likely fake) to 10 (likely genuine).
    #[serde(
        default,
        deserialize_with = "de::lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub authenticity_score: Option<u8>,
    /// Explanation of the authenticity rating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Anomaly tags raised during analysis.
    #[serde(default, deserialize_with = "de::null_as_empty")]
    pub flags: Vec<String>,
    /// Creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Error marker for records that could not be processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Incident {
    /// Creates a record marking that analysis of message `id` failed.
    #[must_use]
    pub fn analysis_failed(id: i64) -> Self {
        Self {
            id,
            original_message: None,
            location_text: None,
            urgency: None,
            need_type: None,
            summary: None,
            severity_score: 0,
            coordinates: None,
            authenticity_score: None,
            reasoning: None,
            flags: Vec::new(),
            timestamp: None,
            error: Some(ANALYSIS_FAILED.to_string()),
        }
    }

    /// Recomputes the severity score from the urgency and need-type labels.
    ///
    /// Missing labels contribute 0.
    #[must_use]
    pub fn derived_severity(&self) -> u32 {
        self.urgency.as_deref().map_or(0, urgency_weight)
            + self.need_type.as_ref().map_or(0, NeedTypes::weight)
    }
}
