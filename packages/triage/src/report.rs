//! Rule-based classification of incidents reported directly by the public.
//!
//! Direct reports skip language-model analysis entirely: the description is
//! matched against a short keyword table and the reporter is trusted, so
//! the authenticity score is fixed at the maximum.

use chrono::{DateTime, Utc};
use sos_map_incident_models::{Coordinates, Incident, NeedTypes, Urgency};

/// Authenticity score given to self-reported incidents.
pub const TRUSTED_AUTHENTICITY: u8 = 10;

/// Reasoning recorded on self-reported incidents.
pub const TRUSTED_REASONING: &str = "Direct report submitted by a user with a verified device location.";

/// Outcome of classifying a report description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportClassification {
    /// Urgency assigned to the report.
    pub urgency: Urgency,
    /// Fixed severity score for the matched rule.
    pub severity: u32,
    /// Responder type needed.
    pub need: &'static str,
}

struct Rule {
    keywords: &'static [&'static str],
    classification: ReportClassification,
}

/// Rules in priority order. The first rule with a matching keyword wins.
const RULES: &[Rule] = &[
    Rule {
        keywords: &["fire", "explosion"],
        classification: ReportClassification {
            urgency: Urgency::LifeThreatening,
            severity: 9,
            need: "Firefighters",
        },
    },
    Rule {
        keywords: &["flood", "drowning"],
        classification: ReportClassification {
            urgency: Urgency::LifeThreatening,
            severity: 8,
            need: "Rescue Boat",
        },
    },
    Rule {
        keywords: &["medical", "blood", "heart"],
        classification: ReportClassification {
            urgency: Urgency::LifeThreatening,
            severity: 9,
            need: "Medical Support",
        },
    },
];

const DEFAULT_CLASSIFICATION: ReportClassification = ReportClassification {
    urgency: Urgency::Urgent,
    severity: 5,
    need: "General Assistance",
};

/// Classifies a report by case-insensitive keyword matching on its
/// description.
#[must_use]
pub fn classify_report(description: &str) -> ReportClassification {
    let lowered = description.to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|kw| lowered.contains(kw)))
        .map_or(DEFAULT_CLASSIFICATION, |rule| rule.classification)
}

/// Maximum number of digits kept from the coordinate concatenation so the
/// id always fits in an `i64`.
const MAX_ID_DIGITS: usize = 18;

/// Derives an id from a coordinate pair by concatenating the digits of
/// both values at four decimal places.
///
/// Distinct coordinates can collide (e.g. sign is dropped); use
/// [`next_report_id`] to resolve collisions against existing records.
#[must_use]
pub fn coordinate_id(coords: Coordinates) -> i64 {
    let digits: String = format!("{:.4}{:.4}", coords.lat, coords.lng)
        .chars()
        .filter(char::is_ascii_digit)
        .take(MAX_ID_DIGITS)
        .collect();

    digits.parse().unwrap_or(0)
}

/// Picks the id for a new report: the coordinate-derived id, or the next
/// id after the current maximum if that one is already taken.
#[must_use]
pub fn next_report_id(existing: &[Incident], coords: Coordinates) -> i64 {
    let candidate = coordinate_id(coords);

    if existing.iter().all(|incident| incident.id != candidate) {
        return candidate;
    }

    let next = existing
        .iter()
        .map(|incident| incident.id)
        .max()
        .unwrap_or(0)
        .saturating_add(1);

    log::debug!("Report id {candidate} already in use, assigning {next}");

    next
}

/// Builds the incident record for a direct report.
#[must_use]
pub fn build_report_incident(
    id: i64,
    description: &str,
    coords: Coordinates,
    reported_at: DateTime<Utc>,
) -> Incident {
    let classification = classify_report(description);

    Incident {
        id,
        original_message: Some(description.to_string()),
        location_text: Some(format!("Reported location ({coords})")),
        urgency: Some(classification.urgency.to_string()),
        need_type: Some(NeedTypes::from(classification.need)),
        summary: Some(description.to_string()),
        severity_score: classification.severity,
        coordinates: Some(coords),
        authenticity_score: Some(TRUSTED_AUTHENTICITY),
        reasoning: Some(TRUSTED_REASONING.to_string()),
        flags: Vec::new(),
        timestamp: Some(reported_at),
        error: None,
    }
}
