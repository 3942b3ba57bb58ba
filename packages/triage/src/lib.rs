#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident triage: public filtering, severity ranking, and rule-based
//! classification of reports submitted directly by the public.

pub mod report;

use std::cmp::Reverse;

use sos_map_incident_models::Incident;

/// Records rated below this authenticity score are withheld from the
/// public listing.
pub const MIN_AUTHENTICITY_SCORE: u8 = 4;

/// Whether an incident may appear in the public listing.
///
/// Requires a geocoded position and an authenticity score of at least
/// [`MIN_AUTHENTICITY_SCORE`]. A missing authenticity score counts as 0.
#[must_use]
pub fn is_listable(incident: &Incident) -> bool {
    incident.coordinates.is_some()
        && incident.authenticity_score.unwrap_or(0) >= MIN_AUTHENTICITY_SCORE
}

/// Filters out unlistable incidents and orders the rest by severity,
/// highest first.
///
/// The sort is stable: incidents with equal severity keep their stored
/// order.
#[must_use]
pub fn rank_incidents(incidents: Vec<Incident>) -> Vec<Incident> {
    let total = incidents.len();
    let mut ranked: Vec<Incident> = incidents.into_iter().filter(is_listable).collect();
    ranked.sort_by_key(|incident| Reverse(incident.severity_score));

    log::debug!("Ranked {} of {total} stored incidents", ranked.len());

    ranked
}

#[cfg(test)]
mod tests {
    use sos_map_incident_models::Coordinates;

    use super::*;

    fn incident(id: i64, severity: u32, authenticity: Option<u8>, located: bool) -> Incident {
        let mut incident = Incident::analysis_failed(id);
        incident.error = None;
        incident.severity_score = severity;
        incident.authenticity_score = authenticity;
        incident.coordinates = located.then(|| Coordinates::new(19.0, 72.8));
        incident
    }

    fn ids(incidents: &[Incident]) -> Vec<i64> {
        incidents.iter().map(|i| i.id).collect()
    }

    #[test]
    fn excludes_low_authenticity_regardless_of_severity() {
        let ranked = rank_incidents(vec![
            incident(1, 15, Some(3), true),
            incident(2, 2, Some(4), true),
        ]);
        assert_eq!(ids(&ranked), vec![2]);
    }

    #[test]
    fn excludes_unlocated_regardless_of_authenticity() {
        let ranked = rank_incidents(vec![
            incident(1, 15, Some(10), false),
            incident(2, 3, Some(10), true),
        ]);
        assert_eq!(ids(&ranked), vec![2]);
    }

    #[test]
    fn missing_authenticity_is_excluded() {
        assert!(!is_listable(&incident(1, 10, None, true)));
    }

    #[test]
    fn failed_records_are_excluded() {
        let ranked = rank_incidents(vec![Incident::analysis_failed(9)]);
        assert!(ranked.is_empty());
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let ranked = rank_incidents(vec![
            incident(1, 5, Some(8), true),
            incident(2, 9, Some(8), true),
            incident(3, 9, Some(8), true),
            incident(4, 2, Some(8), true),
        ]);
        assert_eq!(ids(&ranked), vec![2, 3, 1, 4]);
    }
}
