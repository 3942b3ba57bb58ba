#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Batch preprocessing of raw SOS messages into the incident store.
//!
//! Each message goes through language-model analysis, geocoding of the
//! extracted location, and severity scoring. Messages are independent of
//! each other, so they can be processed concurrently; results are always
//! written in input order. Failed analyses are kept as error-marked
//! records so it is visible which messages were skipped.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use futures::StreamExt as _;
use serde::Deserialize;
use sos_map_ai::analysis::{SosAnalysis, analyze_message};
use sos_map_ai::providers::LlmProvider;
use sos_map_incident_models::{Incident, UNKNOWN_LOCATION};
use sos_map_maps::{MapsApi, geocode_location};
use sos_map_store::{IncidentStore, StoreError};
use thiserror::Error;

/// Errors from the preprocessing pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The input CSV could not be opened.
    #[error("Cannot open input {}: {source}", .path.display())]
    Io {
        /// Input path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The input CSV could not be decoded.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Writing the incident store failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// One raw SOS message from the input CSV.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawMessage {
    /// Message id, carried through to the incident record.
    pub id: i64,
    /// Free-text message.
    pub message: String,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Messages processed.
    pub total: usize,
    /// Messages whose analysis failed.
    pub failed: usize,
    /// Messages that were analysed but could not be geocoded.
    pub unlocated: usize,
    /// Messages that will appear in the public listing.
    pub listable: usize,
}

impl IngestStats {
    /// Tallies a list of processed incidents.
    #[must_use]
    pub fn from_incidents(incidents: &[Incident]) -> Self {
        incidents.iter().fold(Self::default(), |mut stats, incident| {
            stats.total += 1;
            if incident.error.is_some() {
                stats.failed += 1;
            } else if incident.coordinates.is_none() {
                stats.unlocated += 1;
            }
            if sos_map_triage::is_listable(incident) {
                stats.listable += 1;
            }
            stats
        })
    }
}

/// Shared collaborators for processing messages.
pub struct Pipeline<'a> {
    /// Language model used for analysis.
    pub llm: &'a dyn LlmProvider,
    /// Mapping provider used for geocoding.
    pub maps: &'a dyn MapsApi,
    /// Region appended to extracted locations before geocoding.
    pub region: &'a str,
}

impl Pipeline<'_> {
    /// Processes one message into an incident record.
    ///
    /// Never fails: an analysis failure yields an error-marked record, and
    /// a geocoding failure yields a record without coordinates.
    pub async fn process_message(&self, raw: &RawMessage) -> Incident {
        log::debug!("Processing message {}: {:?}", raw.id, raw.message);

        let analysis = match analyze_message(self.llm, &raw.message).await {
            Ok(analysis) => analysis,
            Err(e) => {
                log::warn!("Analysis of message {} failed: {e}", raw.id);
                return Incident::analysis_failed(raw.id);
            }
        };

        let coordinates = match analysis.known_location() {
            Some(location) => geocode_location(self.maps, location, self.region).await,
            None => None,
        };

        build_incident(raw, analysis, coordinates)
    }

    /// Processes every message, running up to `concurrency` at a time.
    /// Output order matches input order.
    pub async fn process_all(&self, messages: &[RawMessage], concurrency: usize) -> Vec<Incident> {
        let total = messages.len();

        futures::stream::iter(messages.iter().enumerate())
            .map(|(index, raw)| async move {
                let incident = self.process_message(raw).await;
                log::info!("Processed message {}/{total} (id {})", index + 1, raw.id);
                incident
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }
}

/// Assembles the incident record for an analysed message.
#[must_use]
pub fn build_incident(
    raw: &RawMessage,
    analysis: SosAnalysis,
    coordinates: Option<sos_map_incident_models::Coordinates>,
) -> Incident {
    let mut incident = Incident {
        id: raw.id,
        original_message: Some(raw.message.clone()),
        location_text: Some(
            analysis
                .location
                .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        ),
        urgency: analysis.urgency,
        need_type: analysis.need_type,
        summary: analysis.summary,
        severity_score: 0,
        coordinates,
        authenticity_score: analysis.authenticity_score,
        reasoning: analysis.reasoning,
        flags: analysis.flags,
        timestamp: Some(Utc::now()),
        error: None,
    };
    incident.severity_score = incident.derived_severity();
    incident
}

/// Reads raw messages from a CSV file with `id` and `message` columns.
///
/// # Errors
///
/// Returns [`IngestError::Io`] if the file cannot be opened and
/// [`IngestError::Csv`] if a row cannot be decoded.
pub fn read_messages(path: &Path) -> Result<Vec<RawMessage>, IngestError> {
    let file = std::fs::File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::Reader::from_reader(file);
    let messages = reader
        .deserialize()
        .collect::<Result<Vec<RawMessage>, csv::Error>>()?;
    Ok(messages)
}

/// Processes `messages` and replaces the contents of `store` with the
/// results.
///
/// # Errors
///
/// Returns [`IngestError::Store`] if the results cannot be written.
pub async fn run(
    pipeline: &Pipeline<'_>,
    messages: &[RawMessage],
    concurrency: usize,
    store: &IncidentStore,
) -> Result<IngestStats, IngestError> {
    let start = Instant::now();
    log::info!(
        "Starting preprocessing of {} messages (concurrency {concurrency})",
        messages.len()
    );

    let incidents = pipeline.process_all(messages, concurrency).await;
    store.replace_all(&incidents).await?;

    let stats = IngestStats::from_incidents(&incidents);
    log::info!(
        "Preprocessing complete in {:.1}s: {} processed, {} failed, {} without coordinates, {} listable. Saved to {}",
        start.elapsed().as_secs_f64(),
        stats.total,
        stats.failed,
        stats.unlocated,
        stats.listable,
        store.path().display()
    );

    Ok(stats)
}
