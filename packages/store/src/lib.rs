#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident store backed by a single JSON document.
//!
//! The whole incident list is read and rewritten on every mutation. All
//! mutations go through one async mutex so concurrent report submissions
//! cannot overwrite each other, and writes land in a sibling temp file
//! that is renamed over the target so readers never observe a partially
//! written document.

use std::path::{Path, PathBuf};

use sos_map_incident_models::Incident;
use thiserror::Error;
use tokio::sync::Mutex;

/// Errors from incident store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store file does not exist yet.
    #[error("Incident store not found at {}. Run the preprocessing pipeline first.", .path.display())]
    NotFound {
        /// Path that was looked up.
        path: PathBuf,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store file is not a valid incident list.
    #[error("Failed to decode incident store: {0}")]
    Json(#[from] serde_json::Error),
}

/// A JSON-file-backed list of incidents.
pub struct IncidentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl IncidentStore {
    /// Creates a store for the JSON document at `path`. The file is not
    /// touched until the first read or write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing JSON document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every stored incident in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the file does not exist,
    /// [`StoreError::Io`] if it cannot be read, or [`StoreError::Json`] if
    /// it is not a valid incident list.
    pub async fn load(&self) -> Result<Vec<Incident>, StoreError> {
        read_incidents(&self.path).await
    }

    /// Replaces the stored list with `incidents`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if serialization or the write fails.
    pub async fn replace_all(&self, incidents: &[Incident]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        write_incidents(&self.path, incidents).await
    }

    /// Inserts a new incident at the front of the list (most recent first)
    /// and persists the result.
    ///
    /// `build` receives the current list so it can choose an id that does
    /// not collide. A missing store file is treated as an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the existing file cannot be read or
    /// decoded, or the write fails.
    pub async fn prepend_with<F>(&self, build: F) -> Result<Incident, StoreError>
    where
        F: FnOnce(&[Incident]) -> Incident,
    {
        let _guard = self.write_lock.lock().await;

        let mut incidents = match read_incidents(&self.path).await {
            Ok(incidents) => incidents,
            Err(StoreError::NotFound { .. }) => {
                log::info!("Creating new incident store at {}", self.path.display());
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        let incident = build(&incidents);
        incidents.insert(0, incident.clone());
        write_incidents(&self.path, &incidents).await?;

        log::debug!(
            "Stored incident {} ({} total)",
            incident.id,
            incidents.len()
        );

        Ok(incident)
    }
}

async fn read_incidents(path: &Path) -> Result<Vec<Incident>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_incidents(path: &Path, incidents: &[Incident]) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(incidents)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp_path, json).await?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            log::warn!("Failed to remove {}: {cleanup}", tmp_path.display());
        }
        return Err(e.into());
    }

    Ok(())
}
