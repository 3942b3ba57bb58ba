#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Mapping-provider lookups for SOS incidents.
//!
//! Three operations sit behind the [`MapsApi`] trait:
//!
//! 1. **Geocoding** - free-text location to coordinates.
//! 2. **Directions** - distance, duration, and encoded polyline between
//!    two coordinates.
//! 3. **Nearby places** - named points of a given category around a
//!    coordinate.
//!
//! [`google::GoogleMapsClient`] implements them against Google Maps
//! Platform. Lookups return `Ok(None)` (or an empty list) when the
//! provider has no answer and `Err` when the request itself failed, so
//! callers can tell "not found" from "transport failed". The helpers
//! [`geocode_location`] and [`nearby_places`] apply the best-effort
//! recovery rules on top of that.

pub mod google;

use serde::{Deserialize, Serialize};
use sos_map_incident_models::{Coordinates, UNKNOWN_LOCATION};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

/// Search radius for nearby places, in meters.
pub const NEARBY_RADIUS_METERS: u32 = 5000;

/// Errors from mapping-provider operations.
#[derive(Debug, Error)]
pub enum MapsError {
    /// HTTP request failed or returned a non-success HTTP status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success API status.
    #[error("Provider status {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        /// API status code (e.g. `REQUEST_DENIED`).
        status: String,
        /// Provider error message, if any.
        message: Option<String>,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

/// A driving route between two points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Human-readable distance, e.g. `"12.3 km"`.
    pub distance: String,
    /// Human-readable duration, e.g. `"25 mins"`.
    pub duration: String,
    /// Encoded overview polyline.
    pub overview_polyline: String,
}

/// A named point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    /// Display name.
    pub name: String,
    /// Position.
    pub location: Coordinates,
}

/// Categories of emergency services looked up around an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum PlaceCategory {
    /// Hospitals.
    Hospital,
    /// Police stations.
    Police,
    /// Fire stations.
    FireStation,
}

/// Emergency services near a point. Each list is independent: a failed
/// category lookup leaves only that list empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlaces {
    /// Nearby hospitals.
    pub hospitals: Vec<Place>,
    /// Nearby police stations.
    pub police_stations: Vec<Place>,
    /// Nearby fire stations.
    pub fire_stations: Vec<Place>,
}

/// A mapping provider.
#[async_trait::async_trait]
pub trait MapsApi: Send + Sync {
    /// Geocodes a free-text address.
    ///
    /// Returns `Ok(None)` when the provider finds no match.
    ///
    /// # Errors
    ///
    /// Returns [`MapsError`] if the request fails or the provider rejects
    /// it.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, MapsError>;

    /// Finds a driving route from `origin` to `destination`.
    ///
    /// Returns `Ok(None)` when the provider finds no route.
    ///
    /// # Errors
    ///
    /// Returns [`MapsError`] if the request fails or the provider rejects
    /// it.
    async fn directions(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Option<Route>, MapsError>;

    /// Lists places of `category` within `radius_meters` of `location`.
    ///
    /// # Errors
    ///
    /// Returns [`MapsError`] if the request fails or the provider rejects
    /// it.
    async fn nearby(
        &self,
        location: Coordinates,
        radius_meters: u32,
        category: PlaceCategory,
    ) -> Result<Vec<Place>, MapsError>;
}

/// Geocodes an extracted location, never failing.
///
/// Skips the lookup entirely for blank or `"Unknown"` locations. When
/// `region` is non-empty the query is `"<location>, <region>"`. Provider
/// and transport failures are logged and become `None`.
pub async fn geocode_location(
    maps: &dyn MapsApi,
    location_text: &str,
    region: &str,
) -> Option<Coordinates> {
    let location = location_text.trim();
    if location.is_empty() || location.eq_ignore_ascii_case(UNKNOWN_LOCATION) {
        log::debug!("Skipping geocoding for location {location_text:?}");
        return None;
    }

    let query = if region.trim().is_empty() {
        location.to_string()
    } else {
        format!("{location}, {}", region.trim())
    };

    match maps.geocode(&query).await {
        Ok(Some(coords)) => {
            log::debug!("Geocoded {query:?} to {coords}");
            Some(coords)
        }
        Ok(None) => {
            log::info!("No geocoding match for {query:?}");
            None
        }
        Err(e) => {
            log::warn!("Geocoding {query:?} failed: {e}");
            None
        }
    }
}

/// Looks up hospitals, police stations, and fire stations around
/// `location` concurrently.
///
/// A failing category is logged and yields an empty list; the other
/// categories are still returned.
pub async fn nearby_places(maps: &dyn MapsApi, location: Coordinates) -> NearbyPlaces {
    let lookup = |category: PlaceCategory| async move {
        maps.nearby(location, NEARBY_RADIUS_METERS, category)
            .await
            .unwrap_or_else(|e| {
                log::warn!("Nearby {category} lookup around {location} failed: {e}");
                Vec::new()
            })
    };

    let (hospitals, police_stations, fire_stations) = futures::future::join3(
        lookup(PlaceCategory::Hospital),
        lookup(PlaceCategory::Police),
        lookup(PlaceCategory::FireStation),
    )
    .await;

    NearbyPlaces {
        hospitals,
        police_stations,
        fire_stations,
    }
}
