#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the SOS map server.
//!
//! Field names are `snake_case` on the wire, matching the dashboard
//! client. Incident records, routes, nearby places, and situation updates
//! are serialized directly from their domain types.

use serde::{Deserialize, Serialize};
use sos_map_incident_models::{Coordinates, Incident};

/// Health check response.
#[derive(Debug, Serialize)]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable error description.
    pub error: String,
    /// Provider status code, when the error came from a provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ApiError {
    /// An error without a provider status.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            status: None,
        }
    }

    /// Attaches a provider status code.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }
}

/// Query parameters carrying a single coordinate.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CoordinateParams {
    /// Latitude.
    pub lat: Option<f64>,
    /// Longitude.
    pub lng: Option<f64>,
}

impl CoordinateParams {
    /// The coordinate, if both parts were supplied.
    #[must_use]
    pub fn coordinates(self) -> Option<Coordinates> {
        Some(Coordinates::new(self.lat?, self.lng?))
    }
}

/// Query parameters for the route endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RouteQueryParams {
    /// Destination latitude.
    pub lat: Option<f64>,
    /// Destination longitude.
    pub lng: Option<f64>,
    /// Origin latitude. Defaults to the rescue headquarters.
    pub start_lat: Option<f64>,
    /// Origin longitude. Defaults to the rescue headquarters.
    pub start_lng: Option<f64>,
}

impl RouteQueryParams {
    /// The destination, if both parts were supplied.
    #[must_use]
    pub fn destination(self) -> Option<Coordinates> {
        Some(Coordinates::new(self.lat?, self.lng?))
    }

    /// The origin, if both parts were supplied.
    #[must_use]
    pub fn origin(self) -> Option<Coordinates> {
        Some(Coordinates::new(self.start_lat?, self.start_lng?))
    }
}

/// Body of a direct incident report.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportIncidentRequest {
    /// Free-text description of the incident.
    pub description: Option<String>,
    /// Reporter latitude.
    pub lat: Option<f64>,
    /// Reporter longitude.
    pub lng: Option<f64>,
}

/// Response to a successful incident report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiReportResponse {
    /// Confirmation message.
    pub message: String,
    /// The stored incident record.
    pub incident: Incident,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_origin_needs_both_parts() {
        let params: RouteQueryParams =
            serde_json::from_str(r#"{"lat": 19.1, "lng": 72.8, "start_lat": 18.9}"#).unwrap();
        assert_eq!(params.destination(), Some(Coordinates::new(19.1, 72.8)));
        assert_eq!(params.origin(), None);
    }

    #[test]
    fn error_status_is_omitted_when_absent() {
        let body = serde_json::to_value(ApiError::new("Missing latitude or longitude parameters."))
            .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "error": "Missing latitude or longitude parameters." })
        );

        let body = serde_json::to_value(ApiError::new("No route").with_status("ZERO_RESULTS"))
            .unwrap();
        assert_eq!(body["status"], "ZERO_RESULTS");
    }
}
