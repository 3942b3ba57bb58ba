//! Google Maps Platform client.
//!
//! Uses the Geocoding, Directions, and Places Nearby Search web services.
//! All three report an application-level `status` field alongside the
//! HTTP status: `OK` carries results, `ZERO_RESULTS` / `NOT_FOUND` mean
//! "nothing found", and anything else (`REQUEST_DENIED`,
//! `OVER_QUERY_LIMIT`, ...) is an error.
//!
//! See <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>

use std::time::Duration;

use sos_map_incident_models::Coordinates;

use crate::{MapsApi, MapsError, Place, PlaceCategory, Route};

/// Google Maps web services base URL.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Google Maps Platform client.
pub struct GoogleMapsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleMapsClient {
    /// Creates a client whose requests are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`MapsError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, MapsError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Points the client at a different base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, MapsError> {
        let resp = self
            .client
            .get(format!("{}/{endpoint}/json", self.base_url.trim_end_matches('/')))
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json().await?)
    }
}

#[async_trait::async_trait]
impl MapsApi for GoogleMapsClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, MapsError> {
        let body = self.get_json("geocode", &[("address", address)]).await?;
        parse_geocode_response(&body)
    }

    async fn directions(
        &self,
        origin: Coordinates,
        destination: Coordinates,
    ) -> Result<Option<Route>, MapsError> {
        let origin = origin.to_string();
        let destination = destination.to_string();
        let body = self
            .get_json(
                "directions",
                &[("origin", origin.as_str()), ("destination", destination.as_str())],
            )
            .await?;
        parse_directions_response(&body)
    }

    async fn nearby(
        &self,
        location: Coordinates,
        radius_meters: u32,
        category: PlaceCategory,
    ) -> Result<Vec<Place>, MapsError> {
        let location = location.to_string();
        let radius = radius_meters.to_string();
        let body = self
            .get_json(
                "place/nearbysearch",
                &[
                    ("location", location.as_str()),
                    ("radius", radius.as_str()),
                    ("type", category.as_ref()),
                ],
            )
            .await?;
        parse_nearby_response(&body)
    }
}

/// Checks the application status. Returns `Ok(true)` for results,
/// `Ok(false)` for "nothing found".
fn check_status(body: &serde_json::Value) -> Result<bool, MapsError> {
    let status = body["status"].as_str().ok_or_else(|| MapsError::Parse {
        message: "Missing status in Google Maps response".to_string(),
    })?;

    match status {
        "OK" => Ok(true),
        "ZERO_RESULTS" | "NOT_FOUND" => Ok(false),
        other => Err(MapsError::Status {
            status: other.to_string(),
            message: body["error_message"].as_str().map(String::from),
        }),
    }
}

fn parse_location(value: &serde_json::Value) -> Result<Coordinates, MapsError> {
    let lat = value["lat"].as_f64().ok_or_else(|| MapsError::Parse {
        message: "Missing lat in Google Maps location".to_string(),
    })?;
    let lng = value["lng"].as_f64().ok_or_else(|| MapsError::Parse {
        message: "Missing lng in Google Maps location".to_string(),
    })?;
    Ok(Coordinates::new(lat, lng))
}

/// Parses a Geocoding API response.
fn parse_geocode_response(body: &serde_json::Value) -> Result<Option<Coordinates>, MapsError> {
    if !check_status(body)? {
        return Ok(None);
    }

    body["results"]
        .as_array()
        .and_then(|results| results.first())
        .map(|first| parse_location(&first["geometry"]["location"]))
        .transpose()
}

/// Parses a Directions API response, taking the first leg of the first
/// route.
fn parse_directions_response(body: &serde_json::Value) -> Result<Option<Route>, MapsError> {
    if !check_status(body)? {
        return Ok(None);
    }

    let Some(route) = body["routes"].as_array().and_then(|routes| routes.first()) else {
        return Ok(None);
    };

    let leg = &route["legs"][0];
    let text = |value: &serde_json::Value, what: &str| {
        value.as_str().map(String::from).ok_or_else(|| MapsError::Parse {
            message: format!("Missing {what} in Directions response"),
        })
    };

    Ok(Some(Route {
        distance: text(&leg["distance"]["text"], "distance")?,
        duration: text(&leg["duration"]["text"], "duration")?,
        overview_polyline: text(&route["overview_polyline"]["points"], "overview_polyline")?,
    }))
}

/// Parses a Places Nearby Search response.
fn parse_nearby_response(body: &serde_json::Value) -> Result<Vec<Place>, MapsError> {
    if !check_status(body)? {
        return Ok(Vec::new());
    }

    body["results"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|place| {
            Ok(Place {
                name: place["name"].as_str().unwrap_or_default().to_string(),
                location: parse_location(&place["geometry"]["location"])?,
            })
        })
        .collect()
}
