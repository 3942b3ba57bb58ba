//! HTTP handler functions for the SOS map API.

use actix_web::{HttpResponse, web};
use chrono::Utc;
use sos_map_ai::situation::{SituationUpdate, situation_update_or_fallback};
use sos_map_maps::{MapsError, nearby_places};
use sos_map_server_models::{
    ApiError, ApiHealth, ApiReportResponse, CoordinateParams, ReportIncidentRequest,
    RouteQueryParams,
};
use sos_map_store::StoreError;
use sos_map_triage::rank_incidents;
use sos_map_triage::report::{build_report_incident, next_report_id};

use crate::AppState;

const MISSING_COORDINATES: &str = "Missing latitude or longitude parameters.";

/// `GET /health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /get_sos_data`
///
/// Returns the located, sufficiently authentic incidents ordered by
/// severity, highest first.
pub async fn get_sos_data(state: web::Data<AppState>) -> HttpResponse {
    match state.store.load().await {
        Ok(incidents) => {
            let ranked = rank_incidents(incidents);
            log::info!("Returning {} ranked incidents", ranked.len());
            HttpResponse::Ok().json(ranked)
        }
        Err(e) => {
            log::error!("Failed to load incidents: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(store_error_message(&e)))
        }
    }
}

/// `GET /get_situation_update`
///
/// Never fails: any store or model failure serves the fixed fallback.
pub async fn get_situation_update(state: web::Data<AppState>) -> HttpResponse {
    let update = match state.store.load().await {
        Ok(incidents) => {
            let ranked = rank_incidents(incidents);
            situation_update_or_fallback(state.llm.as_ref(), &ranked).await
        }
        Err(e) => {
            log::warn!("Situation update without incident data: {e}");
            SituationUpdate::fallback()
        }
    };

    HttpResponse::Ok().json(update)
}

/// `GET /get_route`
///
/// Driving route from `start_lat`/`start_lng` (or the rescue
/// headquarters) to `lat`/`lng`.
pub async fn get_route(
    state: web::Data<AppState>,
    params: web::Query<RouteQueryParams>,
) -> HttpResponse {
    let Some(destination) = params.destination() else {
        return HttpResponse::BadRequest().json(ApiError::new(MISSING_COORDINATES));
    };
    let origin = params.origin().unwrap_or(state.headquarters);

    match state.maps.directions(origin, destination).await {
        Ok(Some(route)) => HttpResponse::Ok().json(route),
        Ok(None) => {
            log::info!("No route from {origin} to {destination}");
            HttpResponse::NotFound().json(ApiError::new("Directions API could not find a route."))
        }
        Err(MapsError::Status { status, message }) => {
            log::warn!(
                "Directions API returned {status} for {origin} -> {destination}: {}",
                message.as_deref().unwrap_or("no message")
            );
            HttpResponse::NotFound().json(
                ApiError::new("Directions API could not find a route.").with_status(status),
            )
        }
        Err(e) => {
            log::warn!("Directions lookup for {origin} -> {destination} failed: {e}");
            HttpResponse::InternalServerError()
                .json(ApiError::new(format!("Failed to call Directions API: {e}")))
        }
    }
}

/// `GET /get_nearby_places`
///
/// Hospitals, police stations, and fire stations around `lat`/`lng`.
pub async fn get_nearby_places(
    state: web::Data<AppState>,
    params: web::Query<CoordinateParams>,
) -> HttpResponse {
    let Some(location) = params.coordinates() else {
        return HttpResponse::BadRequest().json(ApiError::new(MISSING_COORDINATES));
    };

    HttpResponse::Ok().json(nearby_places(state.maps.as_ref(), location).await)
}

/// `POST /report_incident`
///
/// Classifies a direct report by keyword and stores it at the front of
/// the incident list.
pub async fn report_incident(
    state: web::Data<AppState>,
    body: web::Json<ReportIncidentRequest>,
) -> HttpResponse {
    let ReportIncidentRequest {
        description,
        lat,
        lng,
    } = body.into_inner();

    let description = description.as_deref().map(str::trim).unwrap_or_default();
    let (Some(lat), Some(lng)) = (lat, lng) else {
        return HttpResponse::BadRequest().json(ApiError::new("Missing description, lat, or lng."));
    };
    if description.is_empty() {
        return HttpResponse::BadRequest().json(ApiError::new("Missing description, lat, or lng."));
    }

    let coords = sos_map_incident_models::Coordinates::new(lat, lng);
    let reported_at = Utc::now();

    let stored = state
        .store
        .prepend_with(|existing| {
            let id = next_report_id(existing, coords);
            build_report_incident(id, description, coords, reported_at)
        })
        .await;

    match stored {
        Ok(incident) => {
            log::info!(
                "Stored report {} at {coords} (severity {})",
                incident.id,
                incident.severity_score
            );
            HttpResponse::Ok().json(ApiReportResponse {
                message: "Incident reported successfully.".to_string(),
                incident,
            })
        }
        Err(e) => {
            log::error!("Failed to store report at {coords}: {e}");
            HttpResponse::InternalServerError().json(ApiError::new(store_error_message(&e)))
        }
    }
}

fn store_error_message(e: &StoreError) -> &'static str {
    match e {
        StoreError::NotFound { .. } => {
            "Processed data file not found. Run the preprocessing pipeline first."
        }
        StoreError::Json(_) => "Failed to decode the processed data file.",
        StoreError::Io(_) => "Failed to access the processed data file.",
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use sos_map_ai::AiError;
    use sos_map_ai::providers::LlmProvider;
    use sos_map_incident_models::{Coordinates, Incident};
    use sos_map_maps::{MapsApi, Place, PlaceCategory, Route};
    use sos_map_store::IncidentStore;

    use super::*;

    #[derive(Default)]
    struct Calls {
        llm: AtomicUsize,
        maps: AtomicUsize,
    }

    struct StubLlm {
        calls: Arc<Calls>,
        answer: Option<&'static str>,
    }

    #[async_trait::async_trait]
    impl LlmProvider for StubLlm {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, AiError> {
            self.calls.llm.fetch_add(1, Ordering::SeqCst);
            self.answer
                .map(str::to_string)
                .ok_or(AiError::EmptyResponse)
        }
    }

    struct StubMaps {
        calls: Arc<Calls>,
    }

    #[async_trait::async_trait]
    impl MapsApi for StubMaps {
        async fn geocode(&self, _address: &str) -> Result<Option<Coordinates>, MapsError> {
            self.calls.maps.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn directions(
            &self,
            origin: Coordinates,
            destination: Coordinates,
        ) -> Result<Option<Route>, MapsError> {
            self.calls.maps.fetch_add(1, Ordering::SeqCst);
            if destination.lat > 80.0 {
                return Ok(None);
            }
            if destination.lat < -80.0 {
                return Err(MapsError::Status {
                    status: "REQUEST_DENIED".to_string(),
                    message: None,
                });
            }
            Ok(Some(Route {
                distance: "21.4 km".to_string(),
                duration: "48 mins".to_string(),
                overview_polyline: format!("{origin}|{destination}"),
            }))
        }

        async fn nearby(
            &self,
            location: Coordinates,
            _radius_meters: u32,
            category: PlaceCategory,
        ) -> Result<Vec<Place>, MapsError> {
            self.calls.maps.fetch_add(1, Ordering::SeqCst);
            match category {
                PlaceCategory::FireStation => Err(MapsError::Parse {
                    message: "unexpected body".to_string(),
                }),
                _ => Ok(vec![Place {
                    name: format!("{category} near {location}"),
                    location,
                }]),
            }
        }
    }

    const HQ: Coordinates = Coordinates::new(18.9486, 72.8336);

    fn temp_store(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sos_map_server_test_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("processed_data.json")
    }

    fn state(path: PathBuf, answer: Option<&'static str>) -> (web::Data<AppState>, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let state = web::Data::new(AppState {
            store: IncidentStore::new(path),
            llm: Box::new(StubLlm {
                calls: calls.clone(),
                answer,
            }),
            maps: Box::new(StubMaps {
                calls: calls.clone(),
            }),
            headquarters: HQ,
        });
        (state, calls)
    }

    fn located(id: i64, severity: u32, authenticity: u8) -> Incident {
        let mut incident = Incident::analysis_failed(id);
        incident.error = None;
        incident.summary = Some(format!("Incident {id}"));
        incident.severity_score = severity;
        incident.authenticity_score = Some(authenticity);
        incident.coordinates = Some(Coordinates::new(19.0, 72.8));
        incident
    }

    fn cleanup(path: &std::path::Path) {
        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let app = test::init_service(App::new().configure(crate::configure)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn sos_data_is_filtered_and_ranked() {
        let path = temp_store("sos_data");
        let (state, _) = state(path.clone(), None);
        let mut unlocated = located(6, 20, 9);
        unlocated.coordinates = None;
        state
            .store
            .replace_all(&[
                located(1, 5, 9),
                located(2, 9, 9),
                located(3, 9, 9),
                located(4, 2, 9),
                located(5, 15, 3),
                unlocated,
                Incident::analysis_failed(7),
            ])
            .await
            .unwrap();

        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;
        let req = test::TestRequest::get().uri("/get_sos_data").to_request();
        let body: Vec<Incident> = test::call_and_read_body_json(&app, req).await;

        let ids: Vec<i64> = body.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 3, 1, 4]);

        cleanup(&path);
    }

    #[actix_web::test]
    async fn sos_data_store_failures_are_500() {
        let path = temp_store("sos_data_missing");
        let (state, _) = state(path.clone(), None);
        let app = test::init_service(
            App::new()
                .app_data(state)
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/get_sos_data").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        let req = test::TestRequest::get().uri("/get_sos_data").to_request();
        let body: ApiError = test::read_body_json(test::call_service(&app, req).await).await;
        assert_eq!(body.error, "Failed to decode the processed data file.");

        cleanup(&path);
    }

    #[actix_web::test]
    async fn route_requires_destination_before_any_lookup() {
        let (state, calls) = state(temp_store("route_missing"), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        for uri in ["/get_route", "/get_route?lat=19.1", "/get_nearby_places?lng=72.8"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
        assert_eq!(calls.maps.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn route_defaults_to_headquarters() {
        let (state, calls) = state(temp_store("route"), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = test::TestRequest::get()
            .uri("/get_route?lat=19.1197&lng=72.8464")
            .to_request();
        let route: Route = test::call_and_read_body_json(&app, req).await;
        assert_eq!(route.distance, "21.4 km");
        assert_eq!(route.overview_polyline, "18.9486,72.8336|19.1197,72.8464");

        let req = test::TestRequest::get()
            .uri("/get_route?lat=19.1197&lng=72.8464&start_lat=19&start_lng=72.9")
            .to_request();
        let route: Route = test::call_and_read_body_json(&app, req).await;
        assert_eq!(route.overview_polyline, "19,72.9|19.1197,72.8464");

        assert_eq!(calls.maps.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn route_not_found_is_404() {
        let (state, _) = state(temp_store("route_404"), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = test::TestRequest::get()
            .uri("/get_route?lat=85&lng=72.8")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get()
            .uri("/get_route?lat=-85&lng=72.8")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.status.as_deref(), Some("REQUEST_DENIED"));
    }

    #[actix_web::test]
    async fn nearby_places_keeps_partial_results() {
        let (state, calls) = state(temp_store("nearby"), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = test::TestRequest::get()
            .uri("/get_nearby_places?lat=19.0&lng=72.8")
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["hospitals"][0]["name"], "hospital near 19,72.8");
        assert_eq!(body["hospitals"][0]["location"]["lat"], 19.0);
        assert_eq!(body["police_stations"].as_array().unwrap().len(), 1);
        assert!(body["fire_stations"].as_array().unwrap().is_empty());
        assert_eq!(calls.maps.load(Ordering::SeqCst), 3);
    }

    #[actix_web::test]
    async fn report_is_classified_and_prepended() {
        let path = temp_store("report");
        let (state, calls) = state(path.clone(), None);
        state.store.replace_all(&[located(1, 5, 9)]).await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::configure),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/report_incident")
            .set_json(serde_json::json!({
                "description": "Fire reported in building",
                "lat": 19.076,
                "lng": 72.8777
            }))
            .to_request();
        let body: ApiReportResponse = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body.incident.id, 190_760_728_777);
        assert_eq!(body.incident.urgency.as_deref(), Some("Life-threatening"));
        assert_eq!(body.incident.severity_score, 9);
        assert_eq!(body.incident.authenticity_score, Some(10));
        assert!(body.incident.timestamp.is_some());

        let stored = state.store.load().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0], body.incident);
        assert_eq!(stored[1].id, 1);

        assert_eq!(calls.llm.load(Ordering::SeqCst), 0);
        assert_eq!(calls.maps.load(Ordering::SeqCst), 0);

        cleanup(&path);
    }

    #[actix_web::test]
    async fn report_with_same_coordinates_gets_fresh_id() {
        let path = temp_store("report_collision");
        let (state, _) = state(path.clone(), None);
        let app = test::init_service(
            App::new()
                .app_data(state.clone())
                .configure(crate::configure),
        )
        .await;

        for description in ["need water and food", "still need water"] {
            let req = test::TestRequest::post()
                .uri("/report_incident")
                .set_json(serde_json::json!({
                    "description": description,
                    "lat": 19.0,
                    "lng": 72.8
                }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        let stored = state.store.load().await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_ne!(stored[0].id, stored[1].id);
        assert_eq!(stored[1].urgency.as_deref(), Some("Urgent"));
        assert_eq!(stored[1].severity_score, 5);

        cleanup(&path);
    }

    #[actix_web::test]
    async fn sos_data_tolerates_loose_legacy_fields() {
        let path = temp_store("sos_data_legacy");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"[
                {"id": 1, "severity_score": 5, "authenticity_score": 9, "flags": [],
                 "coordinates": {"lat": 19.1, "lng": 72.8}},
                {"id": 2, "severity_score": 9, "authenticity_score": 7.5, "flags": null,
                 "coordinates": {"lat": 19.0, "lng": 72.9}},
                {"id": 3, "error": "AI analysis failed."}
            ]"#,
        )
        .unwrap();

        let (state, _) = state(path.clone(), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = test::TestRequest::get().uri("/get_sos_data").to_request();
        let body: Vec<Incident> = test::call_and_read_body_json(&app, req).await;
        let ids: Vec<i64> = body.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(body[0].authenticity_score, Some(8));

        cleanup(&path);
    }

    #[actix_web::test]
    async fn report_into_corrupt_store_is_500_and_leaves_file() {
        let path = temp_store("report_corrupt");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let (state, _) = state(path.clone(), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = test::TestRequest::post()
            .uri("/report_incident")
            .set_json(serde_json::json!({
                "description": "Flood water entering ground floor",
                "lat": 19.0,
                "lng": 72.8
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "Failed to decode the processed data file.");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");

        cleanup(&path);
    }

    #[actix_web::test]
    async fn report_missing_fields_is_400() {
        let path = temp_store("report_missing");
        let (state, _) = state(path.clone(), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        for body in [
            serde_json::json!({ "lat": 19.0, "lng": 72.8 }),
            serde_json::json!({ "description": "   ", "lat": 19.0, "lng": 72.8 }),
            serde_json::json!({ "description": "Flood", "lat": 19.0 }),
        ] {
            let req = test::TestRequest::post()
                .uri("/report_incident")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }
        assert!(!path.exists());
    }

    #[actix_web::test]
    async fn situation_update_falls_back() {
        let (state, calls) = state(temp_store("situation_fallback"), None);
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = test::TestRequest::get()
            .uri("/get_situation_update")
            .to_request();
        let update: SituationUpdate = test::call_and_read_body_json(&app, req).await;
        assert_eq!(update, SituationUpdate::fallback());
        assert_eq!(calls.llm.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn situation_update_uses_model_answer() {
        let path = temp_store("situation");
        let (state, calls) = state(
            path.clone(),
            Some(r#"{"temperature": "27°C", "condition": "Thunderstorms", "insight": "Send boats to Kurla."}"#),
        );
        state.store.replace_all(&[located(1, 15, 9)]).await.unwrap();
        let app =
            test::init_service(App::new().app_data(state).configure(crate::configure)).await;

        let req = test::TestRequest::get()
            .uri("/get_situation_update")
            .to_request();
        let update: SituationUpdate = test::call_and_read_body_json(&app, req).await;
        assert_eq!(update.condition, "Thunderstorms");
        assert_eq!(calls.llm.load(Ordering::SeqCst), 1);

        cleanup(&path);
    }
}
