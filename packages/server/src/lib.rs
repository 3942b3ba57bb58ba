#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the SOS incident map.
//!
//! Serves the ranked incident list from the incident store, accepts direct
//! incident reports, and proxies route, nearby-place, and situation
//! lookups to the configured mapping and language-model providers.

mod handlers;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use sos_map_ai::AiError;
use sos_map_ai::providers::{LlmProvider, create_provider};
use sos_map_config::Config;
use sos_map_incident_models::Coordinates;
use sos_map_maps::google::GoogleMapsClient;
use sos_map_maps::{MapsApi, MapsError};
use sos_map_store::IncidentStore;
use thiserror::Error;

/// Errors that prevent the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The language-model provider could not be constructed.
    #[error("AI provider error: {0}")]
    Ai(#[from] AiError),

    /// The mapping client could not be constructed.
    #[error("Maps client error: {0}")]
    Maps(#[from] MapsError),

    /// Binding or serving failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// Incident store.
    pub store: IncidentStore,
    /// Language model for situation updates.
    pub llm: Box<dyn LlmProvider>,
    /// Mapping provider for routes and nearby places.
    pub maps: Box<dyn MapsApi>,
    /// Route origin when the caller does not supply one.
    pub headquarters: Coordinates,
}

impl AppState {
    /// Builds the state for `config`, connecting the configured providers.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if a provider client cannot be constructed.
    pub fn from_config(config: &Config) -> Result<Self, ServerError> {
        let llm = create_provider(&config.llm, config.http_timeout)?;
        let maps = GoogleMapsClient::new(config.maps_api_key.clone(), config.http_timeout)?;

        Ok(Self {
            store: IncidentStore::new(config.data_file.clone()),
            llm,
            maps: Box::new(maps),
            headquarters: config.headquarters,
        })
    }
}

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/get_sos_data", web::get().to(handlers::get_sos_data))
        .route(
            "/get_situation_update",
            web::get().to(handlers::get_situation_update),
        )
        .route("/get_route", web::get().to(handlers::get_route))
        .route(
            "/get_nearby_places",
            web::get().to(handlers::get_nearby_places),
        )
        .route("/report_incident", web::post().to(handlers::report_incident));
}

/// Starts the SOS map API server.
///
/// Builds the provider clients from `config` and serves until shutdown.
/// This is a regular async function; the caller is responsible for
/// providing the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if a provider client cannot be constructed or
/// the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: &Config) -> Result<(), ServerError> {
    let state = web::Data::new(AppState::from_config(config)?);

    log::info!(
        "Serving incidents from {} (headquarters {})",
        state.store.path().display(),
        state.headquarters
    );
    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
