#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Binary entry point for the SOS map API server.

use sos_map_config::Config;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = Config::from_env().inspect_err(|e| {
        log::error!("Invalid configuration: {e}");
    })?;

    sos_map_server::run_server(&config).await?;

    Ok(())
}
