#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod env;
mod error;
mod models;
mod routes;
mod sheets;
mod store;
mod telemetry;
#[cfg(test)]
mod test;

use std::sync::Arc;

use anyhow::ensure;
use api::{
    api_login, api_logout, api_schedule, health, internal_error, not_found, unauthorized_api,
};
use auth::SessionStore;
use env::AppConfig;
use rocket::{Build, Rocket, tokio};
use routes::{index, static_asset};
use sheets::{SheetReader, SubprocessSheetReader};
use store::{SharedSnapshot, load_snapshot};
use telemetry::{TelemetryFairing, init_tracing};
use tracing::{info, warn};

#[launch]
async fn rocket() -> _ {
    init_tracing();

    if let Err(e) = env::load_environment() {
        warn!("Failed to load environment files: {}", e);
    }

    let config = AppConfig::from_env();

    preflight(&config).expect("Startup preflight failed");

    let reader: Arc<dyn SheetReader> = Arc::new(SubprocessSheetReader::new(
        config.parser_command.clone(),
        config.parser_script.clone(),
        config.parser_timeout,
    ));

    // A broken workbook at startup is fatal; once running, a failed reload
    // only means the previous snapshot keeps serving.
    let snapshot = load_snapshot(reader.as_ref(), &config)
        .await
        .expect("Failed to load initial data snapshot");

    let data = SharedSnapshot::new(snapshot);
    spawn_reload_task(reader, config.clone(), data.clone());

    init_rocket(config, data, SessionStore::new())
}

fn preflight(config: &AppConfig) -> anyhow::Result<()> {
    for path in config.source_paths() {
        ensure!(path.exists(), "source workbook missing: {}", path.display());
    }
    Ok(())
}

fn spawn_reload_task(reader: Arc<dyn SheetReader>, config: AppConfig, data: SharedSnapshot) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(config.reload_interval).await;

            // One task runs every reload, so reloads can never overlap.
            match load_snapshot(reader.as_ref(), &config).await {
                Ok(snapshot) => data.replace(snapshot),
                Err(e) => {
                    warn!("Scheduled reload failed, keeping previous snapshot: {}", e);
                }
            }
        }
    });
}

pub fn init_rocket(config: AppConfig, data: SharedSnapshot, sessions: SessionStore) -> Rocket<Build> {
    info!("Starting instructor portal");

    let figment = rocket::Config::figment().merge(("port", config.port));

    rocket::custom(figment)
        .manage(config)
        .manage(data)
        .manage(sessions)
        .mount("/api", routes![api_login, api_schedule, api_logout, health])
        .mount("/", routes![index, static_asset])
        .register("/", catchers![unauthorized_api, not_found, internal_error])
        .attach(TelemetryFairing)
}
