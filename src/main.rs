#[macro_use]
extern crate rocket;

mod api;
mod auth;
mod aws;
mod db;
mod env;
mod error;
mod identity;
mod models;
mod services;
mod store;
mod telemetry;
#[cfg(test)]
mod test;
mod validation;

use std::sync::Mutex;

use api::{
    add_record, add_workout, add_workout_page, bad_request, dashboard, health, landing, login,
    login_page, logout, my_records, my_students, my_workouts, register, register_page,
    unprocessable_entity,
};
use auth::unauthorized;
use env::{AppConfig, load_environment};
use error::AppError;
use once_cell::sync::Lazy;
use rocket::fairing::AdHoc;
use rocket::{Build, Rocket};
use services::Services;
use telemetry::{OtelGuard, TelemetryFairing, init_tracing, shutdown_telemetry};
use thiserror::Error;
use tracing::{error, info};

pub static TELEMETRY_GUARD: Lazy<Mutex<Option<OtelGuard>>> = Lazy::new(|| Mutex::new(None));

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Anyhow(anyhow::Error),
    #[error("Application error: {0}")]
    App(#[from] AppError),
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Anyhow(value)
    }
}

fn configure() -> Result<(AppConfig, Services), Error> {
    let config = AppConfig::from_env()?;
    let services = Services::from_config(&config)?;
    Ok((config, services))
}

#[launch]
async fn rocket() -> _ {
    if let Err(e) = load_environment() {
        eprintln!("Failed to load environment files: {}", e);
    }

    let otel_guard = init_tracing();
    if let Ok(mut slot) = TELEMETRY_GUARD.lock() {
        *slot = otel_guard;
    }

    match configure() {
        Ok((config, services)) => init_rocket(&config, services),
        Err(e) => {
            error!("Failed to configure application: {}", e);
            panic!("Configuration failed: {}", e);
        }
    }
}

pub fn init_rocket(config: &AppConfig, services: Services) -> Rocket<Build> {
    info!("Starting strength coach");

    let figment = rocket::Config::figment().merge(("secret_key", config.rocket_secret_key()));

    rocket::custom(figment)
        .manage(services)
        .mount(
            "/",
            routes![
                dashboard,
                landing,
                login_page,
                login,
                register_page,
                register,
                add_workout_page,
                add_workout,
                my_workouts,
                my_students,
                my_records,
                add_record,
                logout,
                health,
            ],
        )
        .register(
            "/",
            catchers![unauthorized, bad_request, unprocessable_entity],
        )
        .attach(TelemetryFairing)
        .attach(AdHoc::on_shutdown("Telemetry shutdown", |_| {
            Box::pin(async { shutdown_telemetry() })
        }))
}
