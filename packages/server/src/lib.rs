#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web prediction service for the crime risk model.
//!
//! Loads the artifact bundle once at startup and serves `POST /predict`,
//! `GET /metadata` and `GET /health`, plus the static browser frontend
//! when its directory exists. The bundle is never reloaded; restart the
//! process to pick up a new one.

mod handlers;
pub mod interactive;
pub mod service;

use std::path::PathBuf;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use crime_risk_model::ArtifactBundle;

pub use handlers::json_config;
pub use service::{PredictionService, ServiceError, ValidationError};

/// Default bundle location, relative to the working directory.
pub const DEFAULT_BUNDLE_PATH: &str = "data/generated/risk_bundle.json";

/// Shared application state.
pub struct AppState {
    /// The loaded model and maps.
    pub service: PredictionService,
}

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind (`BIND_ADDR`, default `127.0.0.1`).
    pub bind_addr: String,
    /// Port to bind (`PORT`, default `5000`).
    pub port: u16,
    /// Bundle to load (`CRIME_RISK_BUNDLE`).
    pub bundle_path: PathBuf,
    /// Frontend directory (`STATIC_DIR`, default `static`).
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Reads the settings from the environment, falling back to defaults
    /// for anything unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            bundle_path: std::env::var("CRIME_RISK_BUNDLE")
                .map_or_else(|_| PathBuf::from(DEFAULT_BUNDLE_PATH), PathBuf::from),
            static_dir: std::env::var("STATIC_DIR")
                .map_or_else(|_| PathBuf::from("static"), PathBuf::from),
        }
    }
}

/// Registers the API routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(handlers::health))
        .route("/predict", web::post().to(handlers::predict))
        .route("/metadata", web::get().to(handlers::metadata));
}

/// Starts the prediction service.
///
/// Loads and verifies the bundle before binding; a missing or invalid
/// bundle is an error and the server never starts. This is a regular
/// async function; the caller is responsible for providing the async
/// runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the bundle cannot be loaded, or
/// if the HTTP server fails to bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ServerConfig::from_env();

    log::info!("Loading bundle from {}...", config.bundle_path.display());
    let bundle = ArtifactBundle::load(&config.bundle_path).map_err(|e| {
        std::io::Error::other(format!(
            "failed to load bundle {}: {e}",
            config.bundle_path.display()
        ))
    })?;
    log::info!(
        "Serving {} neighborhoods, {} cities, {} crime types",
        bundle.encoders.neighborhoods.len(),
        bundle.encoders.cities.len(),
        bundle.encoders.crime_types.len()
    );

    let state = web::Data::new(AppState {
        service: PredictionService::from_bundle(bundle),
    });

    let static_dir = if config.static_dir.is_dir() {
        Some(config.static_dir.clone())
    } else {
        log::warn!(
            "Static directory {} not found; serving the API only",
            config.static_dir.display()
        );
        None
    };

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        let app = App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(json_config())
            .configure(routes);

        // Serve frontend static files
        match &static_dir {
            Some(dir) => app.service(Files::new("/", dir).index_file("index.html")),
            None => app,
        }
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
