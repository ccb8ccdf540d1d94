#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Standalone entry point for the crime risk prediction service.
//!
//! Configured through `BIND_ADDR`, `PORT`, `CRIME_RISK_BUNDLE` and
//! `STATIC_DIR`.

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    crime_risk_server::run_server().await
}
