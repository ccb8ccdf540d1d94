//! Interactive mode for the server.
//!
//! Prompts the user for the bundle path, bind address and port before
//! starting the server.

use std::path::Path;

use dialoguer::{Confirm, Input};

use crate::{DEFAULT_BUNDLE_PATH, ServerConfig};

/// Runs the server in interactive mode, prompting for configuration.
///
/// Asks the user for a bundle path, bind address and port, sets the
/// corresponding environment variables (`CRIME_RISK_BUNDLE`, `BIND_ADDR`,
/// `PORT`), and delegates to [`super::run_server`].
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Crime Risk Server");
    println!();

    let defaults = ServerConfig::from_env();

    let bundle_path: String = Input::new()
        .with_prompt("Bundle path")
        .default(defaults.bundle_path.display().to_string())
        .interact_text()
        .unwrap_or_else(|_| DEFAULT_BUNDLE_PATH.to_string());

    if !Path::new(&bundle_path).is_file() {
        println!("No bundle at {bundle_path}. Train a model first.");
        return Ok(());
    }

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr)
        .interact_text()
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port_str: String = Input::new()
        .with_prompt("Port")
        .default(defaults.port.to_string())
        .interact_text()
        .unwrap_or_else(|_| "5000".to_string());

    // SAFETY: We are single-threaded at this point (before server starts) and
    // these variables are only read once during server initialisation.
    unsafe {
        std::env::set_var("CRIME_RISK_BUNDLE", &bundle_path);
        std::env::set_var("BIND_ADDR", &bind_addr);
        std::env::set_var("PORT", &port_str);
    }

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port_str}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::run_server().await
}
