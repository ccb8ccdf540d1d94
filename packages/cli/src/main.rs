#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line toolchain for the crime risk model.
//!
//! `train` builds the artifact bundle from an occurrence CSV, `analyze`
//! writes the exploratory report and `serve` starts the prediction API.
//! Without a subcommand an interactive menu selects the tool.
//!
//! Uses `indicatif-log-bridge` (via [`crime_risk_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod analyze;
mod train;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crime_risk_analytics_models::DEFAULT_TOP_NEIGHBORHOODS;
use dialoguer::Select;

#[derive(Parser)]
#[command(name = "crime_risk", about = "Crime occurrence risk toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from an occurrence CSV and write the artifact bundle
    Train {
        /// Occurrence log CSV
        #[arg(long)]
        input: PathBuf,
        /// Optional neighborhood coordinates CSV (`bairro,cidade,latitude,longitude`)
        #[arg(long)]
        neighborhoods: Option<PathBuf>,
        /// Optional TOML file with sampler and trainer settings
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write the bundle
        #[arg(long, default_value = crime_risk_server::DEFAULT_BUNDLE_PATH)]
        output: PathBuf,
    },
    /// Compute exploratory aggregates over an occurrence CSV
    Analyze {
        /// Occurrence log CSV
        #[arg(long)]
        input: PathBuf,
        /// Comma-separated crime types to break down (e.g., "Furto,Estupro")
        #[arg(long)]
        focus: Option<String>,
        /// Number of neighborhoods to rank
        #[arg(long, default_value_t = DEFAULT_TOP_NEIGHBORHOODS)]
        top: usize,
        /// Write the JSON report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Start the prediction server (configured through the environment)
    Serve,
}

/// Top-level tool selection for interactive mode.
enum Tool {
    Train,
    Analyze,
    Serve,
}

impl Tool {
    const ALL: &[Self] = &[Self::Train, Self::Analyze, Self::Serve];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Train => "Train model",
            Self::Analyze => "Analyze occurrences",
            Self::Serve => "Start server",
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_risk_cli_utils::init_logger();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        return interactive(&multi).await;
    };

    match command {
        Commands::Train {
            input,
            neighborhoods,
            config,
            output,
        } => {
            train::run(
                train::TrainArgs {
                    input,
                    neighborhoods,
                    config,
                    output,
                },
                &multi,
            )
            .await?;
        }
        Commands::Analyze {
            input,
            focus,
            top,
            output,
        } => {
            analyze::run(
                analyze::AnalyzeArgs {
                    input,
                    focus: focus.as_deref().map(analyze::parse_focus),
                    top,
                    output,
                },
                &multi,
            )
            .await?;
        }
        Commands::Serve => serve(false).await?,
    }

    Ok(())
}

async fn interactive(
    multi: &crime_risk_cli_utils::MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Crime Risk Toolchain");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::Train => train::interactive(multi).await?,
        Tool::Analyze => analyze::interactive(multi).await?,
        Tool::Serve => serve(true).await?,
    }

    Ok(())
}

async fn serve(prompt: bool) -> Result<(), Box<dyn std::error::Error>> {
    // The server uses actix-web's runtime, so we need to run it
    // in a blocking task to avoid nesting tokio runtimes.
    tokio::task::spawn_blocking(move || {
        let system = actix_web::rt::System::new();
        if prompt {
            system.block_on(crime_risk_server::interactive::run())
        } else {
            system.block_on(crime_risk_server::run_server())
        }
    })
    .await??;
    Ok(())
}
