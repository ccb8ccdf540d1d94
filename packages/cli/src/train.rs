//! `train` subcommand: occurrence CSV in, artifact bundle out.

use std::path::PathBuf;
use std::time::Instant;

use crime_risk_cli_utils::{IndicatifProgress, MultiProgress, prompt_optional_path, prompt_path};
use crime_risk_training::PipelineConfig;
use crime_risk_training::pipeline::PipelineOutcome;
use dialoguer::Confirm;

/// Inputs of a training run.
pub struct TrainArgs {
    pub input: PathBuf,
    pub neighborhoods: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub output: PathBuf,
}

/// Runs the offline pipeline and saves the bundle.
///
/// # Errors
///
/// * If the config or either CSV cannot be read
/// * If the data cannot support training
/// * If the bundle cannot be written
pub async fn run(args: TrainArgs, multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };

    let start = Instant::now();
    let progress = IndicatifProgress::records_bar(multi, "Training");

    let input = args.input.clone();
    let neighborhoods = args.neighborhoods.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        crime_risk_training::pipeline::run(&input, neighborhoods.as_deref(), &config, &progress)
    })
    .await??;

    outcome.bundle.save(&args.output)?;

    print_summary(&outcome);
    println!("Done in {:.1}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn print_summary(outcome: &PipelineOutcome) {
    let ingestion = &outcome.ingestion;
    let sampling = &outcome.sampling;
    println!();
    println!(
        "Rows: {} read, {} skipped, {} unparseable, {} used",
        ingestion.read, ingestion.skipped, ingestion.unparseable, ingestion.contexts
    );
    println!(
        "Examples: {} positives, {} negatives ({} collisions discarded)",
        sampling.positives, sampling.negatives, sampling.collisions
    );
    if let Some(report) = &outcome.bundle.report {
        println!(
            "Split: {} train / {} test, scale_pos_weight {:.3}",
            report.train_size, report.test_size, report.scale_pos_weight
        );
        println!("Test: {report}");
    }
    println!("Fingerprint: {}", outcome.bundle.fingerprint);
}

/// Prompts for the training inputs, then runs [`run`].
///
/// # Errors
///
/// * If a prompt fails
/// * If the training run fails
pub async fn interactive(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let input = prompt_path("Occurrence CSV", "data/ocorrencias.csv")?;
    let neighborhoods = prompt_optional_path("Neighborhood coordinates CSV")?;
    let config = prompt_optional_path("Training config TOML")?;
    let output = prompt_path("Bundle output", crime_risk_server::DEFAULT_BUNDLE_PATH)?;

    if !Confirm::new()
        .with_prompt(format!("Train from {}?", input.display()))
        .default(true)
        .interact()?
    {
        println!("Cancelled.");
        return Ok(());
    }

    run(
        TrainArgs {
            input,
            neighborhoods,
            config,
            output,
        },
        multi,
    )
    .await
}
