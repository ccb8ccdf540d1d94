//! `analyze` subcommand: occurrence CSV in, JSON report out.

use std::io::Write;
use std::path::PathBuf;

use crime_risk_analytics_models::{AnalysisParams, DEFAULT_FOCUS_TYPES, DEFAULT_TOP_NEIGHBORHOODS};
use crime_risk_cli_utils::{IndicatifProgress, MultiProgress, prompt_optional_path, prompt_path};
use dialoguer::Input;

/// Inputs of an analysis run.
pub struct AnalyzeArgs {
    pub input: PathBuf,
    /// Focus crime types; `None` keeps the defaults.
    pub focus: Option<Vec<String>>,
    pub top: usize,
    /// `None` prints to stdout.
    pub output: Option<PathBuf>,
}

/// Splits a comma-separated list, dropping blank entries.
#[must_use]
pub fn parse_focus(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Analyzes the CSV and writes the report as pretty JSON.
///
/// # Errors
///
/// * If the CSV cannot be read
/// * If the report cannot be written
pub async fn run(
    args: AnalyzeArgs,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut params = AnalysisParams {
        top_neighborhoods: args.top,
        ..AnalysisParams::default()
    };
    if let Some(focus) = args.focus {
        params.focus_types = focus;
    }

    let progress = IndicatifProgress::records_bar(multi, "Analyzing");
    let input = args.input.clone();
    let report = tokio::task::spawn_blocking(move || {
        crime_risk_analytics::analyze_file(&input, &params, &progress)
    })
    .await??;

    let json = serde_json::to_string_pretty(&report)?;
    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, json)?;
            log::info!("Wrote analysis report to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        }
    }
    Ok(())
}

/// Prompts for the analysis inputs, then runs [`run`].
///
/// # Errors
///
/// * If a prompt fails
/// * If the analysis fails
pub async fn interactive(multi: &MultiProgress) -> Result<(), Box<dyn std::error::Error>> {
    let input = prompt_path("Occurrence CSV", "data/ocorrencias.csv")?;

    let focus: String = Input::new()
        .with_prompt("Focus crime types (comma-separated)")
        .default(DEFAULT_FOCUS_TYPES.join(","))
        .interact_text()?;

    let top: usize = Input::new()
        .with_prompt("Neighborhoods to rank")
        .default(DEFAULT_TOP_NEIGHBORHOODS)
        .interact_text()?;

    let output = prompt_optional_path("Report output JSON")?;

    run(
        AnalyzeArgs {
            input,
            focus: Some(parse_focus(&focus)),
            top,
            output,
        },
        multi,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_list_is_trimmed() {
        assert_eq!(
            parse_focus(" Furto, Estupro ,,Violência doméstica"),
            ["Furto", "Estupro", "Violência doméstica"]
        );
    }

    #[test]
    fn empty_focus_list_is_empty() {
        assert!(parse_focus(" , ").is_empty());
    }
}
