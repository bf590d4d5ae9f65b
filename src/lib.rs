pub mod config;
pub mod export;
pub mod generator;
pub mod github;
pub mod metrics;
pub mod sink;
pub mod types;

use anyhow::Result;
use config::{AppConfig, RepoId};
use generator::{GenerateOptions, RunReport, StatsGenerator};
use github::GitHubClient;
use sink::JsonFileSink;
use std::path::{Path, PathBuf};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Everything a single invocation needs beyond the environment config.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub repo: RepoId,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub generate: GenerateOptions,
}

/// Path of the CSV written next to the JSON output. Never equal to `output`.
pub fn csv_path(output: &Path) -> PathBuf {
    if output.extension().is_some_and(|ext| ext == "csv") {
        let mut name = output.as_os_str().to_os_string();
        name.push(".csv");
        return PathBuf::from(name);
    }
    output.with_extension("csv")
}

/// Runs one full collection against the live API.
///
/// The JSON file at `options.output` is always written since it is the
/// incremental checkpoint; CSV is rendered from it once the run finishes.
pub async fn run(config: &AppConfig, options: &RunOptions) -> Result<RunReport> {
    let client = GitHubClient::from_config(config)?;
    let generator = StatsGenerator::new(&client).with_options(options.generate.clone());

    let mut sink = JsonFileSink::new(&options.output);
    let report = generator.generate_stats(&options.repo, &mut sink).await?;
    tracing::info!(path = %options.output.display(), "Wrote JSON");

    if options.format == OutputFormat::Csv {
        if let Some(document) = sink.document() {
            export::export_csv(document, &csv_path(&options.output))?;
        }
    }

    Ok(report)
}
