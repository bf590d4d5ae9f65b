use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use pr_stats::config::{AppConfig, LogFormat, RepoId};
use pr_stats::generator::{GenerateOptions, PrFilter};
use pr_stats::{OutputFormat, RunOptions};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Generate pull request timing statistics for a GitHub repository
#[derive(Parser)]
#[command(name = "pr-stats", version)]
#[command(long_about = r#"pr-stats - Generate pull request timing statistics

Fetches every pull request of a repository together with its reviews and
timeline, and writes ready-for-review, first-approval and first-review
timestamps to a JSON file that is updated after each pull request.

ENVIRONMENT:
    GITHUB_TOKEN     personal access token (overridden by --token)
    GITHUB_API_URL   API base, defaults to https://api.github.com
    LOG_FORMAT       pretty (default) or json
    RUST_LOG         log filter, defaults to pr_stats=info"#)]
struct Args {
    /// Repository in owner/name form
    #[arg(short, long)]
    repo: RepoId,

    /// GitHub personal access token
    #[arg(short, long)]
    token: Option<String>,

    /// Output JSON file
    #[arg(short, long, default_value = "pr_stats.json")]
    output: PathBuf,

    /// Output format; csv also writes a summary next to the JSON file
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Only PRs created on or after this date (YYYY-MM-DD)
    #[arg(long = "from", value_name = "DATE", value_parser = parse_start_of_day)]
    date_from: Option<DateTime<Utc>>,

    /// Only PRs created on or before this date (YYYY-MM-DD)
    #[arg(long = "to", value_name = "DATE", value_parser = parse_end_of_day)]
    date_to: Option<DateTime<Utc>>,

    /// Only PRs opened by this login
    #[arg(long)]
    author: Option<String>,

    /// Also fetch comments and commits for each PR
    #[arg(long)]
    include_activity: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn parse_start_of_day(s: &str) -> Result<DateTime<Utc>, String> {
    let date = parse_date(s)?;
    date.and_hms_opt(0, 0, 0)
        .map(|t| t.and_utc())
        .ok_or_else(|| format!("invalid date {s}"))
}

fn parse_end_of_day(s: &str) -> Result<DateTime<Utc>, String> {
    let date = parse_date(s)?;
    date.and_hms_opt(23, 59, 59)
        .map(|t| t.and_utc())
        .ok_or_else(|| format!("invalid date {s}"))
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "pr_stats=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    if args.token.is_some() {
        config.github_token = args.token.clone();
    }
    if config.github_token.is_none() {
        tracing::warn!("No GitHub token configured, requests are unauthenticated");
    }

    if let Err(e) = run(&config, args).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(config: &AppConfig, args: Args) -> Result<()> {
    let options = RunOptions {
        repo: args.repo,
        output: args.output,
        format: args.format,
        generate: GenerateOptions {
            filter: PrFilter {
                created_from: args.date_from,
                created_to: args.date_to,
                author: args.author,
            },
            include_activity: args.include_activity,
        },
    };

    let report = pr_stats::run(config, &options)
        .await
        .with_context(|| format!("generating stats for {}", options.repo))?;

    tracing::info!(
        "Generated statistics for {} pull requests ({} skipped)",
        report.processed,
        report.failed.len()
    );
    Ok(())
}
