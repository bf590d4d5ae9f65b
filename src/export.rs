//! CSV summary of a finished run, one row per pull request.

use crate::types::{PullRequestStats, RepositoryRunResult};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const CSV_HEADER: [&str; 11] = [
    "pr_number",
    "title",
    "author",
    "created_at",
    "request_to_review_timestamp",
    "pr_approved_timestamp",
    "review_given_timestamp",
    "pr_merge_timestamp",
    "is_closed",
    "total_comments",
    "total_updates",
];

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|t| t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

fn row(stats: &PullRequestStats) -> [String; 11] {
    let meta = &stats.pr_meta;
    [
        meta.number.to_string(),
        meta.title.clone(),
        meta.author.clone().unwrap_or_default(),
        timestamp(meta.created_at),
        timestamp(stats.ready_for_review_at),
        timestamp(stats.first_approval_at),
        timestamp(stats.first_review_at),
        timestamp(meta.merged_at),
        meta.closed_at.is_some().to_string(),
        stats
            .comments
            .as_ref()
            .map(|c| c.total_comments.to_string())
            .unwrap_or_default(),
        stats
            .update_timestamps
            .as_ref()
            .map(|u| u.len().to_string())
            .unwrap_or_default(),
    ]
}

pub fn write_csv<W: Write>(result: &RepositoryRunResult, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADER)?;
    for stats in &result.pull_requests {
        writer.write_record(row(stats))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_csv(result: &RepositoryRunResult, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_csv(result, file)?;
    tracing::info!(path = %path.display(), "Exported CSV");
    Ok(())
}
