//! Drives a run: lists a repository's pull requests, derives metrics for each
//! and streams the records into a [`StatsSink`].
//!
//! Processing is strictly sequential. A failure while handling one pull
//! request is logged and that PR is skipped; only failures outside the
//! per-PR loop abort the run.

use crate::config::RepoId;
use crate::github::{GitHubClient, PullState, RawPullRequest, Transport};
use crate::metrics;
use crate::sink::StatsSink;
use crate::types::{PullRequestStats, RepositoryInfo};
use anyhow::Result;
use chrono::{DateTime, Utc};

const TITLE_LOG_CHARS: usize = 50;

/// Narrows the listed pull requests before processing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrFilter {
    /// Keep PRs created at or after this instant.
    pub created_from: Option<DateTime<Utc>>,
    /// Keep PRs created at or before this instant.
    pub created_to: Option<DateTime<Utc>>,
    /// Keep PRs opened by this login.
    pub author: Option<String>,
}

impl PrFilter {
    pub fn is_empty(&self) -> bool {
        self.created_from.is_none() && self.created_to.is_none() && self.author.is_none()
    }

    pub fn matches(&self, pr: &RawPullRequest) -> bool {
        if let Some(from) = self.created_from {
            if !pr.created_at.is_some_and(|created| created >= from) {
                return false;
            }
        }
        if let Some(to) = self.created_to {
            if !pr.created_at.is_some_and(|created| created <= to) {
                return false;
            }
        }
        match &self.author {
            Some(author) => pr.author_login() == Some(author.as_str()),
            None => true,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct GenerateOptions {
    pub filter: PrFilter,
    /// Also fetch comments and commits for every PR.
    pub include_activity: bool,
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunReport {
    pub repository: RepoId,
    /// Pull requests left after filtering.
    pub total: usize,
    pub processed: usize,
    /// Numbers of the pull requests that were skipped after an error.
    pub failed: Vec<u64>,
}

pub struct StatsGenerator<'a, T> {
    client: &'a GitHubClient<T>,
    options: GenerateOptions,
}

impl<'a, T: Transport> StatsGenerator<'a, T> {
    pub fn new(client: &'a GitHubClient<T>) -> Self {
        Self {
            client,
            options: GenerateOptions::default(),
        }
    }

    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the record for a single pull request.
    pub async fn generate_pr_stats(
        &self,
        repo: &RepoId,
        pr: &RawPullRequest,
    ) -> Result<PullRequestStats> {
        let title: String = pr.title.chars().take(TITLE_LOG_CHARS).collect();
        tracing::info!(pr = pr.number, %title, "Processing PR");

        let raw_reviews = self.client.list_reviews(repo, pr.number).await?;
        let raw_timeline = self.client.list_timeline(repo, pr.number).await?;

        let (comments, update_timestamps) = if self.options.include_activity {
            let review_comments = self.client.list_review_comments(repo, pr.number).await?;
            let issue_comments = self.client.list_issue_comments(repo, pr.number).await?;
            let commits = self.client.list_commits(repo, pr.number).await?;
            (
                Some(metrics::collect_comments(
                    pr.author_login(),
                    &raw_reviews,
                    &review_comments,
                    &issue_comments,
                )),
                Some(metrics::update_timestamps(&commits)),
            )
        } else {
            (None, None)
        };

        Ok(PullRequestStats {
            pr_meta: metrics::project_pull_request(pr),
            ready_for_review_at: metrics::ready_for_review_at(pr, &raw_timeline),
            first_approval_at: metrics::first_approval_at(&raw_reviews),
            first_review_at: metrics::first_review_at(&raw_reviews),
            reviews: raw_reviews.iter().map(metrics::project_review).collect(),
            timeline: raw_timeline
                .iter()
                .map(metrics::project_timeline_event)
                .collect(),
            comments,
            update_timestamps,
        })
    }

    /// Processes every pull request of `repo` in API order, appending each
    /// record to `sink` as soon as it is built.
    pub async fn generate_stats<S: StatsSink>(
        &self,
        repo: &RepoId,
        sink: &mut S,
    ) -> Result<RunReport> {
        tracing::info!(repo = %repo, "Generating stats");

        let mut prs = self.client.list_pull_requests(repo, PullState::All).await?;
        tracing::info!(count = prs.len(), "Found pull requests");

        if !self.options.filter.is_empty() {
            prs.retain(|pr| self.options.filter.matches(pr));
        }
        tracing::info!(count = prs.len(), "Processing pull requests after filtering");

        sink.begin(RepositoryInfo::from(repo), Utc::now())?;

        let mut report = RunReport {
            repository: repo.clone(),
            total: prs.len(),
            processed: 0,
            failed: Vec::new(),
        };

        for pr in &prs {
            let outcome = match self.generate_pr_stats(repo, pr).await {
                Ok(stats) => sink.append(stats),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.processed += 1,
                Err(e) => {
                    tracing::error!(pr = pr.number, "Error processing PR: {:#}", e);
                    report.failed.push(pr.number);
                }
            }
        }

        tracing::info!(
            repo = %repo,
            processed = report.processed,
            failed = report.failed.len(),
            "Finished generating stats"
        );

        Ok(report)
    }
}
