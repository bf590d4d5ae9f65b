//! Records written to the output document.

use crate::config::RepoId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifying fields of a pull request, captured when it was listed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PullRequestMeta {
    pub number: u64,
    pub title: String,
    pub author: Option<String>,
    #[serde(default)]
    pub draft: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

/// Verdict of a single review submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    #[serde(alias = "REQUEST_CHANGES")]
    ChangesRequested,
    #[serde(alias = "COMMENT")]
    Commented,
    #[default]
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub state: ReviewState,
    /// When the review was submitted.
    pub created_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Event kind as reported by the API, e.g. `labeled` or `ready_for_review`.
    pub event: Option<String>,
    pub author: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentKind {
    /// Inline comment on the diff.
    ReviewComment,
    /// Comment on the conversation tab.
    IssueComment,
    /// Body of a submitted review.
    ReviewSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: CommentKind,
    pub author: String,
    pub comment_id: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentSummary {
    pub total_comments: usize,
    pub comments: Vec<Comment>,
}

/// Derived timing metrics for one pull request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PullRequestStats {
    pub pr_meta: PullRequestMeta,
    /// When the PR became ready for review.
    #[serde(rename = "request_to_review_timestamp")]
    pub ready_for_review_at: Option<DateTime<Utc>>,
    #[serde(rename = "pr_approved_timestamp")]
    pub first_approval_at: Option<DateTime<Utc>>,
    /// First review carrying a verdict other than a bare approval.
    #[serde(rename = "review_given_timestamp")]
    pub first_review_at: Option<DateTime<Utc>>,
    pub reviews: Vec<ReviewEvent>,
    pub timeline: Vec<TimelineEvent>,
    /// Only collected with `--include-activity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<CommentSummary>,
    /// Commit dates of non-merge commits. Only collected with `--include-activity`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_timestamps: Option<Vec<DateTime<Utc>>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    pub owner: String,
    pub url: String,
}

impl From<&RepoId> for RepositoryInfo {
    fn from(repo_id: &RepoId) -> Self {
        Self {
            name: repo_id.repo.clone(),
            owner: repo_id.owner.clone(),
            url: repo_id.html_url(),
        }
    }
}

/// The whole output document of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRunResult {
    pub repository: RepositoryInfo,
    pub generated_at: DateTime<Utc>,
    pub pull_requests: Vec<PullRequestStats>,
}

impl RepositoryRunResult {
    pub fn new(repository: RepositoryInfo, generated_at: DateTime<Utc>) -> Self {
        Self {
            repository,
            generated_at,
            pull_requests: Vec::new(),
        }
    }
}
