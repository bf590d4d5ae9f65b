//! Thin GitHub REST client: authenticated GETs, page-number pagination and
//! the rate-limit sleep.
//!
//! The wire call itself sits behind [`Transport`] so the retry and paging
//! rules can be exercised against scripted responses.

use crate::config::{AppConfig, RepoId};
use crate::types::ReviewState;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use http::header::{HeaderMap, HeaderValue, ACCEPT};
use http::StatusCode;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

pub const PAGE_SIZE: usize = 100;
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
pub const TIMELINE_ACCEPT: &str = "application/vnd.github.mockingbird-preview+json";

/// Minimum pause after a rate-limit response, also added on top of the reset time.
const RATE_LIMIT_GRACE_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GitHub API returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A single GET against the API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    /// Overrides the default media type for endpoints that need a preview header.
    pub accept: Option<&'static str>,
}

impl ApiRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            accept: None,
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.set_param(key, value.to_string());
        self
    }

    fn set_param(&mut self, key: &str, value: String) {
        match self.query.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.query.push((key.to_string(), value)),
        }
    }

    /// Value of a query parameter, if set.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Full URI including the encoded query string.
    pub fn uri(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, query)
    }
}

#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Performs exactly one HTTP round trip. Implementations must neither retry
/// nor interpret status codes.
pub trait Transport {
    fn get(&self, request: &ApiRequest) -> impl Future<Output = Result<ApiResponse>> + Send;
}

/// Production transport backed by an authenticated Octocrab instance.
///
/// Octocrab's own retry layer is switched off: every call is exactly one GET,
/// and the only retry is the rate-limit sleep in [`GitHubClient`].
pub struct OctocrabTransport {
    octocrab: Octocrab,
}

impl OctocrabTransport {
    pub fn new(token: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder().add_retry_config(RetryConfig::None);
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }

        Ok(Self {
            octocrab: builder.build()?,
        })
    }
}

impl Transport for OctocrabTransport {
    async fn get(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let mut headers = HeaderMap::new();
        if let Some(accept) = request.accept {
            headers.insert(ACCEPT, HeaderValue::from_static(accept));
        }

        let response = self
            .octocrab
            ._get_with_headers(request.uri(), Some(headers))
            .await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = self.octocrab.body_to_string(response).await?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

/// Pull request listing filter understood by the `state` query parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullState {
    Open,
    Closed,
    All,
}

impl PullState {
    pub fn as_str(self) -> &'static str {
        match self {
            PullState::Open => "open",
            PullState::Closed => "closed",
            PullState::All => "all",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUser {
    pub login: String,
}

/// Author block of a git commit, as embedded in commits and `committed` timeline events.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGitActor {
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    pub user: Option<RawUser>,
    pub draft: Option<bool>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
}

impl RawPullRequest {
    pub fn is_draft(&self) -> bool {
        self.draft.unwrap_or(false)
    }

    pub fn author_login(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawReview {
    #[serde(default)]
    pub id: u64,
    pub user: Option<RawUser>,
    pub body: Option<String>,
    #[serde(default)]
    pub state: ReviewState,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl RawReview {
    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTimelineEvent {
    pub event: Option<String>,
    pub actor: Option<RawUser>,
    pub author: Option<RawGitActor>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Issue comment or inline review comment.
#[derive(Debug, Clone, Deserialize)]
pub struct RawComment {
    pub id: u64,
    pub user: Option<RawUser>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommitRef {
    pub sha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommitDetail {
    pub author: Option<RawGitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCommit {
    #[serde(default)]
    pub parents: Vec<RawCommitRef>,
    pub commit: RawCommitDetail,
}

/// Seconds to wait after a rate-limit response whose reset header reads `reset`.
pub fn rate_limit_delay(reset: i64, now: i64) -> Duration {
    let secs = reset
        .saturating_sub(now)
        .saturating_add(RATE_LIMIT_GRACE_SECS)
        .max(RATE_LIMIT_GRACE_SECS);
    Duration::from_secs(secs as u64)
}

fn reset_header(headers: &HeaderMap) -> i64 {
    headers
        .get(RATE_LIMIT_RESET_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

pub struct GitHubClient<T> {
    transport: T,
    base_url: String,
}

impl GitHubClient<OctocrabTransport> {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transport = OctocrabTransport::new(config.github_token.clone())?;
        Ok(Self::new(transport, config.api_base()))
    }
}

impl<T: Transport> GitHubClient<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Issues one GET, sleeping through rate limits.
    ///
    /// A 404 yields `Value::Null` so list endpoints read as empty. Any other
    /// non-success status fails with [`ApiError::Status`].
    pub async fn fetch(&self, url: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut request = ApiRequest::new(url);
        for (key, value) in params {
            request.set_param(key, value.to_string());
        }
        self.send(&request).await
    }

    async fn send(&self, request: &ApiRequest) -> Result<Value> {
        loop {
            tracing::debug!(url = %request.uri(), "GET");
            let response = self.transport.get(request).await?;

            if response.status.is_success() {
                if response.body.trim().is_empty() {
                    return Ok(Value::Null);
                }
                let value: Value =
                    serde_json::from_str(&response.body).map_err(|source| ApiError::Decode {
                        url: request.url.clone(),
                        source,
                    })?;
                return Ok(value);
            }

            match response.status {
                StatusCode::FORBIDDEN => {
                    let reset = reset_header(&response.headers);
                    let delay = rate_limit_delay(reset, Utc::now().timestamp());
                    tracing::warn!(
                        url = %request.url,
                        sleep_secs = delay.as_secs(),
                        "Rate limited, sleeping before retry"
                    );
                    tokio::time::sleep(delay).await;
                }
                StatusCode::NOT_FOUND => {
                    tracing::error!(url = %request.url, "Resource not found");
                    return Ok(Value::Null);
                }
                status => {
                    return Err(ApiError::Status {
                        status,
                        url: request.url.clone(),
                    }
                    .into());
                }
            }
        }
    }

    /// Walks `page=1,2,..` with `per_page=100` until a short or non-list page.
    pub async fn paginate(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<Value>> {
        let mut request = ApiRequest::new(url);
        for (key, value) in params {
            request.set_param(key, value.to_string());
        }
        self.paginate_request(request).await
    }

    async fn paginate_request(&self, mut request: ApiRequest) -> Result<Vec<Value>> {
        let mut results = Vec::new();
        let mut page = 1u32;

        loop {
            request.set_param("page", page.to_string());
            request.set_param("per_page", PAGE_SIZE.to_string());

            let items = match self.send(&request).await? {
                Value::Array(items) => items,
                _ => break,
            };
            let count = items.len();
            results.extend(items);

            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(results)
    }

    async fn list<D: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<D>> {
        let url = request.url.clone();
        let items = self.paginate_request(request).await?;
        let parsed = serde_json::from_value(Value::Array(items))
            .map_err(|source| ApiError::Decode { url, source })?;
        Ok(parsed)
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.base_url, repo.owner, repo.repo, path)
    }

    pub async fn list_pull_requests(
        &self,
        repo: &RepoId,
        state: PullState,
    ) -> Result<Vec<RawPullRequest>> {
        let request = ApiRequest::new(self.repo_url(repo, "pulls")).param("state", state.as_str());
        self.list(request)
            .await
            .with_context(|| format!("listing pull requests of {repo}"))
    }

    pub async fn list_reviews(&self, repo: &RepoId, number: u64) -> Result<Vec<RawReview>> {
        self.list(ApiRequest::new(
            self.repo_url(repo, &format!("pulls/{number}/reviews")),
        ))
        .await
    }

    /// Timeline events of the PR's issue thread.
    ///
    /// Requires the mockingbird preview media type. Paginated like the other
    /// listings, so threads with more than a hundred events come back whole.
    pub async fn list_timeline(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<RawTimelineEvent>> {
        let mut request =
            ApiRequest::new(self.repo_url(repo, &format!("issues/{number}/timeline")));
        request.accept = Some(TIMELINE_ACCEPT);
        self.list(request).await
    }

    pub async fn list_issue_comments(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<RawComment>> {
        self.list(ApiRequest::new(
            self.repo_url(repo, &format!("issues/{number}/comments")),
        ))
        .await
    }

    /// Inline comments attached to the diff.
    pub async fn list_review_comments(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<RawComment>> {
        self.list(ApiRequest::new(
            self.repo_url(repo, &format!("pulls/{number}/comments")),
        ))
        .await
    }

    pub async fn list_commits(&self, repo: &RepoId, number: u64) -> Result<Vec<RawCommit>> {
        self.list(ApiRequest::new(
            self.repo_url(repo, &format!("pulls/{number}/commits")),
        ))
        .await
    }
}
