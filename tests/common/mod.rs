#![allow(dead_code)]

use http::{HeaderMap, HeaderValue, StatusCode};
use pr_stats::config::RepoId;
use pr_stats::github::{ApiRequest, ApiResponse, GitHubClient, Transport, RATE_LIMIT_RESET_HEADER};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const BASE_URL: &str = "https://api.test";

pub fn repo() -> RepoId {
    RepoId::new("octo", "hello")
}

/// Absolute URL of a path under the test repository.
pub fn repo_url(path: &str) -> String {
    format!("{BASE_URL}/repos/octo/hello/{path}")
}

pub fn response(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: HeaderMap::new(),
        body: body.to_string(),
    }
}

pub fn ok(body: Value) -> ApiResponse {
    response(200, body)
}

pub fn rate_limited(reset: &str) -> ApiResponse {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from_str(reset).unwrap());
    ApiResponse {
        status: StatusCode::FORBIDDEN,
        headers,
        body: json!({"message": "API rate limit exceeded"}).to_string(),
    }
}

/// Replays queued responses keyed by URL and page number.
///
/// Requests with nothing queued get an empty JSON list.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

fn route_key(url: &str, page: Option<&str>) -> String {
    format!("{url}#{}", page.unwrap_or("-"))
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for a non-paginated request.
    pub fn on(&self, url: &str, response: ApiResponse) -> &Self {
        self.push(route_key(url, None), response)
    }

    /// Queues a response for one page of a paginated request.
    pub fn on_page(&self, url: &str, page: u32, response: ApiResponse) -> &Self {
        self.push(route_key(url, Some(&page.to_string())), response)
    }

    fn push(&self, key: String, response: ApiResponse) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == url)
            .collect()
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, request: &ApiRequest) -> anyhow::Result<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let key = route_key(&request.url, request.query_param("page"));
        let queued = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());
        Ok(queued.unwrap_or_else(|| ok(json!([]))))
    }
}

pub fn client(transport: ScriptedTransport) -> GitHubClient<ScriptedTransport> {
    GitHubClient::new(transport, BASE_URL)
}

pub fn pull_request(number: u64, author: &str, draft: bool, created_at: &str) -> Value {
    json!({
        "number": number,
        "title": format!("Change number {number}"),
        "user": {"login": author},
        "draft": draft,
        "created_at": created_at,
        "updated_at": created_at,
        "closed_at": null,
        "merged_at": null
    })
}

pub fn review(id: u64, login: &str, state: &str, submitted_at: &str, body: &str) -> Value {
    json!({
        "id": id,
        "user": {"login": login},
        "body": body,
        "state": state,
        "submitted_at": submitted_at
    })
}

/// `count` placeholder objects for pagination tests.
pub fn items(count: usize, offset: usize) -> Value {
    Value::Array((0..count).map(|i| json!({"id": offset + i})).collect())
}
