//! HTTP binding of the persistence boundary.
//!
//! Thin reqwest client for the clarify write operations. Errors are
//! normalized to the human-readable messages the UI shows: a message from
//! the backend body wins, then a per-status fallback, and a transport-level
//! failure becomes a "no response" message.

use std::time::Duration;

use anyhow::Context;
use gtd_clarify_sdk::{
    async_trait, ActionPayload, ActionRecord, ApiResult, ClarifyApi, ProjectPayload, ProjectRecord,
};
use reqwest::{Method, RequestBuilder, StatusCode};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Normalized API failure: optional HTTP status plus a display message.
#[derive(Debug)]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    fn network() -> Self {
        Self {
            status: None,
            message: "No response from server. Check your connection.".to_string(),
        }
    }

    fn from_status(status: StatusCode, backend_message: Option<String>) -> Self {
        // A message from the backend body has priority over the fallbacks.
        if let Some(message) = backend_message {
            return Self {
                status: Some(status.as_u16()),
                message,
            };
        }
        let message = match status.as_u16() {
            400 => "Invalid request (400).".to_string(),
            401 => "Unauthorized (401). Please log in.".to_string(),
            403 => "Forbidden (403). You don't have permission.".to_string(),
            404 => "Resource not found (404).".to_string(),
            409 => "Conflict (409). Resource already exists.".to_string(),
            422 => "Unprocessable entity (422). Invalid input.".to_string(),
            code => format!("Server error ({}).", code),
        };
        Self {
            status: Some(status.as_u16()),
            message,
        }
    }
}

/// REST client for the clarify endpoints under `/v1`.
pub struct HttpApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http,
        })
    }

    /// Attach a bearer token to every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Send a request and normalize any failure into an [`ApiError`].
    async fn execute(&self, builder: RequestBuilder) -> Result<reqwest::Response, ApiError> {
        let response = builder.send().await.map_err(|_| ApiError::network())?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let backend_message = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("error"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            });
        Err(ApiError::from_status(status, backend_message))
    }

    async fn post_empty(&self, path: &str) -> ApiResult<()> {
        self.execute(self.request(Method::POST, path)).await?;
        Ok(())
    }
}

#[async_trait]
impl ClarifyApi for HttpApiClient {
    async fn file_as_reference(&self, item_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/v1/stuff/{}/clarify/reference", item_id))
            .await
    }

    async fn move_to_someday(&self, item_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/v1/stuff/{}/clarify/someday", item_id))
            .await
    }

    async fn move_to_trash(&self, item_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/v1/stuff/{}/clarify/trash", item_id))
            .await
    }

    async fn create_action(
        &self,
        item_id: &str,
        payload: &ActionPayload,
    ) -> ApiResult<ActionRecord> {
        let response = self
            .execute(
                self.request(Method::POST, &format!("/v1/stuff/{}/clarify/action", item_id))
                    .json(payload),
            )
            .await?;
        let record = response.json::<ActionRecord>().await.map_err(|_| ApiError {
            status: None,
            message: "Unexpected response from server.".to_string(),
        })?;
        Ok(record)
    }

    async fn create_project(
        &self,
        item_id: &str,
        payload: &ProjectPayload,
    ) -> ApiResult<ProjectRecord> {
        let response = self
            .execute(
                self.request(
                    Method::POST,
                    &format!("/v1/stuff/{}/clarify/project", item_id),
                )
                .json(payload),
            )
            .await?;
        let record = response
            .json::<ProjectRecord>()
            .await
            .map_err(|_| ApiError {
                status: None,
                message: "Unexpected response from server.".to_string(),
            })?;
        Ok(record)
    }

    async fn complete_immediately(&self, item_id: &str) -> ApiResult<()> {
        self.post_empty(&format!("/v1/stuff/{}/complete", item_id))
            .await
    }

    async fn notify_stats_changed(&self) -> ApiResult<()> {
        // The server recomputes counts on read; refetching is the refresh.
        self.execute(self.request(Method::GET, "/v1/stats")).await?;
        Ok(())
    }
}
