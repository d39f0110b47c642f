use std::time::Duration;

use serde_json::{Value, json};
use tracing::debug;

use fabricctl_core::{Error, Result};

/// HTTP verbs the orchestration API is consumed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Patch,
}

impl From<ApiMethod> for reqwest::Method {
    fn from(method: ApiMethod) -> Self {
        match method {
            ApiMethod::Get => reqwest::Method::GET,
            ApiMethod::Post => reqwest::Method::POST,
            ApiMethod::Put => reqwest::Method::PUT,
            ApiMethod::Patch => reqwest::Method::PATCH,
        }
    }
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the orchestration service REST API.
pub struct OrchClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl OrchClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Client with a previously obtained session token.
    pub fn with_token(base_url: &str, token: impl Into<String>) -> Self {
        let mut client = Self::new(base_url);
        client.token = Some(token.into());
        client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn api_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/{}",
            self.base_url,
            path.trim_start_matches('/')
        )
    }

    /// Authenticates against the service and stores the session token for all
    /// subsequent requests.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        let body = json!({ "username": username, "password": password });
        let response = self
            .execute(ApiMethod::Post, "auth/login", Some(&body), &[])
            .await?;
        let token = response
            .get("token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::transport("Login response did not contain a token"))?;
        self.token = Some(token.to_string());
        Ok(())
    }

    /// General request entry point. `path` is relative to the versioned API
    /// root; the body, when given, is sent as JSON.
    pub async fn request(
        &self,
        method: ApiMethod,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        self.execute(method, path, body, query).await
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.execute(ApiMethod::Get, path, None, &[]).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        self.execute(ApiMethod::Get, path, None, query).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.execute(ApiMethod::Post, path, Some(body), &[]).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.execute(ApiMethod::Put, path, Some(body), &[]).await
    }

    pub async fn patch(&self, path: &str, body: &Value) -> Result<Value> {
        self.execute(ApiMethod::Patch, path, Some(body), &[]).await
    }

    async fn execute(
        &self,
        method: ApiMethod,
        path: &str,
        body: Option<&Value>,
        query: &[(&str, &str)],
    ) -> Result<Value> {
        let url = self.api_url(path);
        debug!(method = ?method, %url, "orchestrator request");

        let mut request = self.http.request(method.into(), &url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(format!("Failed to reach {url}: {e}")))?;
        handle_response(response).await
    }
}

/// Parses and validates a service base URL before a client is built from it.
/// Only http and https schemes are accepted.
pub fn validate_base_url(input: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(input)
        .map_err(|e| Error::invalid_input(format!("Invalid server URL '{input}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::invalid_input(format!(
            "Unsupported URL scheme '{other}' in '{input}'"
        ))),
    }
}

async fn handle_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::transport(format!("Failed to read response body: {e}")))?;

    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("error"))
                    .and_then(|m| m.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.clone());
        return Err(Error::api(status.as_u16(), message));
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&body)?)
}
