// src/client/http.rs
// =============================================================================
// Authenticated page fetching.
//
// Every request the walker makes goes through the PageSource trait. The
// production implementation, BrmClient, wraps one reqwest::Client and adds:
// - HTTP basic auth with username + API token on every request
// - No TLS certificate verification (operators point this at internal
//   servers with self-signed certificates)
// - Easing (jittered pause / shared spacing) before every request
// - A per-request timeout
// - Retries with exponential backoff for timeouts, connection errors and 5xx
//
// Tests swap in an in-memory PageSource instead of a network server.
// =============================================================================

use crate::client::easing::Easing;
use crate::config::{RetryPolicy, WalkerConfig};
use crate::error::{Result, WalkError};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

/// A successfully fetched resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Parsed body when the server declared a JSON content type
    pub json: Option<Value>,
}

impl Page {
    pub fn new(url: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status,
            body: body.into(),
            json: None,
        }
    }

    // Returns the JSON body, parsing the raw text if the server didn't
    // label it as JSON
    pub fn json_value(&self) -> Result<Value> {
        match &self.json {
            Some(value) => Ok(value.clone()),
            None => Ok(serde_json::from_str(&self.body)?),
        }
    }
}

/// Anything that can GET a URL for the walker.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches `url` with optional query parameters.
    ///
    /// Non-2xx answers are returned as `WalkError::HttpStatus`.
    async fn fetch(&self, url: &str, params: &[(&str, &str)]) -> Result<Page>;
}

/// The repository manager client used outside of tests.
#[derive(Debug)]
pub struct BrmClient {
    http: Client,
    username: String,
    api_token: String,
    easing: Easing,
    retry: RetryPolicy,
}

impl BrmClient {
    // Builds the client from a validated configuration
    //
    // Fails with WalkError::Configuration when the username or API token is
    // missing; no other authentication scheme is supported.
    pub fn new(config: &WalkerConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| WalkError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            username: config.username.clone(),
            api_token: config.api_token.clone(),
            easing: Easing::new(config.max_wait, config.min_interval),
            retry: config.retry.clone(),
        })
    }

    // One attempt: pause, send, check status, read body
    async fn fetch_once(&self, url: &str, params: &[(&str, &str)]) -> Result<Page> {
        self.easing.pause().await;
        debug!(url, "GET");

        let mut request = self
            .http
            .get(url)
            .basic_auth(&self.username, Some(&self.api_token));
        if !params.is_empty() {
            request = request.query(params);
        }

        let response = request
            .send()
            .await
            .map_err(|e| categorize_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WalkError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);

        let body = response
            .text()
            .await
            .map_err(|e| categorize_error(url, e))?;

        let mut page = Page::new(url, status.as_u16(), body);
        if is_json {
            page.json = serde_json::from_str(&page.body).ok();
        }
        Ok(page)
    }
}

#[async_trait]
impl PageSource for BrmClient {
    async fn fetch(&self, url: &str, params: &[(&str, &str)]) -> Result<Page> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(url, params).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(url, attempt = attempt + 1, ?delay, error = %e, "Retrying request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// Maps reqwest failures onto our error taxonomy
//
// Timeouts get their own variant; everything else below HTTP (DNS,
// refused connections, TLS, truncated bodies) is a transport error.
fn categorize_error(url: &str, error: reqwest::Error) -> WalkError {
    if error.is_timeout() {
        return WalkError::Timeout {
            url: url.to_string(),
        };
    }

    let message = if error.is_connect() {
        format!("Connection failed: {}", error)
    } else if error.is_body() || error.is_decode() {
        format!("Failed to read body: {}", error)
    } else {
        error.to_string()
    };

    WalkError::Transport {
        url: url.to_string(),
        message,
    }
}
