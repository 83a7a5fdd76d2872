//! One outbound HTTP request, one classified outcome.
//!
//! The fetcher never retries: each call to [`Fetcher::fetch`] sends exactly
//! one request and maps the result onto [`FetchError`] so the caller can
//! tell a dead host from a failing server.

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::borrow::Cow;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::FetchError;

/// An outbound request. Built once through the consuming `with_*` methods,
/// then only read.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

/// A completed 2xx response. The body is kept exactly as received.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub struct Fetcher {
    client: Client,
}

impl FetchRequest {
    pub fn new(method: Method, url: &str) -> Result<Self, FetchError> {
        let parsed = Url::parse(url)
            .map_err(|e| FetchError::InvalidRequest(format!("malformed URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidRequest(format!(
                "unsupported URL scheme '{}' in {}",
                parsed.scheme(),
                url
            )));
        }

        Ok(Self {
            method,
            url: parsed,
            headers: HeaderMap::new(),
            body: None,
        })
    }

    pub fn get(url: &str) -> Result<Self, FetchError> {
        Self::new(Method::GET, url)
    }

    pub fn post_json<T: Serialize>(url: &str, payload: &T) -> Result<Self, FetchError> {
        let body = serde_json::to_vec(payload).map_err(|e| {
            FetchError::InvalidRequest(format!("failed to serialize request body: {}", e))
        })?;
        Ok(Self::new(Method::POST, url)?
            .with_header_value(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body))
    }

    pub fn with_header(self, name: &str, value: &str) -> Result<Self, FetchError> {
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("invalid header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value.trim()).map_err(|e| {
            FetchError::InvalidRequest(format!("invalid value for header {}: {}", name, e))
        })?;
        Ok(self.with_header_value(name, value))
    }

    fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

impl FetchResponse {
    /// Body as text, with invalid UTF-8 sequences replaced
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| FetchError::processing(format!("response is not the expected JSON: {}", e)))
    }
}

impl Fetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    /// Send `request` once and wait for the full body.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let url = request.url.as_str();
        tracing::debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        let headers = response.headers().clone();

        // The status line arrived, so a broken error body does not make this a transport failure
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "Failed to read error response body");
                    String::new()
                }
            };
            return Err(FetchError::response(url, status, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?
            .to_vec();

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            "Received response"
        );

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
