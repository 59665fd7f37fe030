//! Request layer.
//!
//! A thin typed wrapper over `reqwest`. Each call is exactly one round trip:
//! there is no retry here, the read cache decides that. Non-success
//! responses become [`AdminError`]s carrying the parsed body so
//! [`AdminError::message()`] can pick the most specific text.

use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ServerConfig;
use crate::telemetry;
use crate::{AdminError, ErrorBody, Result};

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080/api/";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-call options.
///
/// ```rust
/// # use docbox_admin::http::RequestConfig;
/// # use std::time::Duration;
/// let config = RequestConfig::new()
///     .query("offset", "0")
///     .timeout(Duration::from_secs(5));
/// assert_eq!(config.query_pairs().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query string parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Override the client timeout for this call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }
}

/// HTTP client bound to a base URL.
///
/// Cloning shares the connection pool and the cookie store, so a session
/// established through one clone is seen by all of them.
#[derive(Clone, Debug)]
pub struct HttpClient {
    http: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| AdminError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// A client for another base URL sharing this one's session.
    pub fn rebase(&self, base_url: impl Into<String>) -> Self {
        Self {
            http: self.http.clone(),
            base_url: base_url.into(),
        }
    }

    /// Resolve `path` against the base URL.
    ///
    /// Exactly one `/` separates the two, whatever either side carries.
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::GET, path, None, &RequestConfig::default())
            .await
    }

    pub async fn get_with<T: DeserializeOwned>(&self, path: &str, config: &RequestConfig) -> Result<T> {
        self.send(Method::GET, path, None, config).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::POST, path, Some(body), &RequestConfig::default())
            .await
    }

    /// POST without a request body.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::POST, path, None, &RequestConfig::default())
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::PUT, path, Some(body), &RequestConfig::default())
            .await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        self.send(Method::PATCH, path, Some(body), &RequestConfig::default())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(Method::DELETE, path, None, &RequestConfig::default())
            .await
    }

    /// Issue one request and decode the response.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        config: &RequestConfig,
    ) -> Result<T> {
        let url = self.url(path);
        let method_label = method.as_str().to_string();

        let mut request = self.http.request(method, &url);
        if !config.query.is_empty() {
            request = request.query(&config.query);
        }
        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let start = Instant::now();
        let result = request.send().await;
        metrics::histogram!(telemetry::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method_label.clone(),
        )
        .record(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!(telemetry::HTTP_REQUESTS_TOTAL,
                    "method" => method_label,
                    "status" => "unreachable",
                )
                .increment(1);
                debug!(url = %url, error = %e, "request failed without a response");
                return Err(e.into());
            }
        };

        let status = response.status();
        metrics::counter!(telemetry::HTTP_REQUESTS_TOTAL,
            "method" => method_label.clone(),
            "status" => status.as_u16().to_string(),
        )
        .increment(1);
        debug!(method = %method_label, url = %url, status = status.as_u16(), "request completed");

        let text = response.text().await?;
        if !status.is_success() {
            return Err(AdminError::from_status(status.as_u16(), ErrorBody::parse(&text)));
        }
        decode(&text)
    }
}

/// Decode a success body. An empty body decodes as JSON `null`.
fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| AdminError::Decode(e.to_string()))
}
