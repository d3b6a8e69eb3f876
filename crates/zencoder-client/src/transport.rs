//! HTTPS transport for the Zencoder API.
//!
//! Issues exactly one request per call:
//! - Joins routes under `/api/v{version}` of the configured host
//! - Attaches the API key header and encodes JSON bodies
//! - Decodes 2xx bodies as JSON, turns anything else into an error envelope
//! - Records tracing spans and request metrics
//!
//! Retries are the caller's business.

use std::fmt;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

use crate::config::{ClientConfig, API_KEY_HEADER};
use crate::error::{ClientError, ClientResult};
use crate::metrics::record_request;

// =============================================================================
// Request
// =============================================================================

/// HTTP verbs used by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Pre-serialized, sent verbatim
    Raw(String),
    /// Structured value, JSON-encoded before sending
    Json(Value),
}

impl RequestBody {
    /// Encode any serializable value as a JSON body.
    pub fn json<T: Serialize>(value: &T) -> ClientResult<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| ClientError::invalid_request(format!("Failed to encode body: {}", e)))
    }

    fn encode(self) -> ClientResult<Option<(String, bool)>> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Raw(s) => Ok(Some((s, false))),
            RequestBody::Json(v) => serde_json::to_string(&v)
                .map(|s| Some((s, true)))
                .map_err(|e| ClientError::invalid_request(format!("Failed to encode body: {}", e))),
        }
    }
}

/// A single API request.
#[derive(Debug, Clone)]
pub struct Request {
    /// Operation name used for spans and metrics
    pub operation: &'static str,
    pub method: Method,
    /// Route below the API base path, starting with `/`
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            operation: "request",
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// Name the request for spans and metrics.
    pub fn named(mut self, operation: &'static str) -> Self {
        self.operation = operation;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

// =============================================================================
// Response
// =============================================================================

/// Successful (2xx) response with a decoded JSON body.
#[derive(Debug, Clone)]
pub struct Response {
    pub code: u16,
    pub headers: HeaderMap,
    /// Decoded body; `Null` when the service sent nothing
    pub body: Value,
}

impl Response {
    /// Decode the body into a typed value.
    pub fn decode<T: DeserializeOwned>(self) -> ClientResult<T> {
        serde_json::from_value(self.body)
            .map_err(|e| ClientError::malformed(format!("Unexpected response body: {}", e)))
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Low-level HTTPS transport.
#[derive(Clone)]
pub struct Transport {
    http: Client,
    config: ClientConfig,
    base_url: String,
}

impl Transport {
    /// Create a new transport.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("zencoder-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self::with_client(http, config))
    }

    /// Create a transport reusing an existing [`reqwest::Client`].
    pub fn with_client(http: Client, config: ClientConfig) -> Self {
        let base_url = config.base_url();
        Self {
            http,
            config,
            base_url,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request.
    pub async fn send(&self, request: Request) -> ClientResult<Response> {
        let span = info_span!(
            "zencoder_request",
            operation = %request.operation,
            method = %request.method,
            path = %request.path
        );
        let operation = request.operation;

        let start = Instant::now();
        let result = self.execute(request).instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(response) => response.code,
            Err(e) => e.http_status().unwrap_or(0),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn execute(&self, request: Request) -> ClientResult<Response> {
        if request.path.is_empty() || !request.path.starts_with('/') {
            return Err(ClientError::invalid_request(format!(
                "Route must start with '/': {:?}",
                request.path
            )));
        }

        let url = format!("{}{}", self.base_url, request.path);
        let api_key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|_| ClientError::config("API key contains invalid header characters"))?;

        let mut builder = self
            .http
            .request(request.method.to_reqwest(), &url)
            .header(API_KEY_HEADER, api_key);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if request.method != Method::Get {
            if let Some((payload, is_json)) = request.body.encode()? {
                if is_json {
                    builder = builder.header(CONTENT_TYPE, "application/json");
                }
                builder = builder.body(payload);
            }
        }

        // Caller headers win over the defaults.
        builder = builder.headers(request.headers);

        let response = builder.send().await?;
        let code = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;

        debug!(status = code, bytes = text.len(), "Received response");

        if !(200..=299).contains(&code) {
            return Err(ClientError::api(code, headers, text));
        }

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                ClientError::malformed(format!(
                    "{} (body prefix: {})",
                    e,
                    text.chars().take(200).collect::<String>()
                ))
            })?
        };

        Ok(Response {
            code,
            headers,
            body,
        })
    }
}
