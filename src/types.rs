//! Core request/response types shared by the planner, generator, and service.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Prefix of request headers that steer the mock and never reach generation.
pub const MOCK_HEADER_PREFIX: &str = "x-mock-";
pub const SCENARIO_HEADER: &str = "X-Mock-Scenario";
pub const STATUS_HEADER: &str = "X-Mock-Status";
pub const SEED_HEADER: &str = "X-Mock-Seed";
pub const LATENCY_HEADER: &str = "X-Mock-Latency";

/// Caller-selected response mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    #[default]
    Happy,
    Edge,
    Invalid,
    RateLimit,
    ServerError,
}

impl Scenario {
    /// Parse a header value; unknown or absent values mean `Happy`.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("edge") => Scenario::Edge,
            Some("invalid") => Scenario::Invalid,
            Some("rate-limit") | Some("rate_limit") => Scenario::RateLimit,
            Some("server-error") | Some("server_error") => Scenario::ServerError,
            _ => Scenario::Happy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Happy => "happy",
            Scenario::Edge => "edge",
            Scenario::Invalid => "invalid",
            Scenario::RateLimit => "rate-limit",
            Scenario::ServerError => "server-error",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transport-independent view of an inbound mock request
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    pub method: String,
    /// Path below the mount prefix, starting with `/`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl MockRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First header with the given name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn scenario(&self) -> Scenario {
        Scenario::from_header(self.header(SCENARIO_HEADER))
    }

    pub fn seed(&self) -> Option<&str> {
        self.header(SEED_HEADER).filter(|s| !s.is_empty())
    }
}

/// Cache key; value equality decides hits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub method: String,
    pub path: String,
    pub query: String,
    pub body: String,
    pub scenario: Scenario,
    pub seed: String,
}

impl Signature {
    pub fn from_request(request: &MockRequest) -> Self {
        Self {
            method: request.method.to_ascii_uppercase(),
            path: normalize_path(&request.path),
            query: request.query.clone().unwrap_or_default(),
            body: request.body.clone().unwrap_or_default(),
            scenario: request.scenario(),
            seed: request.seed().unwrap_or("default").to_string(),
        }
    }
}

/// Leading slash, no trailing slash (except the root itself).
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// Everything the generator needs for one request; built once, never mutated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub scenario: Scenario,
    pub status_code: u16,
    pub content_type: String,
    /// Neutral schema document, absent when the response declares none.
    pub response_schema: Option<Value>,
    /// Serialized form of `response_schema`.
    pub json_schema: Option<String>,
    pub request_context: Value,
    pub operation_id: Option<String>,
    pub path: String,
    pub method: String,
}

/// Final status/body/headers triple returned to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockResult {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
}

impl MockResult {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
