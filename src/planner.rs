//! Response Planner
//!
//! Turns a resolved endpoint plus request data into a [`Plan`]: status code,
//! negotiated content type, neutral response schema, and a request-context
//! snapshot for the generator. Planning is deterministic and infallible.

use crate::openapi::document::{MediaType, Response, Schema};
use crate::openapi::{Endpoint, EndpointIndex};
use crate::schema;
use crate::types::{MockRequest, Plan, Scenario, MOCK_HEADER_PREFIX, STATUS_HEADER};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const JSON: &str = "application/json";

pub struct ResponsePlanner<'a> {
    index: &'a EndpointIndex,
}

impl<'a> ResponsePlanner<'a> {
    pub fn new(index: &'a EndpointIndex) -> Self {
        Self { index }
    }

    pub fn plan(&self, endpoint: &Endpoint, scenario: Scenario, request: &MockRequest) -> Plan {
        let status_code = determine_status(endpoint, scenario, request);
        let descriptor = endpoint.responses.select(status_code);

        let mut content_type = JSON.to_string();
        let mut response_schema = None;
        if let Some(response) = descriptor {
            content_type = negotiate_content_type(request.header("Accept"), &response.content);
            if let Some(schema) = self.extract_schema(response, &content_type) {
                let resolved = self.index.resolve_schema_ref(schema);
                response_schema = Some(schema::translate_document(
                    &resolved,
                    self.index.component_schemas(),
                ));
            }
        }
        let json_schema = response_schema.as_ref().map(schema::to_schema_text);

        debug!(
            method = %endpoint.method,
            path = %endpoint.path,
            scenario = %scenario,
            status = status_code,
            content_type = %content_type,
            has_schema = response_schema.is_some(),
            "Planned response"
        );

        Plan {
            scenario,
            status_code,
            content_type,
            response_schema,
            json_schema,
            request_context: build_request_context(endpoint, request),
            operation_id: endpoint.operation_id.clone(),
            path: endpoint.path.clone(),
            method: endpoint.method.clone(),
        }
    }

    fn extract_schema<'r>(&self, response: &'r Response, content_type: &str) -> Option<&'r Schema> {
        match response.content.get(content_type) {
            Some(media) => media.schema.as_ref(),
            None if content_type == JSON => self.index.response_schema(response),
            None => None,
        }
    }
}

/// Explicit override header, else the scenario's canonical status.
pub fn determine_status(endpoint: &Endpoint, scenario: Scenario, request: &MockRequest) -> u16 {
    if let Some(raw) = request.header(STATUS_HEADER) {
        match raw.trim().parse::<u16>() {
            Ok(status) if (100..=599).contains(&status) => return status,
            _ => warn!(value = raw, "Invalid X-Mock-Status header ignored"),
        }
    }
    match scenario {
        Scenario::Happy | Scenario::Edge => endpoint.responses.success_status(),
        Scenario::Invalid => 400,
        Scenario::RateLimit => 429,
        Scenario::ServerError => 500,
    }
}

/// Exact `Accept` match, then the first JSON-ish type when `Accept` asks for
/// JSON, then `application/json`, then the first declared type.
pub fn negotiate_content_type(accept: Option<&str>, content: &IndexMap<String, MediaType>) -> String {
    let first = match content.keys().next() {
        Some(first) => first,
        None => return JSON.to_string(),
    };
    let accept = accept.unwrap_or("*/*");

    if content.contains_key(accept) {
        return accept.to_string();
    }
    if accept.contains("json") {
        if let Some(json_type) = content.keys().find(|k| k.to_ascii_lowercase().contains("json")) {
            return json_type.clone();
        }
    }
    if content.contains_key(JSON) {
        return JSON.to_string();
    }
    first.clone()
}

fn build_request_context(endpoint: &Endpoint, request: &MockRequest) -> Value {
    let mut ctx = Map::new();
    ctx.insert("method".to_string(), json!(request.method));
    ctx.insert("path".to_string(), json!(request.path));
    if let Some(operation_id) = &endpoint.operation_id {
        ctx.insert("operationId".to_string(), json!(operation_id));
    }
    if let Some(summary) = &endpoint.summary {
        ctx.insert("summary".to_string(), json!(summary));
    }

    if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
        ctx.insert("queryString".to_string(), json!(query));
        let params = query_parameters(query);
        if !params.is_empty() {
            ctx.insert("query".to_string(), Value::Object(params));
        }
    }

    let headers: BTreeMap<String, &str> = request
        .headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
        .filter(|(name, _)| !name.starts_with(MOCK_HEADER_PREFIX))
        .collect();
    if !headers.is_empty() {
        ctx.insert("headers".to_string(), json!(headers));
    }

    if let Some(body) = request.body.as_deref().filter(|b| !b.trim().is_empty()) {
        let parsed = serde_json::from_str::<Value>(body).unwrap_or_else(|_| json!(body));
        ctx.insert("requestBody".to_string(), parsed);
    }

    if !endpoint.parameters.is_empty() {
        if let Ok(parameters) = serde_json::to_value(&endpoint.parameters) {
            ctx.insert("parameters".to_string(), parameters);
        }
    }

    Value::Object(ctx)
}

/// Query pairs grouped by key: one value stays a string, repeats become a list.
fn query_parameters(query: &str) -> Map<String, Value> {
    let mut grouped: IndexMap<String, Vec<String>> = IndexMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        grouped.entry(key.into_owned()).or_default().push(value.into_owned());
    }
    grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                json!(values.remove(0))
            } else {
                json!(values)
            };
            (key, value)
        })
        .collect()
}
