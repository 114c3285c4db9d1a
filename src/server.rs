//! HTTP Surface
//!
//! Thin axum layer over [`MockService`]: every method under the mount prefix is
//! a mock request, plus health and admin routes for swapping the active
//! specification and reloading external context blocks.

use crate::blocks::ContextRegistry;
use crate::config::MockConfig;
use crate::error::MockError;
use crate::generation::{LlmGenerator, LruTtlCache, MockService};
use crate::openapi::{ActiveSpec, EndpointIndex};
use crate::prompt::PromptBuilder;
use crate::provider::ProviderFactory;
use crate::types::MockRequest;
use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use axum::routing::{any, get, post};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MockService>,
    pub registry: Arc<ContextRegistry>,
    pub mount: Arc<str>,
}

impl AppState {
    pub fn new(service: Arc<MockService>, registry: Arc<ContextRegistry>, mount: &str) -> Self {
        Self {
            service,
            registry,
            mount: Arc::from(mount.trim_end_matches('/')),
        }
    }

    /// Wire the full pipeline from configuration: provider client, block
    /// registry, prompt builder, cache and the startup specification.
    pub fn from_config(config: &MockConfig) -> Result<Self, MockError> {
        let client = ProviderFactory::create_client(&config.provider)?;
        let registry = Arc::new(ContextRegistry::new(config.blocks.loader()));
        let prompts = PromptBuilder::new(Arc::clone(&registry))
            .with_budget(config.generation.selection_budget())
            .with_limits(config.generation.prompt_limits());
        let generator = Arc::new(LlmGenerator::new(
            client,
            prompts,
            config.provider.completion_options(),
        ));

        let index = match &config.spec.path {
            Some(path) => EndpointIndex::from_file(path),
            None => EndpointIndex::new(),
        };
        for diagnostic in index.diagnostics() {
            warn!(diagnostic = %diagnostic, "Specification diagnostic");
        }

        let service = MockService::new(Arc::new(ActiveSpec::new(index)), generator)
            .with_cache(Arc::new(LruTtlCache::new(config.cache.cache_config())))
            .with_schema_validation(config.generation.schema_validation)
            .with_max_latency(config.generation.max_latency());

        Ok(Self::new(Arc::new(service), registry, &config.server.mount))
    }
}

pub fn build_router(state: AppState) -> Router {
    let mount = state.mount.to_string();
    Router::new()
        .route("/healthz", get(healthz))
        .route("/admin/spec", get(get_spec).put(put_spec))
        .route("/admin/blocks/reload", post(reload_blocks))
        .route(&mount, any(mock))
        .route(&format!("{}/*path", mount), any(mock))
        .with_state(state)
}

/// Serve until ctrl-c.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let address = listener.local_addr()?;
    info!(address = %address, mount = %state.mount, "Mock server listening");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await
}

async fn healthz(State(state): State<AppState>) -> Response {
    let snapshot = state.service.spec().current();
    json_response(
        StatusCode::OK,
        json!({
            "ok": true,
            "specLoaded": snapshot.index.is_loaded(),
            "specVersion": snapshot.version,
        }),
    )
}

async fn get_spec(State(state): State<AppState>) -> Response {
    let snapshot = state.service.spec().current();
    summary_response(StatusCode::OK, snapshot.version, &snapshot.index)
}

async fn put_spec(State(state): State<AppState>, body: Bytes) -> Response {
    let text = String::from_utf8_lossy(&body);
    let version = state.service.reload_spec(&text);
    let snapshot = state.service.spec().current();
    let status = if snapshot.index.is_loaded() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    summary_response(status, version, &snapshot.index)
}

async fn reload_blocks(State(state): State<AppState>) -> Response {
    let external = state.registry.reload();
    json_response(
        StatusCode::OK,
        json!({
            "externalBlocks": external,
            "totalBlocks": state.registry.blocks().len(),
        }),
    )
}

async fn mock(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let suffix = uri.path().strip_prefix(state.mount.as_ref()).unwrap_or("");
    let mut request = MockRequest::new(method.as_str(), if suffix.is_empty() { "/" } else { suffix });
    if let Some(query) = uri.query() {
        request = request.with_query(query);
    }
    for (name, value) in &headers {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    if !body.is_empty() {
        request = request.with_body(String::from_utf8_lossy(&body));
    }

    match state.service.handle(request).await {
        Ok(result) => {
            let mut response = Response::new(Body::from(result.body));
            *response.status_mut() =
                StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let response_headers = response.headers_mut();
            for (name, value) in &result.headers {
                match (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
                    (Ok(name), Ok(value)) => {
                        response_headers.insert(name, value);
                    }
                    _ => warn!(header = %name, "Dropping unrepresentable response header"),
                }
            }
            response
        }
        Err(error) => error_response(&error),
    }
}

/// 404 for unknown routes and a missing specification, 500 otherwise.
pub fn error_status(error: &MockError) -> (StatusCode, &'static str) {
    match error {
        MockError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        MockError::SpecNotLoaded => (StatusCode::NOT_FOUND, "spec_not_loaded"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
    }
}

fn error_response(error: &MockError) -> Response {
    let (status, code) = error_status(error);
    json_response(status, json!({ "error": error.to_string(), "code": code }))
}

fn summary_response(status: StatusCode, version: u64, index: &EndpointIndex) -> Response {
    let mut body = serde_json::to_value(index.summary()).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut body {
        map.insert("specVersion".to_string(), json!(version));
    }
    json_response(status, body)
}

fn json_response(status: StatusCode, body: Value) -> Response {
    let mut response = Response::new(Body::from(body.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        axum::http::header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}
