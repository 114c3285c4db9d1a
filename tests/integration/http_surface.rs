//! Integration tests for the HTTP surface, driven through the router in-process.

use super::test_utils::{pets_service, ScriptedGenerator, PETS_SPEC};
use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::Arc;
use synthmock::blocks::{ContextRegistry, ExternalBlockLoader};
use synthmock::generation::MockService;
use synthmock::openapi::ActiveSpec;
use synthmock::server::{build_router, AppState};
use tower::ServiceExt;

const PET: &str = r#"{"id": 7, "name": "Rex", "tag": "dog"}"#;

fn router_for(service: MockService) -> Router {
    let registry = Arc::new(ContextRegistry::new(ExternalBlockLoader::disabled()));
    build_router(AppState::new(Arc::new(service), registry, "/mock"))
}

async fn body_text(response: axum::response::Response) -> Result<String> {
    let collected = response.into_body().collect().await?;
    Ok(String::from_utf8(collected.to_bytes().to_vec())?)
}

async fn body_json(response: axum::response::Response) -> Result<Value> {
    Ok(serde_json::from_str(&body_text(response).await?)?)
}

#[tokio::test]
async fn test_mock_route_returns_generated_body_and_headers() -> Result<()> {
    let generator = ScriptedGenerator::new(PET, "{}");
    let app = router_for(pets_service(generator.clone()));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri("/mock/pets/7?expand=owner")
                .header("X-Mock-Scenario", "edge")
                .header("X-Request-Source", "tests")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(response.headers()["x-mock-scenario"], "edge");
    assert_eq!(body_text(response).await?, PET);

    let plans = generator.generate_calls.lock();
    let context = &plans[0].request_context;
    assert_eq!(context["path"], "/pets/7");
    assert_eq!(context["query"]["expand"], "owner");
    assert_eq!(context["headers"]["x-request-source"], "tests");
    assert!(context["headers"].get("x-mock-scenario").is_none());
    Ok(())
}

#[tokio::test]
async fn test_post_body_reaches_request_context() -> Result<()> {
    let spec = PETS_SPEC.replace(
        "  /pets:\n    get:",
        "  /pets:\n    post:\n      operationId: createPet\n      responses:\n        201: { description: created }\n    get:",
    );
    let generator = ScriptedGenerator::new("{}", "{}");
    let service = MockService::new(
        Arc::new(ActiveSpec::new(synthmock::EndpointIndex::from_text(&spec))),
        generator.clone(),
    );
    let app = router_for(service);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/mock/pets")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"name":"Tom"}"#))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::CREATED);
    let plans = generator.generate_calls.lock();
    assert_eq!(plans[0].request_context["requestBody"]["name"], "Tom");
    assert_eq!(plans[0].operation_id.as_deref(), Some("createPet"));
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_404_json() -> Result<()> {
    let app = router_for(pets_service(ScriptedGenerator::new(PET, "{}")));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::DELETE)
                .uri("/mock/pets/7")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await?;
    assert_eq!(body["code"], "not_found");
    assert!(body["error"].as_str().unwrap_or_default().contains("DELETE /pets/7"));
    Ok(())
}

#[tokio::test]
async fn test_admin_spec_replace_and_health() -> Result<()> {
    let generator = ScriptedGenerator::new(PET, "{}");
    let service = MockService::new(Arc::new(ActiveSpec::empty()), generator);
    let app = router_for(service);

    let before = app
        .clone()
        .oneshot(Request::builder().uri("/mock/pets/7").body(Body::empty())?)
        .await?;
    assert_eq!(before.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(before).await?["code"], "spec_not_loaded");

    let replaced = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/admin/spec")
                .body(Body::from(PETS_SPEC))?,
        )
        .await?;
    assert_eq!(replaced.status(), StatusCode::OK);
    let summary = body_json(replaced).await?;
    assert_eq!(summary["title"], "Petstore");
    assert_eq!(summary["endpointCount"], 2);
    assert_eq!(summary["specVersion"], 1);

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty())?)
        .await?;
    let health = body_json(health).await?;
    assert_eq!(health["specLoaded"], true);
    assert_eq!(health["specVersion"], 1);

    let after = app
        .clone()
        .oneshot(Request::builder().uri("/mock/pets/7").body(Body::empty())?)
        .await?;
    assert_eq!(after.status(), StatusCode::OK);

    let broken = app
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/admin/spec")
                .body(Body::from("{ not a spec"))?,
        )
        .await?;
    assert_eq!(broken.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let summary = body_json(broken).await?;
    assert_eq!(summary["loaded"], false);
    assert!(!summary["diagnostics"].as_array().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_admin_blocks_reload() -> Result<()> {
    let app = router_for(pets_service(ScriptedGenerator::new(PET, "{}")));

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/admin/blocks/reload")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await?;
    assert_eq!(body["externalBlocks"], 0);
    assert_eq!(body["totalBlocks"], 6);
    Ok(())
}
