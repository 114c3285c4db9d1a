//! Integration tests for the request pipeline: status resolution, caching,
//! bounded repair, post-processing and specification reloads.

use super::test_utils::{pets_service, pets_spec_with_default, ScriptedGenerator, PETS_SPEC};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use synthmock::generation::MockService;
use synthmock::openapi::{ActiveSpec, EndpointIndex};
use synthmock::{MockError, MockRequest};

const PET: &str = r#"{"id": 1, "name": "Rex", "tag": null}"#;

#[tokio::test]
async fn test_invalid_scenario_resolves_400_with_default_descriptor() {
    let generator = ScriptedGenerator::new(r#"{"code": 400, "message": "bad id"}"#, "{}");
    let spec = Arc::new(ActiveSpec::new(EndpointIndex::from_text(&pets_spec_with_default())));
    let service = MockService::new(spec, generator.clone());

    let request = MockRequest::new("GET", "/pets/1").with_header("X-Mock-Scenario", "invalid");
    let result = service.handle(request).await.unwrap();

    assert_eq!(result.status, 400);
    assert_eq!(result.header("X-Mock-Scenario"), Some("invalid"));
    let plans = generator.generate_calls.lock();
    assert_eq!(plans[0].status_code, 400);
    assert_eq!(plans[0].operation_id.as_deref(), Some("getPet"));
}

#[tokio::test]
async fn test_invalid_scenario_without_default_falls_back_to_success_descriptor() {
    let generator = ScriptedGenerator::new(PET, "{}");
    let service = pets_service(generator.clone());

    let request = MockRequest::new("GET", "/pets/1").with_header("X-Mock-Scenario", "INVALID");
    let result = service.handle(request).await.unwrap();

    assert_eq!(result.status, 400);
    let plans = generator.generate_calls.lock();
    let schema = plans[0].response_schema.as_ref().unwrap();
    assert_eq!(schema["required"], serde_json::json!(["id", "name"]));
}

#[tokio::test]
async fn test_happy_list_plans_array_schema() {
    let generator = ScriptedGenerator::new(&format!("[{}]", PET), "[]");
    let service = pets_service(generator.clone());

    let result = service.handle(MockRequest::new("GET", "/pets")).await.unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(result.header("Content-Type"), Some("application/json"));
    assert_eq!(result.header("X-Mock-Generated"), Some("true"));

    let plans = generator.generate_calls.lock();
    let schema = plans[0].response_schema.as_ref().unwrap();
    assert_eq!(schema["type"], "array");
    assert_eq!(schema["items"]["$ref"], "#/components/schemas/Pet");
    assert!(schema["components"]["schemas"]["Pet"].is_object());
    assert!(generator.repair_calls.lock().is_empty());
}

#[tokio::test]
async fn test_cache_idempotence_and_seed_miss() {
    let generator = ScriptedGenerator::new(PET, "{}");
    let service = pets_service(generator.clone());
    let request = || {
        MockRequest::new("GET", "/pets/1")
            .with_query("verbose=true")
            .with_header("X-Mock-Seed", "alpha")
    };

    let first = service.handle(request()).await.unwrap();
    let second = service.handle(request()).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(generator.total_calls(), 1);

    let other_seed = MockRequest::new("GET", "/pets/1")
        .with_query("verbose=true")
        .with_header("X-Mock-Seed", "beta");
    service.handle(other_seed).await.unwrap();
    assert_eq!(generator.total_calls(), 2);

    let other_query = MockRequest::new("GET", "/pets/1").with_header("X-Mock-Seed", "alpha");
    service.handle(other_query).await.unwrap();
    assert_eq!(generator.total_calls(), 3);

    let other_scenario = request().with_header("X-Mock-Scenario", "edge");
    service.handle(other_scenario).await.unwrap();
    assert_eq!(generator.total_calls(), 4);
}

#[tokio::test]
async fn test_persistently_invalid_generator_is_called_exactly_twice() {
    let generator = ScriptedGenerator::new("I am not JSON", "still not JSON");
    let service = pets_service(generator.clone());

    let result = service.handle(MockRequest::new("GET", "/pets/1")).await.unwrap();
    assert_eq!(result.body, "still not JSON");
    assert_eq!(generator.total_calls(), 2);

    let repairs = generator.repair_calls.lock();
    assert_eq!(repairs[0].0, "I am not JSON");
    assert!(repairs[0].1.starts_with("Invalid JSON"));
}

#[tokio::test]
async fn test_error_body_outside_success_schema_is_kept() {
    let error_body = r#"{"code": 400, "message": "bad id"}"#;
    let generator = ScriptedGenerator::new(error_body, PET);
    let service = pets_service(generator.clone());

    let request = MockRequest::new("GET", "/pets/1").with_header("X-Mock-Scenario", "invalid");
    let result = service.handle(request).await.unwrap();

    assert_eq!(result.status, 400);
    assert_eq!(result.body, error_body);
    assert_eq!(generator.total_calls(), 1);
    assert!(generator.repair_calls.lock().is_empty());
}

#[tokio::test]
async fn test_seed_perturbation_is_deterministic_across_services() {
    let run = |seed: &'static str| async move {
        let generator = ScriptedGenerator::new(r#"{"id": 1, "name": "Rex", "createdTimestamp": 1700000000000}"#, "{}");
        let service = pets_service(generator);
        let request = MockRequest::new("GET", "/pets/1").with_header("X-Mock-Seed", seed);
        let result = service.handle(request).await.unwrap();
        serde_json::from_str::<Value>(&result.body).unwrap()
    };

    let first = run("42").await;
    let again = run("42").await;
    assert_eq!(first, again);
    assert_eq!(first["name"], "Rex");
    assert!(first["id"].as_u64().unwrap() < 10_000);
}

#[tokio::test]
async fn test_scenario_headers() {
    let generator = ScriptedGenerator::new(r#"{"code": 429, "message": "slow down"}"#, "{}");
    let service = pets_service(generator);

    let limited = MockRequest::new("GET", "/pets").with_header("X-Mock-Scenario", "rate-limit");
    let result = service.handle(limited).await.unwrap();
    assert_eq!(result.status, 429);
    assert_eq!(result.header("Retry-After"), Some("60"));
    assert_eq!(result.header("X-RateLimit-Remaining"), Some("0"));

    let failing = MockRequest::new("GET", "/pets").with_header("X-Mock-Scenario", "server-error");
    let result = service.handle(failing).await.unwrap();
    assert_eq!(result.status, 500);
    assert!(result.header("X-Trace-Id").is_some());
}

#[tokio::test]
async fn test_status_override_wins() {
    let generator = ScriptedGenerator::new(r#"{"code": 404, "message": "gone"}"#, "{}");
    let service = pets_service(generator.clone());

    let request = MockRequest::new("GET", "/pets/9").with_header("X-Mock-Status", "404");
    let result = service.handle(request).await.unwrap();
    assert_eq!(result.status, 404);
    let plans = generator.generate_calls.lock();
    assert!(plans[0].json_schema.as_deref().unwrap().contains("\"message\""));
}

#[tokio::test]
async fn test_out_of_range_status_override_falls_back_to_scenario() {
    let generator = ScriptedGenerator::new(PET, "{}");
    let service = pets_service(generator);

    let request = MockRequest::new("GET", "/pets/1").with_header("X-Mock-Status", "42");
    let result = service.handle(request).await.unwrap();
    assert_eq!(result.status, 200);
}

#[tokio::test]
async fn test_unknown_route_and_reload() {
    let generator = ScriptedGenerator::new(PET, "{}");
    let service = pets_service(generator.clone());

    match service.handle(MockRequest::new("GET", "/owners/1")).await {
        Err(MockError::NotFound { method, path }) => {
            assert_eq!(method, "GET");
            assert_eq!(path, "/owners/1");
        }
        other => panic!("expected not found, got {:?}", other),
    }

    service.handle(MockRequest::new("GET", "/pets/1")).await.unwrap();
    assert_eq!(service.cache().len(), 1);

    let owners = PETS_SPEC.replace("/pets/{id}:", "/owners/{id}:");
    service.reload_spec(&owners);
    assert!(service.cache().is_empty());
    assert!(service.handle(MockRequest::new("GET", "/owners/1")).await.is_ok());
    assert!(matches!(
        service.handle(MockRequest::new("GET", "/pets/1")).await,
        Err(MockError::NotFound { .. })
    ));

    service.reload_spec("openapi: [broken");
    assert!(matches!(
        service.handle(MockRequest::new("GET", "/owners/1")).await,
        Err(MockError::SpecNotLoaded)
    ));
    assert_eq!(generator.total_calls(), 2);
}

#[tokio::test]
async fn test_concurrent_requests_each_get_a_result() {
    let generator = ScriptedGenerator::new(PET, "{}");
    let service = pets_service(generator.clone());

    let requests = (0..8).map(|n| {
        let request = MockRequest::new("GET", "/pets/1").with_header("X-Mock-Seed", &n.to_string());
        service.handle(request)
    });
    let results = join_all(requests).await;

    assert!(results.iter().all(|r| matches!(r, Ok(result) if result.status == 200)));
    assert_eq!(service.cache().len(), 8);
    assert_eq!(generator.total_calls(), 8);
}
