//! Integration tests for configuration files driving the wired application.

use super::test_utils::PETS_SPEC;
use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use std::path::Path;
use synthmock::config::{ConfigLoader, MockConfig};
use synthmock::server::{build_router, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

const BLOCK: &str = r#"
id: vet.pets.v1
name: Veterinary
scoring:
  baseScore: 0.5
"#;

fn write_config(dir: &Path, blocks_enabled: bool) -> Result<MockConfig> {
    let spec_path = dir.join("petstore.yaml");
    fs::write(&spec_path, PETS_SPEC)?;
    let blocks_dir = dir.join("blocks");
    fs::create_dir_all(&blocks_dir)?;
    fs::write(blocks_dir.join("vet.yaml"), BLOCK)?;

    let config_path = dir.join("synthmock.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[server]
listen_addr = "0.0.0.0:9090"
mount = "/sandbox"

[spec]
path = "{}"

[cache]
max_entries = 10
ttl_secs = 30

[blocks]
enabled = {}
directory = "{}"

[provider]
provider_type = "ollama"
model = "llama3.1:8b"
"#,
            spec_path.display(),
            blocks_enabled,
            blocks_dir.display()
        ),
    )?;
    Ok(ConfigLoader::load_from_file(&config_path)?)
}

async fn get_json(app: axum::Router, uri: &str, method: Method) -> Result<(StatusCode, Value)> {
    let response = app
        .oneshot(Request::builder().method(method).uri(uri).body(Body::empty())?)
        .await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    Ok((status, serde_json::from_slice(&bytes)?))
}

#[tokio::test]
async fn test_config_file_wires_spec_and_blocks() -> Result<()> {
    let dir = TempDir::new()?;
    let config = write_config(dir.path(), true)?;
    assert!(config.validate().is_ok());
    assert_eq!(config.cache.cache_config().max_entries, 10);

    let state = AppState::from_config(&config)?;
    assert_eq!(state.mount.as_ref(), "/sandbox");
    let app = build_router(state);

    let (status, summary) = get_json(app.clone(), "/admin/spec", Method::GET).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["loaded"], true);
    assert_eq!(summary["title"], "Petstore");
    let operations: Vec<&str> = summary["operations"]
        .as_array()
        .map(|ops| ops.iter().filter_map(|op| op["operationId"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(operations, vec!["listPets", "getPet"]);

    let (status, reload) = get_json(app.clone(), "/admin/blocks/reload", Method::POST).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reload["externalBlocks"], 1);

    // The old mount is not routed
    let response = app
        .oneshot(Request::builder().uri("/mock/pets/1").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_disabled_blocks_are_not_loaded() -> Result<()> {
    let dir = TempDir::new()?;
    let config = write_config(dir.path(), false)?;
    let state = AppState::from_config(&config)?;
    assert_eq!(state.registry.reload(), 0);
    Ok(())
}

#[test]
fn test_invalid_file_values_fail_validation() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("bad.toml");
    fs::write(
        &path,
        r#"
[server]
listen_addr = "nowhere"
mount = "/trailing/"

[generation]
min_score = 1.5
"#,
    )?;

    let config = ConfigLoader::load_from_file(&path)?;
    let errors = config.validate().err().unwrap_or_default();
    assert_eq!(errors.len(), 3);
    Ok(())
}
