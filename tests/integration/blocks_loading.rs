//! Integration tests for external context blocks: loading from disk, hot
//! reload, and their effect on the generation prompt.

use super::test_utils::PETS_SPEC;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use synthmock::blocks::{ContextBlock, ContextRegistry, EndpointInfo, ExternalBlockLoader, SelectionBudget};
use synthmock::generation::{LlmGenerator, MockService};
use synthmock::openapi::{ActiveSpec, EndpointIndex};
use synthmock::prompt::PromptBuilder;
use synthmock::provider::{ChatMessage, CompletionOptions, CompletionResponse, ModelProviderClient};
use synthmock::{MockError, MockRequest};
use tempfile::TempDir;

const VETERINARY: &str = r#"
id: vet.pets.v1
name: Veterinary
description: Pet records for a veterinary clinic
scoring:
  baseScore: 0.2
  pathPatterns:
    - pattern: "\\bpets?\\b"
      score: 0.7
examples:
  - name: "pet record"
    condition: "path:pets"
    json: '{"id":1,"name":"Biscuit","tag":"cat"}'
rules:
  - "Use realistic pet names"
"#;

const PHARMACY_JSON: &str = r#"{
  "name": "Pharmacy",
  "scoring": { "baseScore": 0.1, "pathPatterns": [{ "pattern": "prescriptions", "score": 0.8 }] },
  "rules": ["Dosages use mg"]
}"#;

/// Answers every completion with a fixed body and keeps the prompts it saw.
struct RecordingProvider {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ModelProviderClient for RecordingProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        _options: CompletionOptions,
    ) -> Result<CompletionResponse, MockError> {
        let prompt = messages.into_iter().map(|m| m.content).collect::<Vec<_>>().join("\n");
        self.prompts.lock().push(prompt);
        Ok(CompletionResponse {
            content: self.reply.clone(),
            model: "recording".to_string(),
            usage: None,
            finish_reason: Some("stop".to_string()),
        })
    }

    fn provider_name(&self) -> &str {
        "recording"
    }

    fn model_name(&self) -> &str {
        "recording"
    }
}

#[test]
fn test_loader_reads_yaml_and_json_definitions() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("vet.yaml"), VETERINARY).unwrap();
    fs::write(dir.path().join("Pharmacy.json"), PHARMACY_JSON).unwrap();
    fs::write(dir.path().join("notes.txt"), "not a block").unwrap();
    fs::write(dir.path().join("broken.yml"), "scoring: [unclosed").unwrap();

    let blocks = ExternalBlockLoader::new(dir.path()).load();
    let ids: Vec<&str> = blocks.iter().map(|b| b.id()).collect();
    assert_eq!(ids, vec!["external.pharmacy", "vet.pets.v1"]);

    let info = EndpointInfo::new("/pets/{id}", "GET");
    let vet = &blocks[1];
    assert!((vet.score(&info) - 0.9).abs() < 1e-9);
    let text = vet.render(&info);
    assert!(text.starts_with("VETERINARY CONTEXT:\n"));
    assert!(text.contains("Biscuit"));
    assert!(text.contains("- Use realistic pet names"));
}

#[test]
fn test_registry_reload_picks_up_new_files() {
    let dir = TempDir::new().unwrap();
    let registry = ContextRegistry::new(ExternalBlockLoader::new(dir.path()));
    let builtin = registry.blocks().len();

    fs::write(dir.path().join("vet.yaml"), VETERINARY).unwrap();
    assert_eq!(registry.reload(), 1);
    assert_eq!(registry.blocks().len(), builtin + 1);

    let selected = registry.select(&EndpointInfo::new("/pets", "GET"), SelectionBudget::default());
    assert_eq!(selected[0].id, "vet.pets.v1");

    fs::remove_file(dir.path().join("vet.yaml")).unwrap();
    assert_eq!(registry.reload(), 0);
    assert_eq!(registry.blocks().len(), builtin);
}

#[tokio::test]
async fn test_external_block_reaches_generation_prompt() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("vet.yaml"), VETERINARY).unwrap();
    let registry = Arc::new(ContextRegistry::new(ExternalBlockLoader::new(dir.path())));

    let provider = Arc::new(RecordingProvider {
        reply: "```json\n{\"id\": 4, \"name\": \"Biscuit\"}\n```".to_string(),
        prompts: Mutex::new(Vec::new()),
    });
    let generator = LlmGenerator::new(
        provider.clone(),
        PromptBuilder::new(registry),
        CompletionOptions::default(),
    );
    let spec = Arc::new(ActiveSpec::new(EndpointIndex::from_text(PETS_SPEC)));
    let service = MockService::new(spec, Arc::new(generator));

    let result = service.handle(MockRequest::new("GET", "/pets/4")).await.unwrap();
    assert_eq!(result.status, 200);
    assert_eq!(result.body, "{\"id\": 4, \"name\": \"Biscuit\"}");

    let prompts = provider.prompts.lock();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("- Endpoint: /pets/4"));
    assert!(prompts[0].contains("VETERINARY CONTEXT:"));
    assert!(prompts[0].contains("Use realistic pet names"));
}
