//! Generator collaborator: prompt in, JSON-ish text out.

use crate::error::MockError;
use crate::prompt::PromptBuilder;
use crate::provider::{ChatMessage, CompletionOptions, ModelProviderClient};
use crate::types::Plan;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces response bodies for plans and repairs invalid ones.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, plan: &Plan) -> Result<String, MockError>;

    async fn repair(&self, invalid_json: &str, validation_error: &str) -> Result<String, MockError>;
}

/// Generator backed by a model provider
pub struct LlmGenerator {
    client: Arc<dyn ModelProviderClient>,
    prompts: PromptBuilder,
    options: CompletionOptions,
}

impl LlmGenerator {
    pub fn new(
        client: Arc<dyn ModelProviderClient>,
        prompts: PromptBuilder,
        options: CompletionOptions,
    ) -> Self {
        Self {
            client,
            prompts,
            options,
        }
    }

    async fn complete(&self, prompt: String) -> Result<String, MockError> {
        let response = self
            .client
            .complete(vec![ChatMessage::user(prompt)], self.options.clone())
            .await?;
        debug!(
            provider = self.client.provider_name(),
            model = %response.model,
            chars = response.content.len(),
            "Model completion received"
        );
        Ok(response.content)
    }
}

#[async_trait]
impl ResponseGenerator for LlmGenerator {
    async fn generate(&self, plan: &Plan) -> Result<String, MockError> {
        let prompt = self.prompts.generation_prompt(plan);
        let content = strip_code_fence(&self.complete(prompt).await?);

        if serde_json::from_str::<serde_json::Value>(&content).is_ok() {
            return Ok(content);
        }
        warn!("Model response is not valid JSON, attempting to extract JSON");
        Ok(extract_json(&content))
    }

    async fn repair(&self, invalid_json: &str, validation_error: &str) -> Result<String, MockError> {
        debug!(error = validation_error, "Repairing response");
        let prompt = self.prompts.repair_prompt(invalid_json, validation_error);
        Ok(strip_code_fence(&self.complete(prompt).await?))
    }
}

/// Remove a surrounding markdown code fence (```` ```json ```` or bare ```` ``` ````).
pub fn strip_code_fence(text: &str) -> String {
    let mut content = text.trim();
    if let Some(rest) = content.strip_prefix("```") {
        content = rest
            .strip_prefix("json")
            .or_else(|| rest.strip_prefix("JSON"))
            .unwrap_or(rest);
    }
    if let Some(rest) = content.strip_suffix("```") {
        content = rest;
    }
    content.trim().to_string()
}

/// Outermost `[...]` span, else outermost `{...}` span (wrapped in an array
/// when it holds several top-level objects), else `{}`.
pub fn extract_json(text: &str) -> String {
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            return text[start..=end].to_string();
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            let extracted = &text[start..=end];
            if extracted.contains("},") && top_level_objects(extracted) > 1 {
                return format!("[{}]", extracted);
            }
            return extracted.to_string();
        }
    }

    "{}".to_string()
}

/// Count objects opened at nesting depth zero, ignoring braces inside strings.
fn top_level_objects(text: &str) -> usize {
    let mut depth = 0usize;
    let mut count = 0;
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    count += 1;
                }
                depth += 1;
            }
            '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{ContextRegistry, ExternalBlockLoader};
    use crate::provider::MockProvider;
    use crate::types::Scenario;
    use serde_json::json;

    fn plan() -> Plan {
        Plan {
            scenario: Scenario::Happy,
            status_code: 200,
            content_type: "application/json".to_string(),
            response_schema: None,
            json_schema: None,
            request_context: json!({ "path": "/pets", "method": "GET" }),
            operation_id: None,
            path: "/pets".to_string(),
            method: "GET".to_string(),
        }
    }

    fn generator(provider: Arc<MockProvider>) -> LlmGenerator {
        let registry = Arc::new(ContextRegistry::new(ExternalBlockLoader::disabled()));
        LlmGenerator::new(provider, PromptBuilder::new(registry), CompletionOptions::default())
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn test_extract_json() {
        assert_eq!(extract_json("Here you go: [1, 2] done"), "[1, 2]");
        assert_eq!(extract_json("Sure! {\"a\": {\"b\": 1}} hope that helps"), "{\"a\": {\"b\": 1}}");
        assert_eq!(
            extract_json("{\"a\": 1}, {\"a\": 2}"),
            "[{\"a\": 1}, {\"a\": 2}]"
        );
        assert_eq!(extract_json("{\"note\": \"x},{y\"}"), "{\"note\": \"x},{y\"}");
        assert_eq!(extract_json("no json here"), "{}");
    }

    #[tokio::test]
    async fn test_generate_strips_and_extracts() {
        let provider = Arc::new(MockProvider::new(vec!["```json\nSure: {\"name\": \"Rex\"}\n```"]));
        let body = generator(provider.clone()).generate(&plan()).await.unwrap();
        assert_eq!(body, "{\"name\": \"Rex\"}");
        assert!(provider.prompts()[0].contains("- Endpoint: /pets"));
    }

    #[tokio::test]
    async fn test_repair_only_strips_fences() {
        let provider = Arc::new(MockProvider::new(vec!["```json\nstill broken\n```"]));
        let repaired = generator(provider.clone())
            .repair("{bad", "Invalid JSON: EOF")
            .await
            .unwrap();
        assert_eq!(repaired, "still broken");
        assert!(provider.prompts()[0].contains("Invalid JSON:\n{bad"));
    }
}
