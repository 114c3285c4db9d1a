//! Prompt construction for generation and repair.

use crate::blocks::{ContextRegistry, EndpointInfo, SelectionBudget};
use crate::types::{Plan, Scenario};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

const TRUNCATION_NOTICE: &str = "...(truncated)";

/// Character caps applied while assembling prompts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
    pub max_prompt_chars: usize,
    pub max_schema_chars: usize,
    pub max_context_chars: usize,
    pub max_repair_json_chars: usize,
    pub max_repair_error_chars: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            max_prompt_chars: 16000,
            max_schema_chars: 6000,
            max_context_chars: 4000,
            max_repair_json_chars: 6000,
            max_repair_error_chars: 2000,
        }
    }
}

pub struct PromptBuilder {
    registry: Arc<ContextRegistry>,
    budget: SelectionBudget,
    limits: PromptLimits,
}

impl PromptBuilder {
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self {
            registry,
            budget: SelectionBudget::default(),
            limits: PromptLimits::default(),
        }
    }

    pub fn with_budget(mut self, budget: SelectionBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_limits(mut self, limits: PromptLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Endpoint view used for block scoring.
    pub fn endpoint_info(&self, plan: &Plan) -> EndpointInfo {
        let ctx = &plan.request_context;
        let schema = plan.json_schema.as_deref().map(minify_schema).unwrap_or_default();
        EndpointInfo {
            path: sanitize(context_str(ctx, "path")),
            operation_id: ctx
                .get("operationId")
                .and_then(Value::as_str)
                .map(sanitize),
            method: sanitize(context_str(ctx, "method")),
            schema_minified: truncate_with_notice(&schema, self.limits.max_schema_chars),
            request_context_minified: truncate_with_notice(
                &stable_minified(ctx),
                self.limits.max_context_chars,
            ),
        }
    }

    pub fn generation_prompt(&self, plan: &Plan) -> String {
        let info = self.endpoint_info(plan);
        let blocks = self.registry.select(&info, self.budget);

        let mut prompt = String::with_capacity(4096);
        prompt.push_str(HEAD_INTRO);
        prompt.push_str(&format!("- Scenario: {}\n", plan.scenario));
        prompt.push_str(&format!("- Status code: {}\n", plan.status_code));
        prompt.push_str(&format!("- Endpoint: {}\n\n", context_str(&plan.request_context, "path")));

        for block in &blocks {
            prompt.push_str(&block.text);
            prompt.push('\n');
        }

        prompt.push_str(STRICT_RULES);
        prompt.push('\n');
        prompt.push_str(scenario_instruction(plan.scenario));
        prompt.push_str("\n\n");

        if !info.schema_minified.trim().is_empty() {
            push_section(&mut prompt, "JSON Schema", &info.schema_minified);
        }
        if !info.request_context_minified.trim().is_empty() {
            push_section(&mut prompt, "Request Context", &info.request_context_minified);
        }
        prompt.push_str(FINAL_REMINDER);

        let prompt = enforce_max(&prompt, self.limits.max_prompt_chars);
        debug!(
            chars = prompt.chars().count(),
            bytes = prompt.len(),
            fingerprint = %blake3::hash(prompt.as_bytes()).to_hex(),
            blocks = %blocks.iter().map(|b| b.id.as_str()).collect::<Vec<_>>().join(","),
            "Built generation prompt"
        );
        prompt
    }

    pub fn repair_prompt(&self, invalid_json: &str, validation_error: &str) -> String {
        let invalid = truncate_with_notice(invalid_json.trim(), self.limits.max_repair_json_chars);
        let error = truncate_with_notice(validation_error.trim(), self.limits.max_repair_error_chars);
        format!(
            "You are a strict JSON fixer. Output ONLY valid JSON. No commentary, no markdown, no explanations.\n\
             \n\
             Invalid JSON:\n{}\n\
             \n\
             Validation error:\n{}\n\
             \n\
             Requirements:\n\
             - Return a syntactically valid JSON document.\n\
             - Preserve the original structure and fields where possible.\n\
             - If required fields are missing, add realistic valid values.\n\
             - NEVER use generic placeholders like \"string1\", \"test\", \"sample\".\n\
             - Use proper names like \"MacBook Pro 16\", \"John Smith\", \"Microsoft Corporation\".\n\
             \n\
             Return ONLY the corrected JSON:\n",
            invalid, error
        )
    }
}

fn push_section(prompt: &mut String, title: &str, content: &str) {
    prompt.push_str(title);
    prompt.push_str(":\n");
    prompt.push_str(content);
    prompt.push_str("\n\n");
}

fn context_str<'a>(ctx: &'a Value, key: &str) -> &'a str {
    ctx.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn scenario_instruction(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::Happy => "- Generate realistic, successful response data with diverse, believable values (no generic names).",
        Scenario::Edge => "- Use boundary values (min/max, empty arrays, very long but realistic strings) while keeping names realistic.",
        Scenario::Invalid => "- Generate a validation error response with specific field errors and helpful messages.",
        Scenario::RateLimit => "- Generate a rate limit error with a Retry-After header (e.g., 60 seconds) and a clear message.",
        Scenario::ServerError => "- Generate a server error with a trace id (e.g., 'trace-id: 7f3a2b1c-4d5e-6f7a-8b9c-0d1e2f3a4b5c').",
    }
}

/// Minified schema without documentation keywords. Property names are left
/// alone, so a property called `description` survives. Non-JSON input is
/// sanitized and returned as-is.
pub fn minify_schema(schema_text: &str) -> String {
    if schema_text.trim().is_empty() {
        return String::new();
    }
    match serde_json::from_str::<Value>(schema_text) {
        Ok(mut value) => {
            strip_doc_keywords(&mut value, false);
            value.to_string()
        }
        Err(_) => sanitize(schema_text),
    }
}

fn strip_doc_keywords(value: &mut Value, is_property_map: bool) {
    match value {
        Value::Object(map) => {
            if !is_property_map {
                map.remove("examples");
                map.remove("description");
                map.remove("externalDocs");
            }
            for (key, child) in map.iter_mut() {
                let child_is_property_map =
                    !is_property_map && (key == "properties" || key == "schemas");
                strip_doc_keywords(child, child_is_property_map);
            }
        }
        Value::Array(items) => {
            for item in items {
                strip_doc_keywords(item, false);
            }
        }
        _ => {}
    }
}

/// Minified JSON with object keys sorted at every level.
pub fn stable_minified(value: &Value) -> String {
    if value.is_null() {
        return String::new();
    }
    sanitize(&sorted(value).to_string())
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k.clone(), sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

/// Replace control characters other than `\r`, `\n` and `\t` with spaces.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() && !matches!(c, '\r' | '\n' | '\t') {
                ' '
            } else {
                c
            }
        })
        .collect()
}

/// Cut to `max` characters, ending with a truncation notice.
pub fn truncate_with_notice(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max.saturating_sub(20);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_NOTICE);
    out
}

fn enforce_max(text: &str, max: usize) -> String {
    truncate_with_notice(text, max)
}

const HEAD_INTRO: &str = "You are a strict JSON generator for API mocks that MUST generate realistic data.

CRITICAL: You are FORBIDDEN from using generic placeholder names like:
- \"Product 1\", \"Product 2\", \"Product 3\"
- \"This is product 1\", \"Description 1\"
- \"Item 1\", \"Test\", \"Sample\", \"Example\"

YOU MUST GENERATE REALISTIC DATA!
";

const STRICT_RULES: &str = "STRICT RULES:
1. Output ONLY valid JSON matching the schema
2. ABSOLUTELY NO GENERIC NAMES - Each item must be unique and realistic
3. For name fields: Use ACTUAL product/person/company names
4. For description fields: Write MEANINGFUL, UNIQUE descriptions
5. For price fields: Use varied, realistic prices ($19.99, $249.00, $1,299.99)
6. For arrays: Generate 5-10 COMPLETELY DIFFERENT items

If you generate \"Product 1\" or similar generic names, you have FAILED.
";

const FINAL_REMINDER: &str = "FINAL REMINDER: Generate REALISTIC, DIVERSE data.
NO \"Product 1\", NO \"Item 2\", NO generic placeholders!
Each item must have a UNIQUE, REALISTIC name and description.

Generate the JSON response now:
";
