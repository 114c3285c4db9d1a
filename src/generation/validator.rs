//! JSON syntax and schema validation of generated bodies.

use crate::error::MockError;
use serde_json::Value;
use tracing::{error, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonValidator;

impl JsonValidator {
    pub fn new() -> Self {
        Self
    }

    /// Return the text unchanged if it parses as JSON.
    pub fn validate<'a>(&self, text: &'a str) -> Result<&'a str, MockError> {
        match serde_json::from_str::<Value>(text) {
            Ok(_) => Ok(text),
            Err(e) => {
                let message = format!("Invalid JSON: {}", e);
                error!("{}", message);
                Err(MockError::Validation(message))
            }
        }
    }

    /// Check the text against a neutral schema document. Violations are joined
    /// with `", "`. A schema that does not parse or compile is skipped.
    pub fn validate_against_schema<'a>(
        &self,
        text: &'a str,
        schema_text: &str,
    ) -> Result<&'a str, MockError> {
        let instance: Value = match serde_json::from_str(text) {
            Ok(instance) => instance,
            Err(e) => return Err(MockError::Validation(format!("Invalid JSON: {}", e))),
        };
        let schema: Value = match serde_json::from_str(schema_text) {
            Ok(schema) => schema,
            Err(e) => {
                error!(error = %e, "Response schema is not valid JSON; skipping schema check");
                return Ok(text);
            }
        };
        let validator = match jsonschema::validator_for(&schema) {
            Ok(validator) => validator,
            Err(e) => {
                error!(error = %e, "Response schema failed to compile; skipping schema check");
                return Ok(text);
            }
        };

        let violations: Vec<String> = validator
            .iter_errors(&instance)
            .map(|violation| violation.to_string())
            .collect();
        if violations.is_empty() {
            Ok(text)
        } else {
            let message = violations.join(", ");
            warn!(violations = %message, "JSON Schema validation failed");
            Err(MockError::Validation(message))
        }
    }
}
