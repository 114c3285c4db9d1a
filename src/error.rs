//! Error types for the synthmock response pipeline.

use thiserror::Error;

/// Specification load errors.
///
/// These never escape `EndpointIndex::load`; they are recorded as diagnostics
/// and the index is left empty.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("Failed to read specification {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse specification: {0}")]
    Parse(String),

    #[error("Specification is empty")]
    Empty,
}

/// Internal schema translation errors. Caught by the translator.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Schema nesting exceeds {0} levels")]
    TooDeep(usize),
}

/// Request pipeline errors
#[derive(Debug, Error)]
pub enum MockError {
    #[error("No matching endpoint found in OpenAPI spec for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("No specification loaded")]
    SpecNotLoaded,

    #[error("{0}")]
    Validation(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Component schema not found: {0}")]
    ComponentNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Error generating mock response: {0}")]
    Internal(String),
}

impl MockError {
    /// True for conditions the caller caused (no route, no spec).
    pub fn is_not_found(&self) -> bool {
        matches!(self, MockError::NotFound { .. } | MockError::SpecNotLoaded)
    }
}

impl From<config::ConfigError> for MockError {
    fn from(err: config::ConfigError) -> Self {
        MockError::ConfigError(err.to_string())
    }
}
