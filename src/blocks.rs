//! Context Blocks
//!
//! Short pieces of domain guidance that steer generation. Every block, built-in
//! or loaded from disk, exposes the same capability set so selection never
//! cares where a block came from.

pub mod builtin;
pub mod external;
pub mod registry;

pub use builtin::builtin_blocks;
pub use external::{ExternalBlockDefinition, ExternalBlockLoader, ExternalContextBlock};
pub use registry::{ContextRegistry, SelectedBlock, SelectionBudget};

/// Id of the fallback block used when nothing else qualifies.
pub const GENERIC_BLOCK_ID: &str = "generic.structured.v1";

/// What a block gets to look at when scoring and rendering
#[derive(Debug, Clone, Default)]
pub struct EndpointInfo {
    pub path: String,
    pub operation_id: Option<String>,
    pub method: String,
    pub schema_minified: String,
    pub request_context_minified: String,
}

impl EndpointInfo {
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into(),
            ..Self::default()
        }
    }

    pub fn with_operation_id(mut self, operation_id: impl Into<String>) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn with_schema(mut self, schema_minified: impl Into<String>) -> Self {
        self.schema_minified = schema_minified.into();
        self
    }
}

pub trait ContextBlock: Send + Sync {
    fn id(&self) -> &str;

    /// Relevance in `[0, 1]`; out-of-range values are clamped by the registry.
    fn score(&self, info: &EndpointInfo) -> f64;

    fn render(&self, info: &EndpointInfo) -> String;
}
