//! OpenAPI Specification Handling
//!
//! Document model, path-template matching, the endpoint index, and the
//! atomically swappable active specification.

pub mod active;
pub mod document;
pub mod endpoint;
pub mod index;
pub mod pattern;

pub use active::{ActiveSpec, SpecSnapshot};
pub use document::{
    parse_document, AdditionalProperties, Components, Info, MediaType, OpenApiDocument,
    Operation, Parameter, PathItem, Response, Schema,
};
pub use endpoint::{Endpoint, ResponseTable};
pub use index::{EndpointIndex, OperationSummary, SpecSummary};
pub use pattern::PathPattern;
