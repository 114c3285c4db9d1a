//! synthmock: Synthetic OpenAPI Mock Responses
//!
//! Resolves requests against an OpenAPI specification, plans a response
//! (status, content type, neutral JSON Schema), asks a language model for a
//! conforming body, validates it with a single repair attempt, and caches the
//! result per request signature.

pub mod blocks;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod openapi;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod schema;
pub mod server;
pub mod types;

pub use error::MockError;
pub use generation::MockService;
pub use openapi::{ActiveSpec, EndpointIndex};
pub use types::{MockRequest, MockResult, Plan, Scenario, Signature};
