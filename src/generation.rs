//! Generation
//!
//! The request pipeline and its collaborators: the model-backed generator,
//! JSON validation, post-processing, the result cache and simulated latency.

pub mod cache;
pub mod latency;
pub mod postprocess;
pub mod runner;
pub mod service;
pub mod validator;

pub use cache::{CacheConfig, LruTtlCache, MockCache};
pub use latency::parse_latency;
pub use postprocess::{apply_seed, ResponsePostProcessor};
pub use runner::{extract_json, strip_code_fence, LlmGenerator, ResponseGenerator};
pub use service::MockService;
pub use validator::JsonValidator;
