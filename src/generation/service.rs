//! Mock Service
//!
//! The per-request pipeline: resolve the operation, short-circuit on a cache
//! hit, otherwise plan, generate, validate, repair at most once, post-process
//! and store. Simulated latency applies to hits and misses alike.

use crate::error::MockError;
use crate::generation::cache::{LruTtlCache, MockCache};
use crate::generation::latency::parse_latency;
use crate::generation::postprocess::ResponsePostProcessor;
use crate::generation::runner::ResponseGenerator;
use crate::generation::validator::JsonValidator;
use crate::openapi::{ActiveSpec, EndpointIndex};
use crate::planner::ResponsePlanner;
use crate::types::{MockRequest, MockResult, Plan, Signature, LATENCY_HEADER};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub struct MockService {
    spec: Arc<ActiveSpec>,
    generator: Arc<dyn ResponseGenerator>,
    cache: Arc<dyn MockCache>,
    validator: JsonValidator,
    post_processor: ResponsePostProcessor,
    schema_validation: bool,
    max_latency: Duration,
}

/// Simulated latency ceiling unless configured otherwise.
pub const DEFAULT_MAX_LATENCY: Duration = Duration::from_secs(60);

impl MockService {
    pub fn new(spec: Arc<ActiveSpec>, generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            spec,
            generator,
            cache: Arc::new(LruTtlCache::default()),
            validator: JsonValidator::new(),
            post_processor: ResponsePostProcessor::new(),
            schema_validation: true,
            max_latency: DEFAULT_MAX_LATENCY,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn MockCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Toggle the advisory schema conformance check logged after generation.
    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.schema_validation = enabled;
        self
    }

    pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
        self.max_latency = max_latency;
        self
    }

    pub fn spec(&self) -> &Arc<ActiveSpec> {
        &self.spec
    }

    pub fn cache(&self) -> &Arc<dyn MockCache> {
        &self.cache
    }

    /// Swap in a new index. Cached results belong to the old one and are dropped.
    pub fn replace_index(&self, index: EndpointIndex) -> u64 {
        let version = self.spec.replace(index);
        self.cache.clear();
        version
    }

    /// Parse and activate specification text. A document that fails to load
    /// still replaces the active one, leaving an empty index with diagnostics.
    pub fn reload_spec(&self, spec_text: &str) -> u64 {
        self.replace_index(EndpointIndex::from_text(spec_text))
    }

    pub async fn handle(&self, request: MockRequest) -> Result<MockResult, MockError> {
        let scenario = request.scenario();
        let latency = request.header(LATENCY_HEADER).and_then(parse_latency);

        let result = match self.respond(&request).await {
            Ok(result) => result,
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => {
                error!(
                    method = %request.method,
                    path = %request.path,
                    scenario = %scenario,
                    error = %e,
                    "Mock generation failed"
                );
                return Err(MockError::Internal(e.to_string()));
            }
        };

        if let Some(mut delay) = latency {
            if delay > self.max_latency {
                warn!(
                    requested_ms = delay.as_millis() as u64,
                    max_ms = self.max_latency.as_millis() as u64,
                    "Simulated latency clamped"
                );
                delay = self.max_latency;
            }
            debug!(delay_ms = delay.as_millis() as u64, "Applying simulated latency");
            tokio::time::sleep(delay).await;
        }
        Ok(result)
    }

    async fn respond(&self, request: &MockRequest) -> Result<MockResult, MockError> {
        let snapshot = self.spec.current();
        if !snapshot.index.is_loaded() {
            return Err(MockError::SpecNotLoaded);
        }

        let endpoint = match snapshot.index.resolve(&request.method, &request.path) {
            Some(endpoint) => endpoint,
            None => {
                return Err(MockError::NotFound {
                    method: request.method.to_ascii_uppercase(),
                    path: request.path.clone(),
                })
            }
        };

        let signature = Signature::from_request(request);
        if let Some(hit) = self.cache.get(&signature) {
            debug!(method = %signature.method, path = %signature.path, "Cache hit");
            return Ok(hit);
        }
        debug!(method = %signature.method, path = %signature.path, "Cache miss");

        let plan = ResponsePlanner::new(&snapshot.index).plan(endpoint, signature.scenario, request);
        let body = self.generate_valid(&plan).await?;
        let result = self.post_processor.process(body, &plan, request.seed());

        self.cache.put(signature, result.clone());
        Ok(result)
    }

    /// Generate, check syntax, and on failure repair exactly once. A repair
    /// that still fails to parse is returned as-is. Schema conformance is
    /// advisory and never triggers a repair.
    async fn generate_valid(&self, plan: &Plan) -> Result<String, MockError> {
        let generated = self.generator.generate(plan).await?;
        let problem = match self.validator.validate(&generated).err() {
            Some(e) => e.to_string(),
            None => {
                self.check_schema(&generated, plan);
                return Ok(generated);
            }
        };

        info!(
            path = %plan.path,
            scenario = %plan.scenario,
            error = %problem,
            "Attempting to repair invalid JSON"
        );
        let repaired = self.generator.repair(&generated, &problem).await?;
        match self.validator.validate(&repaired).err() {
            Some(still) => {
                warn!(error = %still, "Repaired response still fails validation; returning it as-is")
            }
            None => self.check_schema(&repaired, plan),
        }
        Ok(repaired)
    }

    fn check_schema(&self, text: &str, plan: &Plan) {
        if !self.schema_validation {
            return;
        }
        let Some(schema_text) = plan.json_schema.as_deref() else {
            return;
        };
        if let Err(violations) = self.validator.validate_against_schema(text, schema_text) {
            warn!(
                path = %plan.path,
                scenario = %plan.scenario,
                status = plan.status_code,
                violations = %violations,
                "Generated response does not conform to schema"
            );
        }
    }
}
