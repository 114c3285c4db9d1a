//! CLI route: single route table and run context. Dispatches to domain services and output.

use crate::blocks::{ContextRegistry, EndpointInfo};
use crate::cli::output::format_block_report;
use crate::cli::parse::Commands;
use crate::config::{ConfigLoader, MockConfig};
use crate::error::MockError;
use crate::openapi::EndpointIndex;
use crate::planner::ResponsePlanner;
use crate::prompt::PromptBuilder;
use crate::schema;
use crate::server::{self, AppState};
use crate::types::{MockRequest, Scenario, SCENARIO_HEADER, STATUS_HEADER};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Runtime context for CLI execution: loaded configuration plus overrides.
pub struct RunContext {
    config: MockConfig,
}

impl RunContext {
    /// Load configuration (explicit file, else layered workspace config) and
    /// apply a `--spec` override.
    pub fn new(
        workspace_root: PathBuf,
        config_path: Option<PathBuf>,
        spec: Option<PathBuf>,
    ) -> Result<Self, MockError> {
        let mut config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        if spec.is_some() {
            config.spec.path = spec;
        }
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: MockConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MockConfig {
        &self.config
    }

    pub async fn execute(mut self, command: &Commands) -> Result<String, MockError> {
        match command {
            Commands::Serve { listen, mount } => {
                if let Some(listen) = listen {
                    self.config.server.listen_addr = listen.clone();
                }
                if let Some(mount) = mount {
                    self.config.server.mount = mount.clone();
                }
                self.serve().await
            }
            Commands::Resolve {
                method,
                path,
                scenario,
                status,
            } => self.resolve(method, path, scenario, *status),
            Commands::Translate { component } => self.translate(component),
            Commands::Blocks {
                path,
                method,
                operation_id,
            } => Ok(self.blocks(path, method, operation_id.as_deref())),
        }
    }

    async fn serve(&self) -> Result<String, MockError> {
        self.config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            MockError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;

        let state = AppState::from_config(&self.config)?;
        let listener = tokio::net::TcpListener::bind(&self.config.server.listen_addr)
            .await
            .map_err(|e| {
                MockError::ConfigError(format!(
                    "Failed to bind {}: {}",
                    self.config.server.listen_addr, e
                ))
            })?;
        server::serve(listener, state)
            .await
            .map_err(|e| MockError::Internal(format!("Server error: {}", e)))?;
        info!("Mock server stopped");
        Ok("Server stopped".to_string())
    }

    fn load_index(&self) -> Result<EndpointIndex, MockError> {
        let path = self.config.spec.path.as_ref().ok_or(MockError::SpecNotLoaded)?;
        let index = EndpointIndex::from_file(path);
        for diagnostic in index.diagnostics() {
            warn!(diagnostic = %diagnostic, "Specification diagnostic");
        }
        if !index.is_loaded() {
            return Err(MockError::SpecNotLoaded);
        }
        Ok(index)
    }

    fn resolve(
        &self,
        method: &str,
        path: &str,
        scenario: &str,
        status: Option<u16>,
    ) -> Result<String, MockError> {
        let index = self.load_index()?;
        let endpoint = index.resolve(method, path).ok_or_else(|| MockError::NotFound {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
        })?;

        let mut request = MockRequest::new(method, path).with_header(SCENARIO_HEADER, scenario);
        if let Some(status) = status {
            request = request.with_header(STATUS_HEADER, status.to_string());
        }
        let scenario = Scenario::from_header(Some(scenario));
        let plan = ResponsePlanner::new(&index).plan(endpoint, scenario, &request);

        pretty(&json!({ "endpoint": endpoint, "plan": plan }))
    }

    fn translate(&self, component: &str) -> Result<String, MockError> {
        let index = self.load_index()?;
        let schema = index
            .component_schemas()
            .and_then(|schemas| schemas.get(component))
            .ok_or_else(|| MockError::ComponentNotFound(component.to_string()))?;
        let resolved = index.resolve_schema_ref(schema);
        let document = schema::translate_document(&resolved, index.component_schemas());
        Ok(schema::to_schema_text(&document))
    }

    /// Scores against the planned endpoint when a specification resolves the
    /// path, else against the bare path and method.
    fn blocks(&self, path: &str, method: &str, operation_id: Option<&str>) -> String {
        let registry = Arc::new(ContextRegistry::new(self.config.blocks.loader()));
        let prompts = PromptBuilder::new(Arc::clone(&registry))
            .with_limits(self.config.generation.prompt_limits());

        let planned = self.load_index().ok().and_then(|index| {
            let request = MockRequest::new(method, path);
            index.resolve(method, path).map(|endpoint| {
                let plan = ResponsePlanner::new(&index).plan(endpoint, Scenario::Happy, &request);
                prompts.endpoint_info(&plan)
            })
        });
        let mut info = planned.unwrap_or_else(|| EndpointInfo::new(path, method.to_ascii_uppercase()));
        if let Some(operation_id) = operation_id {
            info.operation_id = Some(operation_id.to_string());
        }

        let scores = registry.scores(&info);
        let selected = registry.select(&info, self.config.generation.selection_budget());
        format_block_report(&scores, &selected)
    }
}

fn pretty(value: &serde_json::Value) -> Result<String, MockError> {
    serde_json::to_string_pretty(value).map_err(|e| MockError::Internal(e.to_string()))
}
